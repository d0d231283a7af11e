use super::{BadFilterDescription, PdrWarning};
use crate::app_pfd::AppPfdRegistry;
use crate::ipfilter::{Endpoint, FilterDirection, IpFilterRule, RESERVED_PROTO};
use crate::pfcp::ie::{FTeid, PdiElement, RawIe, SdfFilter, SourceInterface};
use crate::types::pdr::{Interface, EXACT_U16, EXACT_U32, EXACT_U8, PDR};
use log::{debug, error, warn};
use std::net::Ipv4Addr;

/// Only the matching dimensions of `rule` are populated.
#[derive(Debug, Default)]
pub struct ResolvedPdi {
    pub rule: PDR,
    pub skipped: Vec<PdrWarning>,
}

impl ResolvedPdi {
    fn skip(&mut self, warning: PdrWarning) {
        self.skipped.push(warning);
    }
}

pub fn resolve_pdi(
    pdi: &[RawIe],
    registry: &AppPfdRegistry,
) -> Result<ResolvedPdi, BadFilterDescription> {
    let mut resolved = ResolvedPdi::default();

    let mut elements = Vec::with_capacity(pdi.len());
    for raw in pdi {
        match PdiElement::decode(raw) {
            Ok(element) => elements.push(element),
            Err(e) => {
                error!("Failed to parse PDI member of type {}: {}", raw.ie_type, e);
                resolved.skip(PdrWarning::UndecodableElement {
                    ie_type: raw.ie_type,
                    source: e,
                });
            }
        }
    }

    let ue_ip4 = extract_direct(&mut resolved, &elements);

    // Sessions without SDF or application filters are classified by UE IP alone
    if let Some(ue_ip4) = ue_ip4 {
        match resolved.rule.interface() {
            Some(Interface::Core) => {
                resolved.rule.dst_ip = u32::from(ue_ip4);
                resolved.rule.dst_ip_mask = EXACT_U32;
            }
            Some(Interface::Access) => {
                resolved.rule.src_ip = u32::from(ue_ip4);
                resolved.rule.src_ip_mask = EXACT_U32;
            }
            None => {}
        }
    }

    let sdf_present = elements.iter().any(|e| {
        matches!(e, PdiElement::SdfFilter(sdf) if !sdf.flow_description.is_empty())
    });

    for element in &elements {
        match element {
            PdiElement::ApplicationId(app_id) if sdf_present => {
                warn!("Ignoring application ID {}: SDF filter takes precedence", app_id);
                resolved.skip(PdrWarning::ApplicationOverridden(app_id.clone()));
            }
            PdiElement::ApplicationId(app_id) => {
                resolve_application(&mut resolved, app_id, registry, ue_ip4)?;
            }
            PdiElement::SdfFilter(sdf) => {
                resolve_sdf_filter(&mut resolved, sdf, ue_ip4)?;
            }
            _ => {}
        }
    }

    Ok(resolved)
}

fn extract_direct(resolved: &mut ResolvedPdi, elements: &[PdiElement]) -> Option<Ipv4Addr> {
    let mut ue_ip4 = None;

    for element in elements {
        match element {
            PdiElement::UeIpAddress(ue_ip) => match ue_ip.ipv4 {
                Some(addr) => ue_ip4 = Some(addr),
                None => {
                    error!("UE IP address carries no IPv4 address");
                    resolved.skip(PdrWarning::NoIpv4UeAddress);
                }
            },
            PdiElement::SourceInterface(iface) => match iface {
                SourceInterface::Access => resolved.rule.set_interface(Interface::Access),
                SourceInterface::Core => resolved.rule.set_interface(Interface::Core),
                other => {
                    error!("Source interface {:?} not supported yet", other);
                    resolved.skip(PdrWarning::UnsupportedSourceInterface(*other));
                }
            },
            PdiElement::FTeid(fteid) => extract_tunnel(resolved, fteid),
            PdiElement::Qfi(_) | PdiElement::NetworkInstance(_) => {}
            PdiElement::Unrecognized(ie_type) => {
                debug!("Ignoring PDI member of type {}", ie_type);
            }
            PdiElement::SdfFilter(_) | PdiElement::ApplicationId(_) => {}
        }
    }

    ue_ip4
}

fn extract_tunnel(resolved: &mut ResolvedPdi, fteid: &FTeid) {
    // TEID 0 means the PDR does not constrain the tunnel
    if fteid.teid.0 == 0 {
        return;
    }

    match fteid.ipv4 {
        Some(addr) => {
            resolved.rule.set_tunnel(fteid.teid.0, addr);
            debug!("Tunnel IPv4 address: {}", addr);
        }
        None => {
            error!("F-TEID {} carries no IPv4 address", fteid.teid);
            resolved.skip(PdrWarning::NoIpv4TunnelAddress(fteid.teid));
        }
    }
}

fn resolve_application(
    resolved: &mut ResolvedPdi,
    app_id: &str,
    registry: &AppPfdRegistry,
    ue_ip4: Option<Ipv4Addr>,
) -> Result<(), BadFilterDescription> {
    let pfd = match registry.get(app_id) {
        Some(pfd) => pfd,
        None => {
            error!("Unable to find application ID {}", app_id);
            resolved.skip(PdrWarning::UnknownApplication(app_id.to_string()));
            return Ok(());
        }
    };
    debug_assert_eq!(pfd.app_id(), app_id);

    let wanted = match resolved.rule.interface() {
        Some(Interface::Access) => Some(FilterDirection::Out),
        Some(Interface::Core) => Some(FilterDirection::In),
        None => None,
    };

    debug!("Application {} flow descriptions: {:?}", app_id, pfd.flow_descs());
    for flow_desc in pfd.flow_descs() {
        let ipf = parse_filter(flow_desc, ue_ip4)?;
        if Some(ipf.direction) == wanted {
            debug!("Application {} matched {:?}", app_id, flow_desc);
            adopt_proto(&mut resolved.rule, &ipf);
            adopt_endpoints(&mut resolved.rule, &ipf.src, &ipf.dst);
            return Ok(());
        }
    }

    debug!("No flow description of application {} matches the source interface", app_id);
    Ok(())
}

fn resolve_sdf_filter(
    resolved: &mut ResolvedPdi,
    sdf: &SdfFilter,
    ue_ip4: Option<Ipv4Addr>,
) -> Result<(), BadFilterDescription> {
    if sdf.flow_description.is_empty() {
        // TODO: resolve SDF filters referenced by filter ID
        debug!("Empty SDF filter description");
        resolved.skip(PdrWarning::EmptySdfFilter);
        return Ok(());
    }
    debug!("Flow description is: {}", sdf.flow_description);

    let ipf = parse_filter(&sdf.flow_description, ue_ip4)?;
    adopt_proto(&mut resolved.rule, &ipf);

    // SDF filters are written for downlink, uplink mirrors them
    match resolved.rule.interface() {
        Some(Interface::Core) => adopt_endpoints(&mut resolved.rule, &ipf.src, &ipf.dst),
        Some(Interface::Access) => adopt_endpoints(&mut resolved.rule, &ipf.dst, &ipf.src),
        None => {}
    }

    Ok(())
}

fn parse_filter(
    flow_desc: &str,
    ue_ip4: Option<Ipv4Addr>,
) -> Result<IpFilterRule, BadFilterDescription> {
    IpFilterRule::parse(flow_desc, ue_ip4).map_err(|source| BadFilterDescription {
        description: flow_desc.to_string(),
        source,
    })
}

// A later filter replaces an earlier one, wildcard protocol included
fn adopt_proto(rule: &mut PDR, ipf: &IpFilterRule) {
    (rule.proto, rule.proto_mask) = match ipf.proto {
        RESERVED_PROTO => (0, 0),
        proto => (proto, EXACT_U8),
    };
}

fn adopt_endpoints(rule: &mut PDR, src: &Endpoint, dst: &Endpoint) {
    rule.src_ip = src.ip();
    rule.src_ip_mask = src.mask();
    rule.dst_ip = dst.ip();
    rule.dst_ip_mask = dst.mask();
    (rule.src_port, rule.src_port_mask) = port_match(src);
    (rule.dst_port, rule.dst_port_mask) = port_match(dst);
}

fn port_match(endpoint: &Endpoint) -> (u16, u16) {
    match endpoint.exact_port() {
        Some(port) => (port, EXACT_U16),
        None => (0, 0),
    }
}
