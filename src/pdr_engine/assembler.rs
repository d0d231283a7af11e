use super::{resolve_pdi, PdrError, PdrWarning};
use crate::app_pfd::AppPfdRegistry;
use crate::pfcp::ie::{IeError, IeType, PdrElement};
use crate::pfcp::types::CauseValue;
use crate::types::identifiers::SEID;
use crate::types::pdr::PDR;
use log::{debug, error};

/// `pdr` is `None` when a mandatory member could not be read; the reason is
/// the last entry of `skipped`.
#[derive(Debug, Default)]
pub struct AssembledPdr {
    pub pdr: Option<PDR>,
    pub skipped: Vec<PdrWarning>,
}

impl AssembledPdr {
    pub fn is_built(&self) -> bool {
        self.pdr.is_some()
    }

    pub fn cause(&self) -> Option<CauseValue> {
        if self.is_built() {
            return None;
        }
        self.skipped.last().and_then(PdrWarning::cause)
    }

    fn abandon(mut self, warning: PdrWarning) -> Self {
        error!("Abandoning PDR: {}", warning);
        self.skipped.push(warning);
        self
    }
}

pub fn assemble_pdr(
    element: &PdrElement,
    seid: SEID,
    registry: &AppPfdRegistry,
) -> Result<AssembledPdr, PdrError> {
    let pdr_id = match element.pdr_id() {
        Ok(id) => id,
        Err(e) => return Ok(AssembledPdr::default().abandon(PdrWarning::PdrId(e))),
    };

    let precedence = match element.precedence() {
        Ok(precedence) => precedence,
        Err(e) => return Ok(AssembledPdr::default().abandon(PdrWarning::Precedence(e))),
    };

    let pdi = match element.pdi() {
        Ok(pdi) => pdi,
        Err(e) => return Ok(AssembledPdr::default().abandon(PdrWarning::Pdi(e))),
    };

    let need_decap = match element.outer_header_removal() {
        Ok(ohr) => ohr.is_gtpu_udp_ipv4(),
        Err(IeError::MissingIe(IeType::OuterHeaderRemoval)) => false,
        Err(e) => {
            debug!("PDR {} outer header removal unreadable: {}", pdr_id, e);
            false
        }
    };

    let resolved = resolve_pdi(&pdi, registry).map_err(|e| {
        error!("PDR {} has a bad filter description: {}", pdr_id, e);
        PdrError::BadFilterDescription {
            pdr_id,
            description: e.description,
            source: e.source,
        }
    })?;

    let mut assembled = AssembledPdr {
        pdr: None,
        skipped: resolved.skipped,
    };

    let far_id = match element.far_id() {
        Ok(far_id) => far_id,
        Err(e) => return Ok(assembled.abandon(PdrWarning::FarId(e))),
    };

    let mut pdr = resolved.rule;
    pdr.precedence = precedence;
    pdr.pdr_id = pdr_id;
    pdr.seid = seid;
    pdr.ctr_id = 0;
    pdr.far_id = far_id;
    pdr.need_decap = need_decap;

    debug!("{}", pdr);
    assembled.pdr = Some(pdr);
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_pfd::AppPfd;
    use crate::ipfilter::FilterError;
    use crate::pfcp::ie::{
        outer_header_removal_ie, FTeid, OuterHeaderRemoval, PdiElement, RawIe, SdfFilter,
        SourceInterface, UeIpAddress,
    };
    use crate::types::identifiers::{FARID, PDRID, TEID};
    use crate::types::pdr::{Interface, EXACT_U32, EXACT_U8};
    use std::net::Ipv4Addr;

    const UE: Ipv4Addr = Ipv4Addr::new(10, 45, 0, 2);
    const GNB: Ipv4Addr = Ipv4Addr::new(192, 168, 10, 1);
    const SESSION: SEID = SEID(0x1122_3344_5566_7788);

    fn uplink_pdi(extra: Vec<PdiElement>) -> RawIe {
        let mut members = vec![
            PdiElement::SourceInterface(SourceInterface::Access).to_raw(),
            PdiElement::FTeid(FTeid::new_ipv4(TEID(0x100), GNB)).to_raw(),
            PdiElement::UeIpAddress(UeIpAddress::new(Some(UE), None)).to_raw(),
        ];
        members.extend(extra.iter().map(PdiElement::to_raw));
        RawIe::grouped(IeType::Pdi, &members)
    }

    fn create_pdr(pdi: RawIe, ohr: Option<OuterHeaderRemoval>) -> PdrElement {
        let mut ies = vec![
            RawIe::u16(IeType::PdrId, 1),
            RawIe::u32(IeType::Precedence, 255),
            pdi,
            RawIe::u32(IeType::FarId, 3),
        ];
        if let Some(ohr) = ohr {
            ies.push(outer_header_removal_ie(ohr));
        }
        PdrElement::from_ies(ies)
    }

    #[test]
    fn test_assemble_uplink_pdr() {
        let element = create_pdr(
            uplink_pdi(Vec::new()),
            Some(OuterHeaderRemoval::new(OuterHeaderRemoval::GTPU_UDP_IPV4)),
        );
        let assembled = assemble_pdr(&element, SESSION, &AppPfdRegistry::new()).unwrap();
        assert!(assembled.is_built());
        assert!(assembled.skipped.is_empty());
        assert_eq!(assembled.cause(), None);

        let pdr = assembled.pdr.unwrap();
        assert_eq!(pdr.pdr_id, PDRID(1));
        assert_eq!(pdr.precedence, 255);
        assert_eq!(pdr.far_id, FARID(3));
        assert_eq!(pdr.seid, SESSION);
        assert_eq!(pdr.ctr_id, 0);
        assert!(pdr.need_decap);
        assert_eq!(pdr.interface(), Some(Interface::Access));
        assert_eq!(pdr.tunnel_teid, 0x100);
        assert_eq!(pdr.tunnel_ip4_dst, u32::from(GNB));
        assert_eq!(pdr.src_ip, u32::from(UE));
        assert_eq!(pdr.src_ip_mask, EXACT_U32);
    }

    #[test]
    fn test_decap_only_for_gtpu_udp_ipv4() {
        let registry = AppPfdRegistry::new();

        let element = create_pdr(
            uplink_pdi(Vec::new()),
            Some(OuterHeaderRemoval::new(OuterHeaderRemoval::GTPU_UDP_IPV6)),
        );
        let pdr = assemble_pdr(&element, SESSION, &registry).unwrap().pdr.unwrap();
        assert!(!pdr.need_decap);

        let element = create_pdr(uplink_pdi(Vec::new()), None);
        let pdr = assemble_pdr(&element, SESSION, &registry).unwrap().pdr.unwrap();
        assert!(!pdr.need_decap);
    }

    #[test]
    fn test_session_id_keeps_full_width() {
        let element = create_pdr(uplink_pdi(Vec::new()), None);
        let pdr = assemble_pdr(&element, SEID(u64::MAX - 1), &AppPfdRegistry::new())
            .unwrap()
            .pdr
            .unwrap();

        assert_eq!(pdr.seid, SEID(u64::MAX - 1));
    }

    #[test]
    fn test_bad_filter_description_fails_pdr() {
        let sdf = PdiElement::SdfFilter(SdfFilter::with_flow_description(
            "permit out 6 from 10.0.0/24 to any",
        ));
        let element = create_pdr(uplink_pdi(vec![sdf]), None);

        let err = assemble_pdr(&element, SESSION, &AppPfdRegistry::new()).unwrap_err();

        assert_eq!(err.cause(), CauseValue::RuleCreationModificationFailure);
        match err {
            PdrError::BadFilterDescription {
                pdr_id,
                description,
                source,
            } => {
                assert_eq!(pdr_id, PDRID(1));
                assert_eq!(description, "permit out 6 from 10.0.0/24 to any");
                assert_eq!(source, FilterError::InvalidAddress("10.0.0/24".to_string()));
            }
        }
    }

    #[test]
    fn test_bad_application_flow_description_fails_pdr() {
        let registry: AppPfdRegistry =
            std::iter::once(AppPfd::new("app1", vec!["permit out bogus".to_string()])).collect();
        let app = PdiElement::ApplicationId("app1".to_string());
        let element = create_pdr(uplink_pdi(vec![app]), None);

        let err = assemble_pdr(&element, SESSION, &registry).unwrap_err();
        assert!(matches!(err, PdrError::BadFilterDescription { pdr_id: PDRID(1), .. }));
    }

    #[test]
    fn test_unknown_application_still_builds() {
        let app = PdiElement::ApplicationId("missing".to_string());
        let element = create_pdr(uplink_pdi(vec![app]), None);

        let assembled = assemble_pdr(&element, SESSION, &AppPfdRegistry::new()).unwrap();
        assert!(matches!(
            assembled.skipped.as_slice(),
            [PdrWarning::UnknownApplication(id)] if id == "missing"
        ));

        let pdr = assembled.pdr.unwrap();
        assert_eq!(pdr.interface(), Some(Interface::Access));
        assert!(pdr.is_uplink());
        assert_eq!(pdr.precedence, 255);
        assert_eq!(pdr.pdr_id, PDRID(1));
        assert_eq!(pdr.far_id, FARID(3));
        assert_eq!(pdr.proto_mask, 0);
    }

    #[test]
    fn test_application_filter_applied() {
        let registry: AppPfdRegistry = std::iter::once(AppPfd::new(
            "app1",
            vec![
                "permit in ip from any to assigned".to_string(),
                "permit out 17 from assigned to 8.8.8.8 53".to_string(),
            ],
        ))
        .collect();
        let app = PdiElement::ApplicationId("app1".to_string());
        let element = create_pdr(uplink_pdi(vec![app]), None);

        let pdr = assemble_pdr(&element, SESSION, &registry).unwrap().pdr.unwrap();

        assert_eq!(pdr.proto, 17);
        assert_eq!(pdr.proto_mask, EXACT_U8);
        assert_eq!(pdr.dst_ip, u32::from(Ipv4Addr::new(8, 8, 8, 8)));
        assert_eq!(pdr.dst_port, 53);
        assert!(pdr.is_uplink());
    }

    #[test]
    fn test_missing_mandatory_members_abandon_pdr() {
        let registry = AppPfdRegistry::new();

        let no_id = PdrElement::from_ies(vec![RawIe::u32(IeType::Precedence, 1)]);
        let assembled = assemble_pdr(&no_id, SESSION, &registry).unwrap();
        assert!(!assembled.is_built());
        assert!(matches!(
            assembled.skipped.as_slice(),
            [PdrWarning::PdrId(IeError::MissingIe(IeType::PdrId))]
        ));
        assert_eq!(assembled.cause(), Some(CauseValue::MandatoryIeMissing));

        let no_precedence = PdrElement::from_ies(vec![RawIe::u16(IeType::PdrId, 1)]);
        let assembled = assemble_pdr(&no_precedence, SESSION, &registry).unwrap();
        assert!(matches!(assembled.skipped.as_slice(), [PdrWarning::Precedence(_)]));

        let no_pdi = PdrElement::from_ies(vec![
            RawIe::u16(IeType::PdrId, 1),
            RawIe::u32(IeType::Precedence, 1),
            RawIe::u32(IeType::FarId, 1),
        ]);
        let assembled = assemble_pdr(&no_pdi, SESSION, &registry).unwrap();
        assert!(!assembled.is_built());
        assert!(matches!(assembled.skipped.as_slice(), [PdrWarning::Pdi(_)]));
        assert_eq!(assembled.cause(), Some(CauseValue::MandatoryIeMissing));
    }

    #[test]
    fn test_truncated_pdr_id_is_incorrect_ie() {
        let element = PdrElement::from_ies(vec![
            RawIe::u8(IeType::PdrId, 1),
            RawIe::u32(IeType::Precedence, 1),
        ]);

        let assembled = assemble_pdr(&element, SESSION, &AppPfdRegistry::new()).unwrap();

        assert!(!assembled.is_built());
        assert_eq!(assembled.cause(), Some(CauseValue::MandatoryIeIncorrect));
    }

    #[test]
    fn test_missing_far_id_keeps_resolver_warnings() {
        let element = PdrElement::from_ies(vec![
            RawIe::u16(IeType::PdrId, 1),
            RawIe::u32(IeType::Precedence, 1),
            uplink_pdi(vec![PdiElement::ApplicationId("missing".to_string())]),
        ]);

        let assembled = assemble_pdr(&element, SESSION, &AppPfdRegistry::new()).unwrap();

        assert!(!assembled.is_built());
        assert!(matches!(
            assembled.skipped.as_slice(),
            [PdrWarning::UnknownApplication(_), PdrWarning::FarId(_)]
        ));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let registry: AppPfdRegistry = std::iter::once(AppPfd::new(
            "app1",
            vec!["permit out 6 from assigned to 2.2.2.0/24".to_string()],
        ))
        .collect();
        let app = PdiElement::ApplicationId("app1".to_string());
        let element = create_pdr(uplink_pdi(vec![app]), None);

        let first = assemble_pdr(&element, SESSION, &registry).unwrap().pdr;
        let second = assemble_pdr(&element, SESSION, &registry).unwrap().pdr;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_concurrent_assembly_shares_registry() {
        let registry: AppPfdRegistry = std::iter::once(AppPfd::new(
            "app1",
            vec!["permit out 6 from assigned to 2.2.2.0/24".to_string()],
        ))
        .collect();
        let element = create_pdr(
            uplink_pdi(vec![PdiElement::ApplicationId("app1".to_string())]),
            None,
        );
        let expected = assemble_pdr(&element, SESSION, &registry).unwrap().pdr;

        let results: Vec<Option<PDR>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| assemble_pdr(&element, SESSION, &registry).unwrap().pdr))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|pdr| *pdr == expected));
    }
}
