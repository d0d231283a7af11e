use bytes::{Bytes, BytesMut};
use super::ie::{encode_ies, parse_ies, FSeid, IeResult, IeType, PdrElement, RawIe};
use super::pfd::ApplicationIdsPfds;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub cp_fseid: Option<FSeid>,
    pub pdrs: Vec<PdrElement>,
}

impl SessionRequest {
    pub fn parse(mut buf: Bytes) -> IeResult<Self> {
        let ies = parse_ies(&mut buf)?;

        let mut cp_fseid = None;
        let mut pdrs = Vec::new();

        for ie in ies {
            if ie.is(IeType::FSeid) {
                let mut value = ie.payload.clone();
                cp_fseid = Some(FSeid::parse(&mut value)?);
            } else if ie.is(IeType::CreatePdr) || ie.is(IeType::UpdatePdr) {
                pdrs.push(PdrElement::parse(&ie)?);
            }
        }

        Ok(SessionRequest { cp_fseid, pdrs })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PfdManagementRequest {
    pub applications: Vec<ApplicationIdsPfds>,
}

impl PfdManagementRequest {
    pub fn parse(mut buf: Bytes) -> IeResult<Self> {
        let ies = parse_ies(&mut buf)?;

        let mut applications = Vec::new();
        for ie in ies {
            if ie.is(IeType::ApplicationIdsPfds) {
                applications.push(ApplicationIdsPfds::parse(&ie)?);
            }
        }

        Ok(PfdManagementRequest { applications })
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        let ies: Vec<RawIe> = self.applications.iter().map(ApplicationIdsPfds::to_raw).collect();
        encode_ies(&ies, &mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::ie::fseid_ie;
    use super::super::pfd::{PfdContents, PfdContext};
    use crate::types::identifiers::{PDRID, SEID};
    use std::net::Ipv4Addr;

    #[test]
    fn test_session_request_collects_pdrs() {
        let create = PdrElement::from_ies(vec![RawIe::u16(IeType::PdrId, 1)]);
        let update = PdrElement::from_ies(vec![RawIe::u16(IeType::PdrId, 2)]);
        let fseid = FSeid::new(SEID(0x42), Some(Ipv4Addr::new(10, 0, 0, 1)), None);

        let mut buf = BytesMut::new();
        encode_ies(
            &[
                fseid_ie(&fseid),
                create.to_raw(IeType::CreatePdr),
                RawIe::u32(IeType::FarId, 9),
                update.to_raw(IeType::UpdatePdr),
            ],
            &mut buf,
        );

        let req = SessionRequest::parse(buf.freeze()).unwrap();

        assert_eq!(req.cp_fseid, Some(fseid));
        assert_eq!(req.pdrs.len(), 2);
        assert_eq!(req.pdrs[0].pdr_id().unwrap(), PDRID(1));
        assert_eq!(req.pdrs[1].pdr_id().unwrap(), PDRID(2));
    }

    #[test]
    fn test_pfd_management_request() {
        let req = PfdManagementRequest {
            applications: vec![ApplicationIdsPfds {
                app_id: "video".to_string(),
                contexts: vec![PfdContext {
                    contents: vec![PfdContents {
                        flow_description: Some("permit out 6 from 198.51.100.0/24 443 to assigned".to_string()),
                        additional_flow_descriptions: Vec::new(),
                    }],
                }],
            }],
        };

        let parsed = PfdManagementRequest::parse(req.encode().freeze()).unwrap();
        assert_eq!(parsed, req);
    }
}
