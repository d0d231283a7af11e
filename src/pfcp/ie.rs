use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use crate::types::identifiers::{FARID, PDRID, SEID, TEID};

const ENTERPRISE_BIT: u16 = 0x8000;

#[derive(Debug, Error)]
pub enum IeError {
    #[error("Buffer too short: need {needed} bytes, got {available}")]
    BufferTooShort { needed: usize, available: usize },
    #[error("Invalid IE type: {0}")]
    InvalidType(u16),
    #[error("Unexpected IE type: expected {expected:?}, got {actual}")]
    UnexpectedType { expected: IeType, actual: u16 },
    #[error("Missing mandatory IE: {0:?}")]
    MissingIe(IeType),
    #[error("Invalid source interface value: {0}")]
    InvalidSourceInterface(u8),
    #[error("Trailing {0} bytes after last IE")]
    TrailingBytes(usize),
    #[error("UTF-8 decode error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

pub type IeResult<T> = Result<T, IeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IeType {
    CreatePdr = 1,
    Pdi = 2,
    UpdatePdr = 9,
    SourceInterface = 20,
    FTeid = 21,
    NetworkInstance = 22,
    SdfFilter = 23,
    ApplicationId = 24,
    Precedence = 29,
    PdrId = 56,
    FSeid = 57,
    ApplicationIdsPfds = 58,
    PfdContext = 59,
    PfdContents = 61,
    UeIpAddress = 93,
    OuterHeaderRemoval = 95,
    FarId = 108,
    Qfi = 124,
}

impl IeType {
    pub fn from_u16(value: u16) -> IeResult<Self> {
        match value {
            1 => Ok(IeType::CreatePdr),
            2 => Ok(IeType::Pdi),
            9 => Ok(IeType::UpdatePdr),
            20 => Ok(IeType::SourceInterface),
            21 => Ok(IeType::FTeid),
            22 => Ok(IeType::NetworkInstance),
            23 => Ok(IeType::SdfFilter),
            24 => Ok(IeType::ApplicationId),
            29 => Ok(IeType::Precedence),
            56 => Ok(IeType::PdrId),
            57 => Ok(IeType::FSeid),
            58 => Ok(IeType::ApplicationIdsPfds),
            59 => Ok(IeType::PfdContext),
            61 => Ok(IeType::PfdContents),
            93 => Ok(IeType::UeIpAddress),
            95 => Ok(IeType::OuterHeaderRemoval),
            108 => Ok(IeType::FarId),
            124 => Ok(IeType::Qfi),
            _ => Err(IeError::InvalidType(value)),
        }
    }
}

pub(crate) fn ensure(buf: &Bytes, needed: usize) -> IeResult<()> {
    if buf.remaining() < needed {
        return Err(IeError::BufferTooShort {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

pub(crate) fn get_len_prefixed(buf: &mut Bytes) -> IeResult<Bytes> {
    ensure(buf, 2)?;
    let len = buf.get_u16() as usize;
    ensure(buf, len)?;
    Ok(buf.split_to(len))
}

pub(crate) fn put_len_prefixed(buf: &mut BytesMut, value: &[u8]) {
    buf.put_u16(value.len() as u16);
    buf.put_slice(value);
}

/// An undecoded TLV. Grouped IEs keep their children in `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIe {
    pub ie_type: u16,
    pub enterprise_id: Option<u16>,
    pub payload: Bytes,
}

impl RawIe {
    pub fn new(ie_type: IeType, payload: Bytes) -> Self {
        RawIe {
            ie_type: ie_type as u16,
            enterprise_id: None,
            payload,
        }
    }

    pub fn grouped(ie_type: IeType, children: &[RawIe]) -> Self {
        let mut buf = BytesMut::new();
        encode_ies(children, &mut buf);
        RawIe::new(ie_type, buf.freeze())
    }

    pub fn u8(ie_type: IeType, value: u8) -> Self {
        RawIe::new(ie_type, Bytes::copy_from_slice(&[value]))
    }

    pub fn u16(ie_type: IeType, value: u16) -> Self {
        RawIe::new(ie_type, Bytes::copy_from_slice(&value.to_be_bytes()))
    }

    pub fn u32(ie_type: IeType, value: u32) -> Self {
        RawIe::new(ie_type, Bytes::copy_from_slice(&value.to_be_bytes()))
    }

    pub fn is(&self, ie_type: IeType) -> bool {
        self.enterprise_id.is_none() && self.ie_type == ie_type as u16
    }

    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 4)?;

        let ie_type = buf.get_u16();
        let ie_len = buf.get_u16() as usize;
        ensure(buf, ie_len)?;

        let mut payload = buf.split_to(ie_len);
        let enterprise_id = if ie_type & ENTERPRISE_BIT != 0 {
            ensure(&payload, 2)?;
            Some(payload.get_u16())
        } else {
            None
        };

        Ok(RawIe {
            ie_type,
            enterprise_id,
            payload,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.ie_type);
        buf.put_u16(self.len() as u16);
        if let Some(enterprise_id) = self.enterprise_id {
            buf.put_u16(enterprise_id);
        }
        buf.put_slice(&self.payload);
    }

    pub fn len(&self) -> usize {
        self.payload.len() + if self.enterprise_id.is_some() { 2 } else { 0 }
    }

    pub fn children(&self) -> IeResult<Vec<RawIe>> {
        let mut payload = self.payload.clone();
        parse_ies(&mut payload)
    }

    pub fn as_u8(&self) -> IeResult<u8> {
        let mut value = self.payload.clone();
        ensure(&value, 1)?;
        Ok(value.get_u8())
    }

    pub fn as_u16(&self) -> IeResult<u16> {
        let mut value = self.payload.clone();
        ensure(&value, 2)?;
        Ok(value.get_u16())
    }

    pub fn as_u32(&self) -> IeResult<u32> {
        let mut value = self.payload.clone();
        ensure(&value, 4)?;
        Ok(value.get_u32())
    }

    pub fn as_string(&self) -> IeResult<String> {
        Ok(String::from_utf8(self.payload.to_vec())?)
    }
}

pub fn parse_ies(buf: &mut Bytes) -> IeResult<Vec<RawIe>> {
    let mut ies = Vec::new();
    while buf.remaining() >= 4 {
        ies.push(RawIe::parse(buf)?);
    }
    if buf.has_remaining() {
        return Err(IeError::TrailingBytes(buf.remaining()));
    }
    Ok(ies)
}

pub fn encode_ies(ies: &[RawIe], buf: &mut BytesMut) {
    for ie in ies {
        ie.encode(buf);
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInterface {
    Access = 0,
    Core = 1,
    N6Lan = 2,
    CpFunction = 3,
    VnInternal = 4,
}

impl SourceInterface {
    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 1)?;
        let value = buf.get_u8() & 0x0F;
        match value {
            0 => Ok(SourceInterface::Access),
            1 => Ok(SourceInterface::Core),
            2 => Ok(SourceInterface::N6Lan),
            3 => Ok(SourceInterface::CpFunction),
            4 => Ok(SourceInterface::VnInternal),
            v => Err(IeError::InvalidSourceInterface(v)),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(*self as u8);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FTeid {
    pub teid: TEID,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub choose: bool,
    pub choose_id: Option<u8>,
}

impl FTeid {
    pub fn new_ipv4(teid: TEID, addr: Ipv4Addr) -> Self {
        FTeid {
            teid,
            ipv4: Some(addr),
            ipv6: None,
            choose: false,
            choose_id: None,
        }
    }

    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 1)?;

        let flags = buf.get_u8();
        let v4 = (flags & 0x01) != 0;
        let v6 = (flags & 0x02) != 0;
        let choose = (flags & 0x04) != 0;
        let chid = (flags & 0x08) != 0;

        if choose {
            // TEID and addresses are left for the UP function to allocate
            let choose_id = if chid {
                ensure(buf, 1)?;
                Some(buf.get_u8())
            } else {
                None
            };
            return Ok(FTeid {
                teid: TEID(0),
                ipv4: None,
                ipv6: None,
                choose: true,
                choose_id,
            });
        }

        ensure(buf, 4)?;
        let teid = TEID(buf.get_u32());

        let ipv4 = if v4 {
            ensure(buf, 4)?;
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            Some(Ipv4Addr::from(octets))
        } else {
            None
        };

        let ipv6 = if v6 {
            ensure(buf, 16)?;
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            Some(Ipv6Addr::from(octets))
        } else {
            None
        };

        Ok(FTeid {
            teid,
            ipv4,
            ipv6,
            choose: false,
            choose_id: None,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.ipv4.is_some() {
            flags |= 0x01;
        }
        if self.ipv6.is_some() {
            flags |= 0x02;
        }
        if self.choose {
            flags |= 0x04;
            if self.choose_id.is_some() {
                flags |= 0x08;
            }
        }
        buf.put_u8(flags);

        if self.choose {
            if let Some(id) = self.choose_id {
                buf.put_u8(id);
            }
            return;
        }

        buf.put_u32(self.teid.0);
        if let Some(ipv4) = self.ipv4 {
            buf.put_slice(&ipv4.octets());
        }
        if let Some(ipv6) = self.ipv6 {
            buf.put_slice(&ipv6.octets());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeIpAddress {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl UeIpAddress {
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        UeIpAddress { ipv4, ipv6 }
    }

    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 1)?;

        let flags = buf.get_u8();
        let v6 = (flags & 0x01) != 0;
        let v4 = (flags & 0x02) != 0;
        let chv4 = (flags & 0x10) != 0;
        let chv6 = (flags & 0x20) != 0;

        let ipv4 = if v4 && !chv4 {
            ensure(buf, 4)?;
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            Some(Ipv4Addr::from(octets))
        } else {
            None
        };

        let ipv6 = if v6 && !chv6 {
            ensure(buf, 16)?;
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            Some(Ipv6Addr::from(octets))
        } else {
            None
        };

        Ok(UeIpAddress { ipv4, ipv6 })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.ipv4.is_some() {
            flags |= 0x02;
        }
        if self.ipv6.is_some() {
            flags |= 0x01;
        }

        buf.put_u8(flags);

        if let Some(ipv4) = self.ipv4 {
            buf.put_slice(&ipv4.octets());
        }

        if let Some(ipv6) = self.ipv6 {
            buf.put_slice(&ipv6.octets());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdfFilter {
    pub flow_description: String,
    pub tos_traffic_class: Option<u16>,
    pub security_parameter_index: Option<u32>,
    pub flow_label: Option<u32>,
    pub filter_id: Option<u32>,
}

impl SdfFilter {
    pub fn with_flow_description(flow_description: &str) -> Self {
        SdfFilter {
            flow_description: flow_description.to_string(),
            ..Default::default()
        }
    }

    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 2)?;

        let flags = buf.get_u8();
        let _spare = buf.get_u8();

        let mut sdf = SdfFilter::default();

        if flags & 0x01 != 0 {
            let fd = get_len_prefixed(buf)?;
            sdf.flow_description = String::from_utf8(fd.to_vec())?;
        }
        if flags & 0x02 != 0 {
            ensure(buf, 2)?;
            sdf.tos_traffic_class = Some(buf.get_u16());
        }
        if flags & 0x04 != 0 {
            ensure(buf, 4)?;
            sdf.security_parameter_index = Some(buf.get_u32());
        }
        if flags & 0x08 != 0 {
            ensure(buf, 3)?;
            sdf.flow_label = Some(buf.get_uint(3) as u32);
        }
        if flags & 0x10 != 0 {
            ensure(buf, 4)?;
            sdf.filter_id = Some(buf.get_u32());
        }

        Ok(sdf)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if !self.flow_description.is_empty() {
            flags |= 0x01;
        }
        if self.tos_traffic_class.is_some() {
            flags |= 0x02;
        }
        if self.security_parameter_index.is_some() {
            flags |= 0x04;
        }
        if self.flow_label.is_some() {
            flags |= 0x08;
        }
        if self.filter_id.is_some() {
            flags |= 0x10;
        }
        buf.put_u8(flags);
        buf.put_u8(0);

        if !self.flow_description.is_empty() {
            put_len_prefixed(buf, self.flow_description.as_bytes());
        }
        if let Some(ttc) = self.tos_traffic_class {
            buf.put_u16(ttc);
        }
        if let Some(spi) = self.security_parameter_index {
            buf.put_u32(spi);
        }
        if let Some(fl) = self.flow_label {
            buf.put_uint(fl as u64, 3);
        }
        if let Some(id) = self.filter_id {
            buf.put_u32(id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuterHeaderRemoval {
    pub description: u8,
    pub gtpu_extension_header_deletion: Option<u8>,
}

impl OuterHeaderRemoval {
    pub const GTPU_UDP_IPV4: u8 = 0;
    pub const GTPU_UDP_IPV6: u8 = 1;

    pub fn new(description: u8) -> Self {
        OuterHeaderRemoval {
            description,
            gtpu_extension_header_deletion: None,
        }
    }

    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 1)?;
        let description = buf.get_u8();
        let gtpu_extension_header_deletion = if buf.has_remaining() {
            Some(buf.get_u8())
        } else {
            None
        };
        Ok(OuterHeaderRemoval {
            description,
            gtpu_extension_header_deletion,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.description);
        if let Some(deletion) = self.gtpu_extension_header_deletion {
            buf.put_u8(deletion);
        }
    }

    pub fn is_gtpu_udp_ipv4(&self) -> bool {
        self.description == Self::GTPU_UDP_IPV4
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FSeid {
    pub seid: SEID,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl FSeid {
    pub fn new(seid: SEID, ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        FSeid { seid, ipv4, ipv6 }
    }

    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 9)?;

        let flags = buf.get_u8();
        let v4 = (flags & 0x02) != 0;
        let v6 = (flags & 0x01) != 0;

        let seid = SEID(buf.get_u64());

        let ipv4 = if v4 {
            ensure(buf, 4)?;
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            Some(Ipv4Addr::from(octets))
        } else {
            None
        };

        let ipv6 = if v6 {
            ensure(buf, 16)?;
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            Some(Ipv6Addr::from(octets))
        } else {
            None
        };

        Ok(FSeid { seid, ipv4, ipv6 })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.ipv4.is_some() {
            flags |= 0x02;
        }
        if self.ipv6.is_some() {
            flags |= 0x01;
        }

        buf.put_u8(flags);
        buf.put_u64(self.seid.0);

        if let Some(ipv4) = self.ipv4 {
            buf.put_slice(&ipv4.octets());
        }

        if let Some(ipv6) = self.ipv6 {
            buf.put_slice(&ipv6.octets());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInstance(pub String);

impl NetworkInstance {
    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        let name_bytes = buf.chunk().to_vec();
        buf.advance(name_bytes.len());
        let name = String::from_utf8(name_bytes)?;
        Ok(NetworkInstance(name))
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.0.as_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdiElement {
    SourceInterface(SourceInterface),
    FTeid(FTeid),
    NetworkInstance(NetworkInstance),
    UeIpAddress(UeIpAddress),
    SdfFilter(SdfFilter),
    ApplicationId(String),
    Qfi(u8),
    Unrecognized(u16),
}

impl PdiElement {
    pub fn decode(raw: &RawIe) -> IeResult<Self> {
        if raw.enterprise_id.is_some() {
            return Ok(PdiElement::Unrecognized(raw.ie_type));
        }

        let mut value = raw.payload.clone();
        match IeType::from_u16(raw.ie_type) {
            Ok(IeType::SourceInterface) => Ok(PdiElement::SourceInterface(
                SourceInterface::parse(&mut value)?,
            )),
            Ok(IeType::FTeid) => Ok(PdiElement::FTeid(FTeid::parse(&mut value)?)),
            Ok(IeType::NetworkInstance) => Ok(PdiElement::NetworkInstance(
                NetworkInstance::parse(&mut value)?,
            )),
            Ok(IeType::UeIpAddress) => Ok(PdiElement::UeIpAddress(
                UeIpAddress::parse(&mut value)?,
            )),
            Ok(IeType::SdfFilter) => Ok(PdiElement::SdfFilter(SdfFilter::parse(&mut value)?)),
            Ok(IeType::ApplicationId) => Ok(PdiElement::ApplicationId(raw.as_string()?)),
            Ok(IeType::Qfi) => Ok(PdiElement::Qfi(raw.as_u8()? & 0x3F)),
            _ => Ok(PdiElement::Unrecognized(raw.ie_type)),
        }
    }

    pub fn to_raw(&self) -> RawIe {
        let mut buf = BytesMut::new();
        let ie_type = match self {
            PdiElement::SourceInterface(iface) => {
                iface.encode(&mut buf);
                IeType::SourceInterface as u16
            }
            PdiElement::FTeid(fteid) => {
                fteid.encode(&mut buf);
                IeType::FTeid as u16
            }
            PdiElement::NetworkInstance(ni) => {
                ni.encode(&mut buf);
                IeType::NetworkInstance as u16
            }
            PdiElement::UeIpAddress(ue_ip) => {
                ue_ip.encode(&mut buf);
                IeType::UeIpAddress as u16
            }
            PdiElement::SdfFilter(sdf) => {
                sdf.encode(&mut buf);
                IeType::SdfFilter as u16
            }
            PdiElement::ApplicationId(app_id) => {
                buf.put_slice(app_id.as_bytes());
                IeType::ApplicationId as u16
            }
            PdiElement::Qfi(qfi) => {
                buf.put_u8(*qfi & 0x3F);
                IeType::Qfi as u16
            }
            PdiElement::Unrecognized(ie_type) => *ie_type,
        };
        RawIe {
            ie_type,
            enterprise_id: None,
            payload: buf.freeze(),
        }
    }
}

/// A Create PDR or Update PDR grouped IE. Members are decoded on access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdrElement {
    ies: Vec<RawIe>,
}

impl PdrElement {
    pub fn from_ies(ies: Vec<RawIe>) -> Self {
        PdrElement { ies }
    }

    pub fn parse(raw: &RawIe) -> IeResult<Self> {
        if !raw.is(IeType::CreatePdr) && !raw.is(IeType::UpdatePdr) {
            return Err(IeError::UnexpectedType {
                expected: IeType::CreatePdr,
                actual: raw.ie_type,
            });
        }
        Ok(PdrElement {
            ies: raw.children()?,
        })
    }

    pub fn to_raw(&self, ie_type: IeType) -> RawIe {
        RawIe::grouped(ie_type, &self.ies)
    }

    fn find(&self, ie_type: IeType) -> IeResult<&RawIe> {
        self.ies
            .iter()
            .find(|ie| ie.is(ie_type))
            .ok_or(IeError::MissingIe(ie_type))
    }

    pub fn pdr_id(&self) -> IeResult<PDRID> {
        Ok(PDRID(self.find(IeType::PdrId)?.as_u16()?))
    }

    pub fn precedence(&self) -> IeResult<u32> {
        self.find(IeType::Precedence)?.as_u32()
    }

    pub fn pdi(&self) -> IeResult<Vec<RawIe>> {
        self.find(IeType::Pdi)?.children()
    }

    pub fn outer_header_removal(&self) -> IeResult<OuterHeaderRemoval> {
        let mut value = self.find(IeType::OuterHeaderRemoval)?.payload.clone();
        OuterHeaderRemoval::parse(&mut value)
    }

    pub fn far_id(&self) -> IeResult<FARID> {
        Ok(FARID(self.find(IeType::FarId)?.as_u32()?))
    }
}

pub fn outer_header_removal_ie(ohr: OuterHeaderRemoval) -> RawIe {
    let mut buf = BytesMut::new();
    ohr.encode(&mut buf);
    RawIe::new(IeType::OuterHeaderRemoval, buf.freeze())
}

pub fn fseid_ie(fseid: &FSeid) -> RawIe {
    let mut buf = BytesMut::new();
    fseid.encode(&mut buf);
    RawIe::new(IeType::FSeid, buf.freeze())
}
