use bytes::{Buf, BufMut, Bytes, BytesMut};
use super::ie::{ensure, get_len_prefixed, put_len_prefixed, IeError, IeResult, IeType, RawIe};

const FLAG_FD: u8 = 0x01;
const FLAG_URL: u8 = 0x02;
const FLAG_DN: u8 = 0x04;
const FLAG_CP: u8 = 0x08;
const FLAG_DNP: u8 = 0x10;
const FLAG_AFD: u8 = 0x20;

/// PFD Contents IE. Only the flow description fields are kept; URLs, domain
/// names and custom contents are skipped over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PfdContents {
    pub flow_description: Option<String>,
    pub additional_flow_descriptions: Vec<String>,
}

impl PfdContents {
    pub fn parse(buf: &mut Bytes) -> IeResult<Self> {
        ensure(buf, 2)?;

        let flags = buf.get_u8();
        let _spare = buf.get_u8();

        let mut contents = PfdContents::default();

        if flags & FLAG_FD != 0 {
            let fd = get_len_prefixed(buf)?;
            contents.flow_description = Some(String::from_utf8(fd.to_vec())?);
        }
        for flag in [FLAG_URL, FLAG_DN, FLAG_CP, FLAG_DNP] {
            if flags & flag != 0 {
                get_len_prefixed(buf)?;
            }
        }
        if flags & FLAG_AFD != 0 {
            let mut afd = get_len_prefixed(buf)?;
            while afd.has_remaining() {
                let fd = get_len_prefixed(&mut afd)?;
                contents
                    .additional_flow_descriptions
                    .push(String::from_utf8(fd.to_vec())?);
            }
        }

        Ok(contents)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.flow_description.is_some() {
            flags |= FLAG_FD;
        }
        if !self.additional_flow_descriptions.is_empty() {
            flags |= FLAG_AFD;
        }
        buf.put_u8(flags);
        buf.put_u8(0);

        if let Some(fd) = &self.flow_description {
            put_len_prefixed(buf, fd.as_bytes());
        }
        if !self.additional_flow_descriptions.is_empty() {
            let mut afd = BytesMut::new();
            for fd in &self.additional_flow_descriptions {
                put_len_prefixed(&mut afd, fd.as_bytes());
            }
            put_len_prefixed(buf, &afd);
        }
    }

    pub fn flow_descriptions(&self) -> impl Iterator<Item = &String> {
        self.flow_description
            .iter()
            .chain(self.additional_flow_descriptions.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PfdContext {
    pub contents: Vec<PfdContents>,
}

impl PfdContext {
    pub fn parse(raw: &RawIe) -> IeResult<Self> {
        let mut contents = Vec::new();
        for ie in raw.children()? {
            if ie.is(IeType::PfdContents) {
                let mut value = ie.payload.clone();
                contents.push(PfdContents::parse(&mut value)?);
            }
        }
        Ok(PfdContext { contents })
    }

    pub fn to_raw(&self) -> RawIe {
        let children: Vec<RawIe> = self
            .contents
            .iter()
            .map(|c| {
                let mut buf = BytesMut::new();
                c.encode(&mut buf);
                RawIe::new(IeType::PfdContents, buf.freeze())
            })
            .collect();
        RawIe::grouped(IeType::PfdContext, &children)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationIdsPfds {
    pub app_id: String,
    pub contexts: Vec<PfdContext>,
}

impl ApplicationIdsPfds {
    pub fn parse(raw: &RawIe) -> IeResult<Self> {
        let mut app_id = None;
        let mut contexts = Vec::new();

        for ie in raw.children()? {
            if ie.is(IeType::ApplicationId) {
                app_id = Some(ie.as_string()?);
            } else if ie.is(IeType::PfdContext) {
                contexts.push(PfdContext::parse(&ie)?);
            }
        }

        let app_id = app_id.ok_or(IeError::MissingIe(IeType::ApplicationId))?;
        Ok(ApplicationIdsPfds { app_id, contexts })
    }

    pub fn to_raw(&self) -> RawIe {
        let mut children = vec![RawIe::new(
            IeType::ApplicationId,
            Bytes::copy_from_slice(self.app_id.as_bytes()),
        )];
        children.extend(self.contexts.iter().map(PfdContext::to_raw));
        RawIe::grouped(IeType::ApplicationIdsPfds, &children)
    }

    pub fn flow_descriptions(&self) -> Vec<String> {
        self.contexts
            .iter()
            .flat_map(|ctx| ctx.contents.iter())
            .flat_map(|c| c.flow_descriptions().cloned())
            .collect()
    }
}
