use super::types::{MessageType, PFCP_VERSION};
use crate::types::identifiers::SEID;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PfcpError {
    #[error("Invalid PFCP version: {0}")]
    InvalidVersion(u8),

    #[error("Invalid message length: {0}")]
    InvalidLength(usize),

    #[error("Buffer too short: need {need}, have {have}")]
    BufferTooShort { need: usize, have: usize },

    #[error("Unexpected message type: {0:?}")]
    UnexpectedMessageType(MessageType),
}

pub type Result<T> = std::result::Result<T, PfcpError>;

const FLAG_SEID: u8 = 0x01;

fn need(buf: &Bytes, need: usize) -> Result<()> {
    if buf.len() < need {
        return Err(PfcpError::BufferTooShort {
            need,
            have: buf.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PfcpHeader {
    pub version: u8,
    pub message_type: MessageType,
    pub message_length: u16,
    pub seid: Option<SEID>,
    pub sequence_number: u32,
}

impl PfcpHeader {
    pub fn new(message_type: MessageType, seid: Option<SEID>, sequence_number: u32) -> Self {
        Self {
            version: PFCP_VERSION,
            message_type,
            message_length: 0,
            seid,
            sequence_number,
        }
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self> {
        need(buf, 4)?;

        let flags = buf.get_u8();
        let version = flags >> 5;
        if version != PFCP_VERSION {
            return Err(PfcpError::InvalidVersion(version));
        }

        let message_type = MessageType::from(buf.get_u8());
        let message_length = buf.get_u16();

        // SEID (if flagged), 3-byte sequence number, spare
        let seid_present = flags & FLAG_SEID != 0;
        need(buf, if seid_present { 12 } else { 4 })?;
        let seid = seid_present.then(|| SEID(buf.get_u64()));
        let sequence_number = buf.get_uint(3) as u32;
        buf.advance(1);

        Ok(Self {
            version,
            message_type,
            message_length,
            seid,
            sequence_number,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let flags = if self.seid.is_some() { FLAG_SEID } else { 0 };
        buf.put_u8((self.version << 5) | flags);
        buf.put_u8(self.message_type.into());
        buf.put_u16(self.message_length);
        if let Some(seid) = self.seid {
            buf.put_u64(seid.0);
        }
        buf.put_uint(self.sequence_number as u64, 3);
        buf.put_u8(0);
    }

    pub fn header_len(&self) -> usize {
        match self.seid {
            Some(_) => 16,
            None => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PfcpMessage {
    pub header: PfcpHeader,
    pub payload: Bytes,
}

impl PfcpMessage {
    pub fn new(message_type: MessageType, seid: Option<SEID>, sequence_number: u32, payload: Bytes) -> Self {
        let mut header = PfcpHeader::new(message_type, seid, sequence_number);
        // Length counts everything after the first four octets
        header.message_length = (header.header_len() - 4 + payload.len()) as u16;

        Self {
            header,
            payload,
        }
    }

    pub fn parse(mut buf: Bytes) -> Result<Self> {
        let header = PfcpHeader::parse(&mut buf)?;

        let expected_payload_len = (header.message_length as usize)
            .checked_sub(header.header_len() - 4)
            .ok_or(PfcpError::InvalidLength(header.message_length as usize))?;
        need(&buf, expected_payload_len)?;
        let payload = buf.split_to(expected_payload_len);

        Ok(Self { header, payload })
    }

    pub fn expect_type(&self, expected: &[MessageType]) -> Result<()> {
        if expected.contains(&self.header.message_type) {
            Ok(())
        } else {
            Err(PfcpError::UnexpectedMessageType(self.header.message_type))
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.header.header_len() + self.payload.len());
        self.header.encode(&mut buf);
        buf.put_slice(&self.payload);
        buf
    }
}
