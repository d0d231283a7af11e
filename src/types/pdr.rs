use crate::types::identifiers::{FARID, PDRID, SEID};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

pub const EXACT_U8: u8 = 0xFF;
pub const EXACT_U16: u16 = 0xFFFF;
pub const EXACT_U32: u32 = 0xFFFF_FFFF;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interface {
    Access = 0x1,
    Core = 0x2,
}

impl Interface {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x1 => Some(Interface::Access),
            0x2 => Some(Interface::Core),
            _ => None,
        }
    }
}

/// Packet Detection Rule in dataplane form.
///
/// Every matchable field is paired with a mask: all ones means exact match,
/// zero means the field is ignored. Addresses are IPv4 in host order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PDR {
    pub src_iface: u8,
    pub tunnel_ip4_dst: u32,
    pub tunnel_teid: u32,
    pub src_ip: u32,
    pub dst_ip: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub proto: u8,

    pub src_iface_mask: u8,
    pub tunnel_ip4_dst_mask: u32,
    pub tunnel_teid_mask: u32,
    pub src_ip_mask: u32,
    pub dst_ip_mask: u32,
    pub src_port_mask: u16,
    pub dst_port_mask: u16,
    pub proto_mask: u8,

    pub precedence: u32,
    pub pdr_id: PDRID,
    pub seid: SEID,
    pub ctr_id: u32,
    pub far_id: FARID,
    pub need_decap: bool,
}

impl PDR {
    pub fn interface(&self) -> Option<Interface> {
        if self.src_iface_mask == 0 {
            return None;
        }
        Interface::from_u8(self.src_iface)
    }

    pub fn set_interface(&mut self, iface: Interface) {
        self.src_iface = iface as u8;
        self.src_iface_mask = EXACT_U8;
    }

    pub fn set_tunnel(&mut self, teid: u32, dst: Ipv4Addr) {
        self.tunnel_teid = teid;
        self.tunnel_teid_mask = EXACT_U32;
        self.tunnel_ip4_dst = u32::from(dst);
        self.tunnel_ip4_dst_mask = EXACT_U32;
    }

    pub fn is_uplink(&self) -> bool {
        self.tunnel_teid_mask != 0
    }
}

impl fmt::Display for PDR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "------------------ PDR ---------------------")?;
        writeln!(f, "src iface: {}", self.src_iface)?;
        writeln!(f, "tunnel ip4 dst: {}", Ipv4Addr::from(self.tunnel_ip4_dst))?;
        writeln!(f, "tunnel teid: {:#x}", self.tunnel_teid)?;
        writeln!(f, "src ip: {}", Ipv4Addr::from(self.src_ip))?;
        writeln!(f, "dst ip: {}", Ipv4Addr::from(self.dst_ip))?;
        writeln!(f, "src port: {}", self.src_port)?;
        writeln!(f, "dst port: {}", self.dst_port)?;
        writeln!(f, "proto: {}", self.proto)?;
        writeln!(f, "src iface mask: {:#x}", self.src_iface_mask)?;
        writeln!(f, "tunnel ip4 dst mask: {}", Ipv4Addr::from(self.tunnel_ip4_dst_mask))?;
        writeln!(f, "tunnel teid mask: {:#x}", self.tunnel_teid_mask)?;
        writeln!(f, "src ip mask: {}", Ipv4Addr::from(self.src_ip_mask))?;
        writeln!(f, "dst ip mask: {}", Ipv4Addr::from(self.dst_ip_mask))?;
        writeln!(f, "src port mask: {:#x}", self.src_port_mask)?;
        writeln!(f, "dst port mask: {:#x}", self.dst_port_mask)?;
        writeln!(f, "proto mask: {:#x}", self.proto_mask)?;
        writeln!(f, "precedence: {}", self.precedence)?;
        writeln!(f, "pdr id: {}", self.pdr_id)?;
        writeln!(f, "seid: {}", self.seid)?;
        writeln!(f, "ctr id: {}", self.ctr_id)?;
        writeln!(f, "far id: {}", self.far_id)?;
        writeln!(f, "need decap: {}", self.need_decap)?;
        write!(f, "--------------------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pdr_is_all_wildcard() {
        let pdr = PDR::default();
        assert_eq!(pdr.interface(), None);
        assert!(!pdr.is_uplink());
        assert_eq!(pdr.src_ip_mask, 0);
        assert_eq!(pdr.dst_ip_mask, 0);
        assert_eq!(pdr.proto_mask, 0);
    }

    #[test]
    fn test_set_tunnel_sets_both_masks() {
        let mut pdr = PDR::default();
        pdr.set_tunnel(0x1234, Ipv4Addr::new(192, 168, 0, 1));

        assert!(pdr.is_uplink());
        assert_eq!(pdr.tunnel_teid, 0x1234);
        assert_eq!(pdr.tunnel_teid_mask, EXACT_U32);
        assert_eq!(pdr.tunnel_ip4_dst, 0xC0A8_0001);
        assert_eq!(pdr.tunnel_ip4_dst_mask, EXACT_U32);
    }

    #[test]
    fn test_interface_requires_mask() {
        let mut pdr = PDR::default();
        pdr.src_iface = Interface::Core as u8;
        assert_eq!(pdr.interface(), None);

        pdr.set_interface(Interface::Core);
        assert_eq!(pdr.interface(), Some(Interface::Core));
        assert_eq!(pdr.src_iface_mask, EXACT_U8);
    }
}
