//! IPFilterRule parsing for PFCP flow descriptions.
//!
//! Grammar: `action dir proto from src [ports] to dst [ports] [options]`, e.g.
//! `permit out 17 from 10.0.0.0/24 5000-5010 to assigned 53`.

use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

pub const RESERVED_PROTO: u8 = 0xFF;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Empty flow description")]
    Empty,
    #[error("Missing keyword: {0}")]
    MissingKeyword(&'static str),
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Address negation not supported: {0}")]
    NegationNotSupported(String),
    #[error("Only IPv4 addresses are supported: {0}")]
    UnsupportedAddressFamily(String),
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Permit,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub low: u16,
    pub high: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        PortRange { low: port, high: port }
    }

    pub fn is_single(&self) -> bool {
        self.low == self.high
    }

    fn parse(s: &str) -> FilterResult<Self> {
        let invalid = || FilterError::InvalidPort(s.to_string());
        match s.split_once('-') {
            Some((low, high)) => {
                let low: u16 = low.parse().map_err(|_| invalid())?;
                let high: u16 = high.parse().map_err(|_| invalid())?;
                if low > high {
                    return Err(invalid());
                }
                Ok(PortRange { low, high })
            }
            None => Ok(PortRange::single(s.parse().map_err(|_| invalid())?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
    pub ports: Vec<PortRange>,
}

impl Endpoint {
    fn any() -> Self {
        Endpoint {
            addr: Ipv4Addr::UNSPECIFIED,
            prefix_len: 0,
            ports: Vec::new(),
        }
    }

    pub fn ip(&self) -> u32 {
        u32::from(self.addr) & self.mask()
    }

    pub fn mask(&self) -> u32 {
        u32::MAX.checked_shl(32 - self.prefix_len as u32).unwrap_or(0)
    }

    /// The port when exactly one single port is given; anything else cannot
    /// be expressed as a value/mask pair.
    pub fn exact_port(&self) -> Option<u16> {
        match self.ports.as_slice() {
            [range] if range.is_single() => Some(range.low),
            _ => None,
        }
    }

    fn parse_addr(token: &str, ue_ip: Option<Ipv4Addr>) -> FilterResult<Self> {
        if token.starts_with('!') {
            return Err(FilterError::NegationNotSupported(token.to_string()));
        }

        match token {
            "any" => return Ok(Endpoint::any()),
            "assigned" => {
                return Ok(match ue_ip {
                    Some(addr) => Endpoint {
                        addr,
                        prefix_len: 32,
                        ports: Vec::new(),
                    },
                    None => Endpoint::any(),
                })
            }
            _ => {}
        }

        let (addr_part, prefix_len) = match token.split_once('/') {
            Some((addr, len)) => {
                let len: u8 = len
                    .parse()
                    .map_err(|_| FilterError::InvalidAddress(token.to_string()))?;
                (addr, Some(len))
            }
            None => (token, None),
        };

        let addr = match Ipv4Addr::from_str(addr_part) {
            Ok(addr) => addr,
            Err(_) if addr_part.contains(':') => {
                return Err(FilterError::UnsupportedAddressFamily(token.to_string()))
            }
            Err(_) => return Err(FilterError::InvalidAddress(token.to_string())),
        };

        let prefix_len = prefix_len.unwrap_or(32);
        if prefix_len > 32 {
            return Err(FilterError::InvalidAddress(token.to_string()));
        }

        Ok(Endpoint {
            addr,
            prefix_len,
            ports: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpFilterRule {
    pub action: FilterAction,
    pub direction: FilterDirection,
    pub proto: u8,
    pub src: Endpoint,
    pub dst: Endpoint,
}

impl IpFilterRule {
    /// Parses a flow description. `assigned` resolves to `ue_ip`, or to any
    /// address when the UE address is unknown.
    pub fn parse(flow_desc: &str, ue_ip: Option<Ipv4Addr>) -> FilterResult<Self> {
        let tokens: Vec<&str> = flow_desc.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(FilterError::Empty);
        }

        let action = match tokens[0] {
            "permit" => FilterAction::Permit,
            "deny" => FilterAction::Deny,
            other => return Err(FilterError::InvalidAction(other.to_string())),
        };

        let direction = match tokens.get(1) {
            Some(&"in") => FilterDirection::In,
            Some(&"out") => FilterDirection::Out,
            Some(other) => return Err(FilterError::InvalidDirection(other.to_string())),
            None => return Err(FilterError::MissingKeyword("direction")),
        };

        let proto = match tokens.get(2) {
            Some(proto) => parse_protocol(proto)?,
            None => return Err(FilterError::MissingKeyword("protocol")),
        };

        if tokens.get(3) != Some(&"from") {
            return Err(FilterError::MissingKeyword("from"));
        }
        let to_idx = tokens
            .iter()
            .position(|&t| t == "to")
            .ok_or(FilterError::MissingKeyword("to"))?;

        let src = parse_endpoint(&tokens[4..to_idx], ue_ip)?;
        let dst = parse_endpoint(&tokens[to_idx + 1..], ue_ip)?;

        Ok(IpFilterRule {
            action,
            direction,
            proto,
            src,
            dst,
        })
    }
}

fn parse_protocol(proto: &str) -> FilterResult<u8> {
    match proto.to_ascii_lowercase().as_str() {
        "ip" => Ok(RESERVED_PROTO),
        "icmp" => Ok(1),
        "tcp" => Ok(6),
        "udp" => Ok(17),
        _ => match proto.parse::<u8>() {
            Ok(RESERVED_PROTO) | Err(_) => Err(FilterError::InvalidProtocol(proto.to_string())),
            Ok(value) => Ok(value),
        },
    }
}

fn parse_endpoint(tokens: &[&str], ue_ip: Option<Ipv4Addr>) -> FilterResult<Endpoint> {
    let (addr, rest) = tokens
        .split_first()
        .ok_or(FilterError::MissingKeyword("address"))?;

    let mut endpoint = Endpoint::parse_addr(addr, ue_ip)?;

    // Options such as `frag` or `established` may follow the destination.
    if let Some(ports) = rest.first() {
        if ports.starts_with(|c: char| c.is_ascii_digit()) {
            endpoint.ports = ports
                .split(',')
                .map(PortRange::parse)
                .collect::<FilterResult<Vec<_>>>()?;
        }
    }

    Ok(endpoint)
}
