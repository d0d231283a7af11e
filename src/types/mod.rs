pub mod identifiers;
pub mod pdr;

pub use identifiers::{SEID, TEID, PDRID, FARID};
pub use pdr::{PDR, Interface};
