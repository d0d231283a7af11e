pub mod assembler;
pub mod resolver;

pub use assembler::{assemble_pdr, AssembledPdr};
pub use resolver::{resolve_pdi, ResolvedPdi};

use crate::ipfilter::FilterError;
use crate::pfcp::ie::{IeError, SourceInterface};
use crate::pfcp::types::CauseValue;
use crate::types::identifiers::{PDRID, TEID};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdrError {
    #[error("PDR {pdr_id}: bad filter description {description:?}: {source}")]
    BadFilterDescription {
        pdr_id: PDRID,
        description: String,
        #[source]
        source: FilterError,
    },
}

impl PdrError {
    pub fn cause(&self) -> CauseValue {
        match self {
            PdrError::BadFilterDescription { .. } => CauseValue::RuleCreationModificationFailure,
        }
    }
}

#[derive(Debug, Error)]
#[error("bad filter description {description:?}: {source}")]
pub struct BadFilterDescription {
    pub description: String,
    #[source]
    pub source: FilterError,
}

/// Something skipped while building a PDR. Already logged when recorded.
#[derive(Debug, Error)]
pub enum PdrWarning {
    #[error("PDI member of type {ie_type} could not be decoded: {source}")]
    UndecodableElement {
        ie_type: u16,
        #[source]
        source: IeError,
    },
    #[error("UE IP address carries no IPv4 address")]
    NoIpv4UeAddress,
    #[error("F-TEID {0} carries no IPv4 address")]
    NoIpv4TunnelAddress(TEID),
    #[error("source interface {0:?} not supported")]
    UnsupportedSourceInterface(SourceInterface),
    #[error("application {0} not found")]
    UnknownApplication(String),
    #[error("application {0} ignored, SDF filter takes precedence")]
    ApplicationOverridden(String),
    #[error("empty SDF filter description")]
    EmptySdfFilter,
    #[error("could not read PDR ID: {0}")]
    PdrId(#[source] IeError),
    #[error("could not read precedence: {0}")]
    Precedence(#[source] IeError),
    #[error("could not read PDI: {0}")]
    Pdi(#[source] IeError),
    #[error("could not read FAR ID: {0}")]
    FarId(#[source] IeError),
}

impl PdrWarning {
    /// Cause for a PDR abandoned on this warning. None if it does not stop the PDR.
    pub fn cause(&self) -> Option<CauseValue> {
        match self {
            PdrWarning::PdrId(e)
            | PdrWarning::Precedence(e)
            | PdrWarning::Pdi(e)
            | PdrWarning::FarId(e) => Some(match e {
                IeError::MissingIe(_) => CauseValue::MandatoryIeMissing,
                _ => CauseValue::MandatoryIeIncorrect,
            }),
            _ => None,
        }
    }
}
