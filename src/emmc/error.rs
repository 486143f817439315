use thiserror::Error;

use crate::device::{DeviceError, Region};

#[derive(Error, Debug)]
pub enum EmmcError {
    #[error("Device error: {0}")]
    Transport(#[from] DeviceError),

    #[error("Handshake did not succeed after {attempts} attempts")]
    HandshakeExhausted { attempts: u32 },

    #[error("Malformed partition table: {0}")]
    Format(String),

    #[error("Data too big to flash: {size} bytes exceeds limit of {max} bytes")]
    Capacity { size: u64, max: u64 },

    #[error("Partition '{0}' not found")]
    PartitionNotFound(String),

    #[error("Partition table is stale: the storage region was switched after it was decoded")]
    StaleTable,

    #[error("Operation requires the {expected} region but {actual} is selected")]
    WrongRegion { expected: Region, actual: String },

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmmcError {
    /// Errors after which the run can still reach its terminal state.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EmmcError::PartitionNotFound(_))
    }
}
