use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No device found")]
    NotFound,

    #[error("Wrong handshake response: expected {expected:#04x}, received {received:#04x}")]
    HandshakeMismatch { expected: u8, received: u8 },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Block {index} is outside the selected region ({blocks} blocks)")]
    OutOfRange { index: u64, blocks: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    pub fn is_handshake_mismatch(&self) -> bool {
        matches!(self, DeviceError::HandshakeMismatch { .. })
    }
}
