//! Contract with the recovery-mode device transport.
//!
//! The wire protocol and the exploit payload live outside this crate. Everything
//! above this module talks to a device only through [`DeviceProbe`] (discovery and
//! handshake) and [`BlockSession`] (block I/O on an authorized session).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::emmc::block::Block;

pub mod error;
pub mod image;
pub mod memory;

pub use error::DeviceError;
pub use image::{ImageProbe, ImageSession};
pub use memory::{HandshakeReply, MemoryDisk, MemoryProbe, MemorySession};

/// Addressable storage region of the eMMC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    User,
    Boot0,
}

impl Region {
    /// Identifier sent to the device when selecting the region.
    pub fn id(self) -> u8 {
        match self {
            Region::User => 0,
            Region::Boot0 => 1,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::User => write!(f, "user"),
            Region::Boot0 => write!(f, "boot0"),
        }
    }
}

/// Finds a device and turns it into an authorized session.
pub trait DeviceProbe {
    type Handle;
    type Session: BlockSession;

    fn discover(&mut self) -> Result<Self::Handle, DeviceError>;

    /// Fails with [`DeviceError::HandshakeMismatch`] when the device is not in the
    /// receptive stage. Any other error is a hard transport failure.
    fn handshake(&mut self, handle: Self::Handle) -> Result<Self::Session, DeviceError>;
}

/// Block-level access to a device that already passed the handshake.
pub trait BlockSession {
    fn load_payload(&mut self, payload: &[u8]) -> Result<(), DeviceError>;

    fn switch_region(&mut self, region: Region) -> Result<(), DeviceError>;

    fn read_block(&mut self, index: u64) -> Result<Block, DeviceError>;

    fn write_block(&mut self, index: u64, block: &Block) -> Result<(), DeviceError>;
}
