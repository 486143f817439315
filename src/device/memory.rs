use std::collections::VecDeque;

use super::{BlockSession, DeviceError, DeviceProbe, Region};
use crate::emmc::block::{BLOCK_SIZE, Block};

/// Raw contents of both regions of an emulated eMMC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDisk {
    pub user: Vec<u8>,
    pub boot0: Vec<u8>,
}

impl MemoryDisk {
    pub fn new(user_blocks: u64, boot0_blocks: u64) -> Self {
        Self {
            user: vec![0; user_blocks as usize * BLOCK_SIZE],
            boot0: vec![0; boot0_blocks as usize * BLOCK_SIZE],
        }
    }

    pub fn region(&self, region: Region) -> &[u8] {
        match region {
            Region::User => &self.user,
            Region::Boot0 => &self.boot0,
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut Vec<u8> {
        match region {
            Region::User => &mut self.user,
            Region::Boot0 => &mut self.boot0,
        }
    }

    /// Copy `bytes` into `region` at a byte offset. Panics when out of bounds,
    /// this is a fixture helper.
    pub fn put(&mut self, region: Region, offset: usize, bytes: &[u8]) {
        self.region_mut(region)[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

/// Scripted answer of the emulated boot ROM to one handshake attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeReply {
    Accept,
    /// Device answered, but not from the expected stage (e.g. preloader).
    Mismatch,
    /// The link broke down.
    Fail,
}

/// In-memory stand-in for a device in recovery mode.
#[derive(Debug)]
pub struct MemoryProbe {
    disk: Option<MemoryDisk>,
    replies: VecDeque<HandshakeReply>,
    discoveries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryHandle {
    pub attempt: usize,
}

impl MemoryProbe {
    pub fn new(disk: MemoryDisk) -> Self {
        Self {
            disk: Some(disk),
            replies: VecDeque::new(),
            discoveries: 0,
        }
    }

    /// Handshake replies consumed in order; once exhausted every handshake is accepted.
    pub fn with_replies(mut self, replies: impl IntoIterator<Item = HandshakeReply>) -> Self {
        self.replies = replies.into_iter().collect();
        self
    }

    pub fn discoveries(&self) -> usize {
        self.discoveries
    }
}

impl DeviceProbe for MemoryProbe {
    type Handle = MemoryHandle;
    type Session = MemorySession;

    fn discover(&mut self) -> Result<MemoryHandle, DeviceError> {
        if self.disk.is_none() {
            return Err(DeviceError::NotFound);
        }
        self.discoveries += 1;
        Ok(MemoryHandle {
            attempt: self.discoveries,
        })
    }

    fn handshake(&mut self, _handle: MemoryHandle) -> Result<MemorySession, DeviceError> {
        match self.replies.pop_front().unwrap_or(HandshakeReply::Accept) {
            HandshakeReply::Accept => {
                let disk = self.disk.take().ok_or(DeviceError::NotFound)?;
                Ok(MemorySession::new(disk))
            }
            HandshakeReply::Mismatch => Err(DeviceError::HandshakeMismatch {
                expected: 0x5f,
                received: 0xa0,
            }),
            HandshakeReply::Fail => Err(DeviceError::Transport(
                "device stopped responding during handshake".to_string(),
            )),
        }
    }
}

#[derive(Debug)]
pub struct MemorySession {
    disk: MemoryDisk,
    region: Region,
    payload: Option<Vec<u8>>,
    switches: Vec<Region>,
}

impl MemorySession {
    pub fn new(disk: MemoryDisk) -> Self {
        Self {
            disk,
            region: Region::User,
            payload: None,
            switches: Vec::new(),
        }
    }

    pub fn disk(&self) -> &MemoryDisk {
        &self.disk
    }

    /// Regions selected so far, in order.
    pub fn switches(&self) -> &[Region] {
        &self.switches
    }

    fn block_range(&self, index: u64) -> Result<std::ops::Range<usize>, DeviceError> {
        if self.payload.is_none() {
            return Err(DeviceError::Transport(
                "block I/O is locked until the payload is loaded".to_string(),
            ));
        }
        let data = self.disk.region(self.region);
        let blocks = (data.len() / BLOCK_SIZE) as u64;
        if index >= blocks {
            return Err(DeviceError::OutOfRange { index, blocks });
        }
        let start = index as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockSession for MemorySession {
    fn load_payload(&mut self, payload: &[u8]) -> Result<(), DeviceError> {
        self.payload = Some(payload.to_vec());
        Ok(())
    }

    fn switch_region(&mut self, region: Region) -> Result<(), DeviceError> {
        self.region = region;
        self.switches.push(region);
        Ok(())
    }

    fn read_block(&mut self, index: u64) -> Result<Block, DeviceError> {
        let range = self.block_range(index)?;
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&self.disk.region(self.region)[range]);
        Ok(block)
    }

    fn write_block(&mut self, index: u64, block: &Block) -> Result<(), DeviceError> {
        let range = self.block_range(index)?;
        self.disk.region_mut(self.region)[range].copy_from_slice(block);
        Ok(())
    }
}
