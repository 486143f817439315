//! Device emulated by raw region images in a directory.
//!
//! The directory holds `user.img` (user area) and `boot0.bin` (boot area). Both are
//! opened read-write during the handshake and accessed block by block afterwards.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{BlockSession, DeviceError, DeviceProbe, Region};
use crate::emmc::block::{BLOCK_SIZE, Block};

pub const USER_IMAGE: &str = "user.img";
pub const BOOT0_IMAGE: &str = "boot0.bin";

#[derive(Debug, Clone)]
pub struct ImageProbe {
    dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ImageHandle {
    user: PathBuf,
    boot0: PathBuf,
}

impl ImageProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeviceProbe for ImageProbe {
    type Handle = ImageHandle;
    type Session = ImageSession;

    fn discover(&mut self) -> Result<ImageHandle, DeviceError> {
        let user = self.dir.join(USER_IMAGE);
        let boot0 = self.dir.join(BOOT0_IMAGE);
        if !user.is_file() || !boot0.is_file() {
            return Err(DeviceError::NotFound);
        }
        Ok(ImageHandle { user, boot0 })
    }

    fn handshake(&mut self, handle: ImageHandle) -> Result<ImageSession, DeviceError> {
        let open = |path: &Path| OpenOptions::new().read(true).write(true).open(path);
        Ok(ImageSession {
            user: open(&handle.user)?,
            boot0: open(&handle.boot0)?,
            region: Region::User,
            payload_loaded: false,
        })
    }
}

#[derive(Debug)]
pub struct ImageSession {
    user: File,
    boot0: File,
    region: Region,
    payload_loaded: bool,
}

impl ImageSession {
    fn seek_block(&mut self, index: u64) -> Result<&mut File, DeviceError> {
        if !self.payload_loaded {
            return Err(DeviceError::Transport(
                "block I/O is locked until the payload is loaded".to_string(),
            ));
        }
        let file = match self.region {
            Region::User => &mut self.user,
            Region::Boot0 => &mut self.boot0,
        };
        let blocks = file.metadata()?.len() / BLOCK_SIZE as u64;
        if index >= blocks {
            return Err(DeviceError::OutOfRange { index, blocks });
        }
        file.seek(SeekFrom::Start(index * BLOCK_SIZE as u64))?;
        Ok(file)
    }
}

impl BlockSession for ImageSession {
    fn load_payload(&mut self, payload: &[u8]) -> Result<(), DeviceError> {
        if payload.is_empty() {
            return Err(DeviceError::Transport("payload is empty".to_string()));
        }
        self.payload_loaded = true;
        Ok(())
    }

    fn switch_region(&mut self, region: Region) -> Result<(), DeviceError> {
        self.region = region;
        Ok(())
    }

    fn read_block(&mut self, index: u64) -> Result<Block, DeviceError> {
        let file = self.seek_block(index)?;
        let mut block = [0u8; BLOCK_SIZE];
        file.read_exact(&mut block)?;
        Ok(block)
    }

    fn write_block(&mut self, index: u64, block: &Block) -> Result<(), DeviceError> {
        let file = self.seek_block(index)?;
        file.write_all(block)?;
        Ok(())
    }
}
