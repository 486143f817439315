use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use emmctool::emmc::BLOCK_SIZE;
use emmctool::emmc::gpt::{ENTRY_SIZE, TABLE_OFFSETS, encode_record};

pub const USER_BLOCKS: usize = 0x40;
pub const BOOT0_BLOCKS: usize = 16;

/// (name, first block, last block)
pub const DEFAULT_TABLE: &[(&str, u64, u64)] = &[
    ("lk_a", 0x10, 0x13),
    ("tee1", 0x14, 0x17),
    ("boot_a", 0x18, 0x1f),
    ("misc", 0x20, 0x20),
    ("system_a", 0x21, 0x30),
    ("userdata", 0x31, 0x3f),
];

/// Byte expected at `offset` of the user area outside the table sectors.
pub fn pattern(offset: usize) -> u8 {
    (offset % 251) as u8
}

/// Scratch layout for one test: an image-backed device, a payload, a config
/// path and an output directory, plus isolated config/data homes.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp_dir: tempfile::tempdir()?,
        };
        fs::create_dir_all(env.device_dir())?;
        fs::write(env.payload_path(), b"\x7fpayload")?;
        env.write_device(DEFAULT_TABLE)?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn device_dir(&self) -> PathBuf {
        self.path().join("device")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    pub fn payload_path(&self) -> PathBuf {
        self.path().join("payload.bin")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("emmctool.toml")
    }

    pub fn config_home(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn data_home(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Replace the device images with a user area carrying `records`.
    pub fn write_device(&self, records: &[(&str, u64, u64)]) -> Result<()> {
        let mut user: Vec<u8> = (0..USER_BLOCKS * BLOCK_SIZE).map(pattern).collect();
        let table_start = TABLE_OFFSETS[0] as usize;
        let table_end = TABLE_OFFSETS[TABLE_OFFSETS.len() - 1] as usize + BLOCK_SIZE;
        user[table_start..table_end].fill(0);
        for (i, (name, start, end)) in records.iter().enumerate() {
            let at = table_start + i * ENTRY_SIZE;
            user[at..at + ENTRY_SIZE].copy_from_slice(&encode_record(name, *start, *end));
        }
        user[510] = 0x55;
        user[511] = 0xAA;

        let mut boot0 = vec![0u8; BOOT0_BLOCKS * BLOCK_SIZE];
        boot0[..9].copy_from_slice(b"EMMC_BOOT");

        fs::write(self.device_dir().join("user.img"), user)?;
        fs::write(self.device_dir().join("boot0.bin"), boot0)?;
        Ok(())
    }

    pub fn user_image(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.device_dir().join("user.img"))?)
    }
}
