//! Block geometry and the unit conversions between blocks and bytes.
//!
//! Everything inside the transfer engine counts in blocks. Byte lengths only
//! appear at the edges (files, capacity limits) and are converted here.

use serde::Serialize;
use std::ops::Range;

pub const BLOCK_SIZE: usize = 0x200;

pub type Block = [u8; BLOCK_SIZE];

/// Saturates at `u64::MAX`.
pub fn blocks_to_bytes(blocks: u64) -> u64 {
    blocks.saturating_mul(BLOCK_SIZE as u64)
}

/// Number of blocks needed to hold `bytes`, rounded up.
pub fn bytes_to_blocks(bytes: u64) -> u64 {
    bytes.div_ceil(BLOCK_SIZE as u64)
}

/// Smallest multiple of the block size that is >= `len`.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Extend `data` with zero bytes up to the next block boundary.
pub fn pad_to_block(data: &mut Vec<u8>) {
    data.resize(padded_len(data.len()), 0);
}

/// A contiguous run of blocks to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferJob {
    pub start_block: u64,
    pub block_count: u64,
}

impl TransferJob {
    pub fn new(start_block: u64, block_count: u64) -> Self {
        Self {
            start_block,
            block_count,
        }
    }

    /// Job covering `byte_len` bytes, rounded up to whole blocks.
    pub fn from_byte_len(start_block: u64, byte_len: u64) -> Self {
        Self::new(start_block, bytes_to_blocks(byte_len))
    }

    pub fn byte_len(&self) -> u64 {
        blocks_to_bytes(self.block_count)
    }

    /// Block indices of the job, clipped at the end of the address space.
    pub fn blocks(&self) -> Range<u64> {
        self.start_block..self.start_block.saturating_add(self.block_count)
    }
}
