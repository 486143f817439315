//! Partition table decoding.
//!
//! The table is read from four fixed sectors of the user area (byte offsets
//! 0x400..0xC00) and holds up to sixteen 128-byte records:
//!
//! | offset | size | field                               |
//! |--------|------|-------------------------------------|
//! | 0x20   | 8    | first block, little endian          |
//! | 0x28   | 8    | last block (inclusive), little end. |
//! | 0x38   | 72   | name, UTF-16LE, NUL padded          |

use serde::Serialize;

use crate::device::{BlockSession, Region};
use crate::emmc::block::{BLOCK_SIZE, TransferJob, blocks_to_bytes};
use crate::emmc::error::EmmcError;
use crate::emmc::session::EmmcSession;

pub const ENTRY_SIZE: usize = 0x80;
pub const MAX_ENTRIES: usize = 16;

/// Byte offsets of the sectors holding the entry array.
pub const TABLE_OFFSETS: [u64; 4] = [0x400, 0x600, 0x800, 0xA00];

const START_OFFSET: usize = 0x20;
const END_OFFSET: usize = 0x28;
const NAME_OFFSET: usize = 0x38;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionEntry {
    pub name: String,
    pub start_block: u64,
    pub block_count: u64,
}

impl PartitionEntry {
    pub fn end_block(&self) -> u64 {
        self.start_block + self.block_count - 1
    }

    pub fn byte_len(&self) -> u64 {
        blocks_to_bytes(self.block_count)
    }

    pub fn job(&self) -> TransferJob {
        TransferJob::new(self.start_block, self.block_count)
    }
}

/// Decoded partitions in on-disk order, looked up by name.
///
/// Only valid for the region generation it was decoded under; see
/// [`EmmcSession::ensure_current`].
#[derive(Debug, Clone, Serialize)]
pub struct PartitionTable {
    entries: Vec<PartitionEntry>,
    #[serde(skip)]
    generation: u64,
}

impl PartitionTable {
    pub fn new(entries: Vec<PartitionEntry>, generation: u64) -> Self {
        Self {
            entries,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<&PartitionEntry, EmmcError> {
        self.get(name)
            .ok_or_else(|| EmmcError::PartitionNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names from `required` that are absent from the table.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .filter(|name| !self.contains(name))
            .collect()
    }
}

/// Read and decode the partition table. The user region must be selected.
pub fn decode<S: BlockSession>(session: &mut EmmcSession<S>) -> Result<PartitionTable, EmmcError> {
    session.require_region(Region::User)?;

    let mut raw = Vec::with_capacity(TABLE_OFFSETS.len() * BLOCK_SIZE);
    for offset in TABLE_OFFSETS {
        let block = session.read_block(offset / BLOCK_SIZE as u64)?;
        raw.extend_from_slice(&block);
    }

    let entries = decode_entries(&raw)?;
    Ok(PartitionTable::new(entries, session.generation()))
}

/// Decode a raw entry array. Records with an empty name are unused and skipped;
/// a repeated name replaces the earlier record in place.
pub fn decode_entries(raw: &[u8]) -> Result<Vec<PartitionEntry>, EmmcError> {
    if raw.len() % ENTRY_SIZE != 0 {
        return Err(EmmcError::Format(format!(
            "entry array of {} bytes is not a multiple of {ENTRY_SIZE}",
            raw.len()
        )));
    }
    let count = raw.len() / ENTRY_SIZE;
    if count > MAX_ENTRIES {
        return Err(EmmcError::Format(format!(
            "{count} records exceed the maximum of {MAX_ENTRIES}"
        )));
    }

    let mut entries: Vec<PartitionEntry> = Vec::with_capacity(count);
    for (index, record) in raw.chunks_exact(ENTRY_SIZE).enumerate() {
        let Some(entry) = decode_record(index, record)? else {
            continue;
        };
        match entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
    Ok(entries)
}

fn decode_record(index: usize, record: &[u8]) -> Result<Option<PartitionEntry>, EmmcError> {
    let name = decode_name(&record[NAME_OFFSET..]).map_err(|e| {
        EmmcError::Format(format!("record {index}: name is not valid UTF-16: {e}"))
    })?;
    if name.is_empty() {
        return Ok(None);
    }

    let start_block = read_u64_le(record, START_OFFSET);
    let end_block = read_u64_le(record, END_OFFSET);
    if end_block < start_block {
        return Err(EmmcError::Format(format!(
            "partition '{name}' ends at block {end_block:#x} before it starts at {start_block:#x}"
        )));
    }

    // the byte just past the partition must still be addressable
    let addressable = end_block
        .checked_add(1)
        .and_then(|past_end| past_end.checked_mul(BLOCK_SIZE as u64))
        .is_some();
    if !addressable {
        return Err(EmmcError::Format(format!(
            "partition '{name}' ends at block {end_block:#x}, beyond the addressable range"
        )));
    }

    Ok(Some(PartitionEntry {
        name,
        start_block,
        block_count: end_block - start_block + 1,
    }))
}

fn read_u64_le(record: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&record[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn decode_name(raw: &[u8]) -> Result<String, std::string::FromUtf16Error> {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let name = String::from_utf16(&units)?;
    Ok(name.trim_end_matches('\0').to_string())
}

/// Build a raw 128-byte record. Used by fixtures and tests.
pub fn encode_record(name: &str, start_block: u64, end_block: u64) -> [u8; ENTRY_SIZE] {
    let mut record = [0u8; ENTRY_SIZE];
    record[START_OFFSET..START_OFFSET + 8].copy_from_slice(&start_block.to_le_bytes());
    record[END_OFFSET..END_OFFSET + 8].copy_from_slice(&end_block.to_le_bytes());
    for (i, unit) in name.encode_utf16().take((ENTRY_SIZE - NAME_OFFSET) / 2).enumerate() {
        let at = NAME_OFFSET + i * 2;
        record[at..at + 2].copy_from_slice(&unit.to_le_bytes());
    }
    record
}
