//! Sequential block copy between the device and local files.
//!
//! One block per device call, no retries, no rollback: the first failing read
//! or write aborts the job and whatever was already written stays written.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::device::BlockSession;
use crate::emmc::block::{BLOCK_SIZE, Block, TransferJob, pad_to_block};
use crate::emmc::error::EmmcError;
use crate::emmc::progress::{Cadence, ProgressObserver};
use crate::emmc::session::EmmcSession;

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 40;

/// Result of writing a device range to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpReport {
    pub path: PathBuf,
    pub job: TransferJob,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockTransferEngine {
    progress_interval: u64,
}

impl Default for BlockTransferEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl BlockTransferEngine {
    /// `progress_interval` is the number of blocks between progress samples.
    pub fn new(progress_interval: u64) -> Self {
        Self {
            progress_interval: progress_interval.max(1),
        }
    }

    /// Copy `job` from the device into `sink`, block by block. Returns bytes written.
    pub fn dump<S: BlockSession, W: Write>(
        &self,
        session: &mut EmmcSession<S>,
        sink: &mut W,
        job: TransferJob,
        observer: &mut dyn ProgressObserver,
    ) -> Result<u64, EmmcError> {
        let cadence = Cadence::new(self.progress_interval, job.block_count);
        for (done, index) in job.blocks().enumerate() {
            let block = session.read_block(index)?;
            sink.write_all(&block)?;
            if let Some(sample) = cadence.sample(done as u64 + 1) {
                observer.on_progress(sample);
            }
        }
        sink.flush()?;
        Ok(job.byte_len())
    }

    /// Dump `job` into a new file at `path` and report its SHA-256.
    pub fn dump_to_file<S: BlockSession>(
        &self,
        session: &mut EmmcSession<S>,
        path: &Path,
        job: TransferJob,
        observer: &mut dyn ProgressObserver,
    ) -> Result<DumpReport, EmmcError> {
        let file = File::create(path)?;
        let mut sink = HashingWriter::new(BufWriter::new(file));
        let bytes = self.dump(session, &mut sink, job, observer)?;
        Ok(DumpReport {
            path: path.to_path_buf(),
            job,
            bytes,
            sha256: sink.hex_digest(),
        })
    }

    /// Read all of `source` and write it starting at `start_block`.
    ///
    /// `max_size_bytes` of 0 means no limit. Returns the number of blocks written.
    pub fn flash<S: BlockSession, R: Read>(
        &self,
        session: &mut EmmcSession<S>,
        source: &mut R,
        start_block: u64,
        max_size_bytes: u64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<u64, EmmcError> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        self.flash_bytes(session, data, start_block, max_size_bytes, observer)
    }

    pub fn flash_file<S: BlockSession>(
        &self,
        session: &mut EmmcSession<S>,
        path: &Path,
        start_block: u64,
        max_size_bytes: u64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<u64, EmmcError> {
        let mut file = File::open(path)?;
        self.flash(session, &mut file, start_block, max_size_bytes, observer)
    }

    /// Zero-pad `data` to a block boundary, check it against the limit, then write it.
    /// Nothing touches the device when the padded data is over the limit.
    pub fn flash_bytes<S: BlockSession>(
        &self,
        session: &mut EmmcSession<S>,
        mut data: Vec<u8>,
        start_block: u64,
        max_size_bytes: u64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<u64, EmmcError> {
        pad_to_block(&mut data);
        let size = data.len() as u64;
        if max_size_bytes > 0 && size > max_size_bytes {
            return Err(EmmcError::Capacity {
                size,
                max: max_size_bytes,
            });
        }

        let job = TransferJob::from_byte_len(start_block, size);
        let cadence = Cadence::new(self.progress_interval, job.block_count);
        let mut block: Block = [0u8; BLOCK_SIZE];
        for (done, (index, chunk)) in job.blocks().zip(data.chunks_exact(BLOCK_SIZE)).enumerate() {
            block.copy_from_slice(chunk);
            session.write_block(index, &block)?;
            if let Some(sample) = cadence.sample(done as u64 + 1) {
                observer.on_progress(sample);
            }
        }
        Ok(job.block_count)
    }
}

struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn hex_digest(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
