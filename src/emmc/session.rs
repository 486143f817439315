use crate::device::{BlockSession, Region};
use crate::emmc::block::Block;
use crate::emmc::error::EmmcError;

/// Authorized device session plus the bookkeeping needed to keep partition
/// tables honest.
///
/// Every region switch bumps `generation`. A [`PartitionTable`] remembers the
/// generation it was decoded under and is rejected once the region has moved.
///
/// [`PartitionTable`]: crate::emmc::gpt::PartitionTable
#[derive(Debug)]
pub struct EmmcSession<S> {
    inner: S,
    region: Option<Region>,
    generation: u64,
}

impl<S: BlockSession> EmmcSession<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            region: None,
            generation: 0,
        }
    }

    pub fn load_payload(&mut self, payload: &[u8]) -> Result<(), EmmcError> {
        Ok(self.inner.load_payload(payload)?)
    }

    pub fn select_region(&mut self, region: Region) -> Result<(), EmmcError> {
        self.inner.switch_region(region)?;
        self.region = Some(region);
        self.generation += 1;
        Ok(())
    }

    /// Region chosen by the last successful switch, if any.
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn require_region(&self, expected: Region) -> Result<(), EmmcError> {
        match self.region {
            Some(region) if region == expected => Ok(()),
            other => Err(EmmcError::WrongRegion {
                expected,
                actual: other.map_or_else(|| "no region".to_string(), |r| r.to_string()),
            }),
        }
    }

    pub fn ensure_current(&self, table_generation: u64) -> Result<(), EmmcError> {
        if table_generation != self.generation || self.region != Some(Region::User) {
            return Err(EmmcError::StaleTable);
        }
        Ok(())
    }

    pub fn read_block(&mut self, index: u64) -> Result<Block, EmmcError> {
        Ok(self.inner.read_block(index)?)
    }

    pub fn write_block(&mut self, index: u64, block: &Block) -> Result<(), EmmcError> {
        Ok(self.inner.write_block(index, block)?)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}
