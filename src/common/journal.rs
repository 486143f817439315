use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use crate::common::paths;
use crate::emmc::DumpReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Dump,
    Flash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub target: String,
    pub path: PathBuf,
    pub start_block: u64,
    pub block_count: u64,
    pub sha256: Option<String>,
}

impl TransferRecord {
    pub fn dump(target: &str, report: &DumpReport) -> Self {
        Self {
            timestamp: Utc::now(),
            direction: Direction::Dump,
            target: target.to_string(),
            path: report.path.clone(),
            start_block: report.job.start_block,
            block_count: report.job.block_count,
            sha256: Some(report.sha256.clone()),
        }
    }

    pub fn flash(target: &str, path: PathBuf, start_block: u64, block_count: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            direction: Direction::Flash,
            target: target.to_string(),
            path,
            start_block,
            block_count,
            sha256: None,
        }
    }
}

/// Append-only JSON-lines journal of finished transfers.
///
/// Nothing is written unless debug output is enabled.
#[derive(Debug, Clone)]
pub struct TransferJournal {
    path: PathBuf,
}

impl TransferJournal {
    pub fn new() -> Result<Self> {
        Ok(Self::at(paths::journal_file()?))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn record(&self, entry: &TransferRecord) -> Result<()> {
        if !crate::ui::is_debug_enabled() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            create_dir_all(parent).context("Failed to create journal directory")?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open transfer journal")?;

        let json_line =
            serde_json::to_string(entry).context("Failed to serialize transfer record")?;
        writeln!(file, "{json_line}").context("Failed to write to transfer journal")?;
        Ok(())
    }

    /// Records in the order they were written.
    pub fn entries(&self) -> Result<Vec<TransferRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            std::fs::read_to_string(&self.path).context("Failed to read transfer journal")?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse journal entry"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emmc::TransferJob;
    use serial_test::serial;

    fn report() -> DumpReport {
        DumpReport {
            path: PathBuf::from("boot_a.img"),
            job: TransferJob::new(0x800, 0x200),
            bytes: 0x200 * 512,
            sha256: "ab".repeat(32),
        }
    }

    #[test]
    #[serial]
    fn test_journal_only_written_in_debug_mode() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TransferJournal::at(dir.path().join("logs").join("transfers.jsonl"));

        crate::ui::set_debug_mode(false);
        journal.record(&TransferRecord::dump("boot_a", &report())).unwrap();
        assert!(!journal.path().exists());

        crate::ui::set_debug_mode(true);
        journal.record(&TransferRecord::dump("boot_a", &report())).unwrap();
        journal
            .record(&TransferRecord::flash("misc", PathBuf::from("misc.bin"), 0x20, 1))
            .unwrap();
        crate::ui::set_debug_mode(false);

        let entries = journal.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].direction, Direction::Dump);
        assert_eq!(entries[0].start_block, 0x800);
        assert_eq!(entries[0].sha256.as_deref(), Some("ab".repeat(32).as_str()));
        assert_eq!(entries[1].direction, Direction::Flash);
        assert_eq!(entries[1].target, "misc");
    }
}
