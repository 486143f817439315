//! End-to-end extraction flow.
//!
//! ```text
//! Disconnected -> Handshaking -> PayloadLoaded -> ModeUser -> GptParsed
//!     -> AwaitingSelection -> Transferring -> Done
//! ```
//!
//! Operator interaction goes through the [`Operator`] trait so the sequencing can
//! run against a terminal, a GUI worker, or a script.

use serde::Serialize;
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::device::{BlockSession, DeviceProbe};
use crate::emmc::block::TransferJob;
use crate::emmc::connect::{ConnectionEstablisher, RetryPolicy};
use crate::emmc::error::EmmcError;
use crate::emmc::gpt::{self, PartitionTable};
use crate::emmc::mode;
use crate::emmc::progress::ProgressObserver;
use crate::emmc::session::EmmcSession;
use crate::emmc::transfer::{BlockTransferEngine, DEFAULT_PROGRESS_INTERVAL, DumpReport};
use crate::ui::prelude::*;

const LONG_DUMP_WARNING: &str = "Warning: this process can take a LONG time. \
     Leaving it running overnight is recommended. Proceed?";

pub const BOOT0_IMAGE_NAME: &str = "boot0.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Handshaking,
    PayloadLoaded,
    ModeUser,
    GptParsed,
    AwaitingSelection,
    Transferring,
    Done,
}

/// What the operator asked to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    System,
    Userdata,
    Custom(String),
}

impl Selection {
    pub fn partition_name<'a>(&'a self, config: &'a OrchestratorConfig) -> &'a str {
        match self {
            Selection::System => &config.system_partition,
            Selection::Userdata => &config.userdata_partition,
            Selection::Custom(name) => name,
        }
    }

    /// File name of the extracted image.
    pub fn image_name(&self) -> String {
        match self {
            Selection::System => "system.img".to_string(),
            Selection::Userdata => "userdata.img".to_string(),
            Selection::Custom(name) => format!("{}.img", name.replace(['/', '\\'], "_")),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::System => write!(f, "system"),
            Selection::Userdata => write!(f, "userdata"),
            Selection::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

impl FromStr for Selection {
    type Err = EmmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err(EmmcError::Prompt("empty selection".to_string())),
            "1" | "system" => Ok(Selection::System),
            "2" | "userdata" => Ok(Selection::Userdata),
            _ => {
                let name = s.strip_prefix("custom:").unwrap_or(s).trim();
                if name.is_empty() {
                    return Err(EmmcError::Prompt("empty partition name".to_string()));
                }
                Ok(Selection::Custom(name.to_string()))
            }
        }
    }
}

/// Request/response boundary to whoever drives the session.
pub trait Operator {
    /// Ask the operator to acknowledge `message`. `false` means declined.
    fn confirm(&mut self, message: &str) -> Result<bool, EmmcError>;

    /// Pick what to extract from the decoded table.
    fn select(&mut self, table: &PartitionTable) -> Result<Selection, EmmcError>;
}

/// Operator with pre-recorded answers.
///
/// Confirmations are consumed in order; once they run out every confirmation
/// is answered with yes.
#[derive(Debug, Clone)]
pub struct ScriptedOperator {
    confirmations: VecDeque<bool>,
    selection: Option<Selection>,
    prompts: Vec<String>,
}

impl ScriptedOperator {
    pub fn new(selection: Option<Selection>) -> Self {
        Self {
            confirmations: VecDeque::new(),
            selection,
            prompts: Vec::new(),
        }
    }

    pub fn with_confirmations(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirmations = answers.into_iter().collect();
        self
    }

    /// Every confirmation message seen so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&mut self, message: &str) -> Result<bool, EmmcError> {
        self.prompts.push(message.to_string());
        Ok(self.confirmations.pop_front().unwrap_or(true))
    }

    fn select(&mut self, _table: &PartitionTable) -> Result<Selection, EmmcError> {
        self.selection
            .clone()
            .ok_or_else(|| EmmcError::Prompt("no selection scripted".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub payload: Vec<u8>,
    pub output_dir: PathBuf,
    pub required_partitions: Vec<String>,
    pub system_partition: String,
    pub userdata_partition: String,
    pub retry: RetryPolicy,
    pub progress_interval: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            payload: Vec::new(),
            output_dir: PathBuf::from("."),
            required_partitions: ["lk_a", "tee1", "boot_a", "misc"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            system_partition: "system_a".to_string(),
            userdata_partition: "userdata".to_string(),
            retry: RetryPolicy::unbounded(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Dumped {
        partition: String,
        report: DumpReport,
    },
    PartitionNotFound { name: String },
    Declined,
}

pub struct SessionOrchestrator<'o, O: Operator> {
    config: OrchestratorConfig,
    operator: &'o mut O,
    engine: BlockTransferEngine,
    state: SessionState,
    history: Vec<SessionState>,
}

impl<'o, O: Operator> SessionOrchestrator<'o, O> {
    pub fn new(config: OrchestratorConfig, operator: &'o mut O) -> Self {
        let engine = BlockTransferEngine::new(config.progress_interval);
        Self {
            config,
            operator,
            engine,
            state: SessionState::Disconnected,
            history: vec![SessionState::Disconnected],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, starting with `Disconnected`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn advance(&mut self, next: SessionState) {
        emit(
            Level::Debug,
            "session.state",
            &format!("{:?} -> {:?}", self.state, next),
            None,
        );
        self.state = next;
        self.history.push(next);
    }

    /// Full interactive flow: connect, decode, ask, extract.
    pub fn run<P: DeviceProbe>(
        &mut self,
        probe: &mut P,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Outcome, EmmcError> {
        let mut session = self.connect(probe)?;
        self.run_session(&mut session, observer)
    }

    /// Everything after [`connect`](Self::connect): decode, ask, extract.
    pub fn run_session<S: BlockSession>(
        &mut self,
        session: &mut EmmcSession<S>,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Outcome, EmmcError> {
        let Some(table) = self.read_partition_table(session)? else {
            self.advance(SessionState::Done);
            return Ok(Outcome::Declined);
        };

        self.advance(SessionState::AwaitingSelection);
        let selection = self.operator.select(&table)?;
        self.extract(session, &table, &selection, observer)
    }

    /// Establish the session and load the payload that unlocks block I/O.
    pub fn connect<P: DeviceProbe>(
        &mut self,
        probe: &mut P,
    ) -> Result<EmmcSession<P::Session>, EmmcError> {
        self.advance(SessionState::Handshaking);
        let establisher = ConnectionEstablisher::new(self.config.retry);
        let mut session = EmmcSession::new(establisher.establish(probe)?);

        emit(
            Level::Info,
            "payload.load",
            &format!(
                "{} Loading payload ({} bytes)",
                char::from(NerdFont::Key),
                self.config.payload.len()
            ),
            None,
        );
        session.load_payload(&self.config.payload)?;
        self.advance(SessionState::PayloadLoaded);
        Ok(session)
    }

    /// Switch to the user area and decode the table.
    ///
    /// Returns `None` when required partitions are missing and the operator
    /// declines to continue.
    pub fn read_partition_table<S: BlockSession>(
        &mut self,
        session: &mut EmmcSession<S>,
    ) -> Result<Option<PartitionTable>, EmmcError> {
        emit(
            Level::Info,
            "gpt.check",
            &format!("{} Check GPT", char::from(NerdFont::HardDrive)),
            None,
        );
        mode::switch_to_user(session)?;
        self.advance(SessionState::ModeUser);

        let table = gpt::decode(session)?;
        self.advance(SessionState::GptParsed);
        report_table(&table);

        let missing = table.missing(&self.config.required_partitions);
        if !missing.is_empty() {
            emit(
                Level::Warn,
                "gpt.suspicious",
                &format!(
                    "{} Expected partitions missing: {}",
                    char::from(NerdFont::Warning),
                    missing.join(", ")
                ),
                Some(json!({ "missing": missing })),
            );
            let proceed = self.operator.confirm(
                "There may be an issue with your partition table. If the partitions shown \
                 above have readable names, it is safe to continue. Proceed?",
            )?;
            if !proceed {
                return Ok(None);
            }
        }
        Ok(Some(table))
    }

    /// Dump the selected partition to `<output_dir>/<image name>`.
    ///
    /// An unknown partition name is reported and ends the run normally with
    /// [`Outcome::PartitionNotFound`].
    pub fn extract<S: BlockSession>(
        &mut self,
        session: &mut EmmcSession<S>,
        table: &PartitionTable,
        selection: &Selection,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Outcome, EmmcError> {
        session.ensure_current(table.generation())?;

        let name = selection.partition_name(&self.config).to_string();
        let entry = match table.lookup(&name) {
            Ok(entry) => entry.clone(),
            Err(err) if err.is_recoverable() => {
                let available: Vec<&str> = table.names().collect();
                emit(
                    Level::Error,
                    "partition.not_found",
                    &format!(
                        "{} Sorry, partition '{}' does not exist. Please check that its name \
                         is spelt correctly. Available: {}",
                        char::from(NerdFont::Cross),
                        name,
                        available.join(", ")
                    ),
                    Some(json!({ "name": name, "available": available })),
                );
                self.advance(SessionState::Done);
                return Ok(Outcome::PartitionNotFound { name });
            }
            Err(err) => return Err(err),
        };

        if !self.operator.confirm(LONG_DUMP_WARNING)? {
            self.advance(SessionState::Done);
            return Ok(Outcome::Declined);
        }

        let path = self.config.output_dir.join(selection.image_name());
        let status = format!(
            "Writing contents of {} to {}...",
            entry.name,
            path.display()
        );
        emit(
            Level::Info,
            "dump.start",
            &format!("{} {}", char::from(NerdFont::Download), status),
            Some(json!({ "partition": entry, "path": path })),
        );
        observer.on_status(&status);

        self.advance(SessionState::Transferring);
        let report = self
            .engine
            .dump_to_file(session, &path, entry.job(), observer)?;
        report_dump(&report);

        self.advance(SessionState::Done);
        Ok(Outcome::Dumped {
            partition: entry.name,
            report,
        })
    }

    /// Dump the first `blocks` blocks of the boot region to `<output_dir>/boot0.bin`.
    ///
    /// Leaves the boot region selected, so any partition table decoded before is stale.
    pub fn extract_boot0<S: BlockSession>(
        &mut self,
        session: &mut EmmcSession<S>,
        blocks: u64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<DumpReport, EmmcError> {
        mode::switch_to_boot0(session)?;
        let path = self.config.output_dir.join(BOOT0_IMAGE_NAME);
        observer.on_status(&format!("Writing boot0 to {}...", path.display()));

        self.advance(SessionState::Transferring);
        let report = self
            .engine
            .dump_to_file(session, &path, TransferJob::new(0, blocks), observer)?;
        report_dump(&report);
        self.advance(SessionState::Done);
        Ok(report)
    }

    /// Write `image` over the partition `name`, refusing images larger than it.
    pub fn provision<S: BlockSession>(
        &mut self,
        session: &mut EmmcSession<S>,
        table: &PartitionTable,
        name: &str,
        image: &Path,
        observer: &mut dyn ProgressObserver,
    ) -> Result<u64, EmmcError> {
        session.ensure_current(table.generation())?;
        let entry = table.lookup(name)?.clone();

        let status = format!("Writing {} to partition {}...", image.display(), entry.name);
        emit(
            Level::Info,
            "flash.start",
            &format!("{} {}", char::from(NerdFont::Upload), status),
            Some(json!({ "partition": entry, "path": image })),
        );
        observer.on_status(&status);

        self.advance(SessionState::Transferring);
        let blocks = self.engine.flash_file(
            session,
            image,
            entry.start_block,
            entry.byte_len(),
            observer,
        )?;
        emit(
            Level::Success,
            "flash.complete",
            &format!(
                "{} Wrote {} blocks to {}",
                char::from(NerdFont::Check),
                blocks,
                entry.name
            ),
            Some(json!({ "blocks": blocks })),
        );
        self.advance(SessionState::Done);
        Ok(blocks)
    }
}

fn report_table(table: &PartitionTable) {
    let listing: Vec<String> = table
        .entries()
        .iter()
        .map(|e| format!("{} ({:#x} +{:#x})", e.name, e.start_block, e.block_count))
        .collect();
    emit(
        Level::Info,
        "gpt.partitions",
        &format!(
            "{} Partitions: {}",
            char::from(NerdFont::Table),
            listing.join(", ")
        ),
        serde_json::to_value(table).ok(),
    );
}

fn report_dump(report: &DumpReport) {
    emit(
        Level::Success,
        "dump.complete",
        &format!(
            "{} Partition dump complete! {} bytes, sha256 {}",
            char::from(NerdFont::Check),
            report.bytes,
            report.sha256
        ),
        serde_json::to_value(report).ok(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceError, HandshakeReply, MemoryDisk, MemoryProbe, Region};
    use crate::emmc::gpt::{ENTRY_SIZE, TABLE_OFFSETS, encode_record};
    use crate::emmc::progress::{ChannelObserver, NoProgress, TransferEvent};
    use std::sync::mpsc;
    use std::thread;

    fn disk_with(records: &[(&str, u64, u64)]) -> MemoryDisk {
        let mut disk = MemoryDisk::new(0x40, 8);
        disk.put(Region::User, 510, &[0x55, 0xAA]);
        disk.put(Region::Boot0, 0, b"EMMC_BOOT");
        for (i, (name, start, end)) in records.iter().enumerate() {
            let at = TABLE_OFFSETS[0] as usize + i * ENTRY_SIZE;
            disk.put(Region::User, at, &encode_record(name, *start, *end));
        }
        for (i, byte) in disk.user.iter_mut().enumerate().skip(0x20 * 512) {
            *byte = (i % 13) as u8;
        }
        disk
    }

    fn full_table() -> MemoryDisk {
        disk_with(&[
            ("lk_a", 0x10, 0x13),
            ("tee1", 0x14, 0x17),
            ("boot_a", 0x18, 0x1f),
            ("misc", 0x20, 0x20),
            ("system_a", 0x21, 0x30),
            ("userdata", 0x31, 0x3f),
        ])
    }

    fn config(dir: &Path) -> OrchestratorConfig {
        OrchestratorConfig {
            payload: b"payload".to_vec(),
            output_dir: dir.to_path_buf(),
            progress_interval: 4,
            ..OrchestratorConfig::default()
        }
    }

    #[test]
    fn test_full_run_dumps_system() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MemoryProbe::new(full_table())
            .with_replies([HandshakeReply::Mismatch, HandshakeReply::Accept]);
        let mut operator = ScriptedOperator::new(Some(Selection::System));
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);

        let outcome = orchestrator.run(&mut probe, &mut NoProgress).unwrap();

        let Outcome::Dumped { partition, report } = outcome else {
            panic!("expected a dump, got {outcome:?}");
        };
        assert_eq!(partition, "system_a");
        assert_eq!(report.path, dir.path().join("system.img"));
        assert_eq!(report.bytes, 0x10 * 512);
        let image = std::fs::read(&report.path).unwrap();
        let base = 0x21 * 512;
        assert!(image.iter().enumerate().all(|(i, &b)| b == ((base + i) % 13) as u8));

        assert_eq!(
            orchestrator.history(),
            &[
                SessionState::Disconnected,
                SessionState::Handshaking,
                SessionState::PayloadLoaded,
                SessionState::ModeUser,
                SessionState::GptParsed,
                SessionState::AwaitingSelection,
                SessionState::Transferring,
                SessionState::Done,
            ]
        );
        // only the long-dump warning was asked
        assert_eq!(operator.prompts().len(), 1);
    }

    #[test]
    fn test_missing_tee1_pauses_for_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MemoryProbe::new(disk_with(&[
            ("lk_a", 0x10, 0x13),
            ("boot_a", 0x18, 0x1f),
            ("misc", 0x20, 0x20),
            ("userdata", 0x31, 0x3f),
        ]));
        let mut operator = ScriptedOperator::new(Some(Selection::Userdata));
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);

        let outcome = orchestrator.run(&mut probe, &mut NoProgress).unwrap();
        assert!(matches!(outcome, Outcome::Dumped { .. }));
        assert_eq!(orchestrator.state(), SessionState::Done);

        // gate first, then the long-dump warning
        assert_eq!(operator.prompts().len(), 2);
        assert!(operator.prompts()[0].contains("partition table"));
    }

    #[test]
    fn test_declined_gate_ends_run_without_dump() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MemoryProbe::new(disk_with(&[("misc", 0x20, 0x20)]));
        let mut operator =
            ScriptedOperator::new(Some(Selection::System)).with_confirmations([false]);
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);

        let outcome = orchestrator.run(&mut probe, &mut NoProgress).unwrap();
        assert_eq!(outcome, Outcome::Declined);
        assert_eq!(orchestrator.state(), SessionState::Done);
        assert!(!orchestrator.history().contains(&SessionState::Transferring));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_custom_partition_still_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MemoryProbe::new(full_table());
        let mut operator =
            ScriptedOperator::new(Some(Selection::Custom("doesnotexist".to_string())));
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);

        let outcome = orchestrator.run(&mut probe, &mut NoProgress).unwrap();
        assert_eq!(
            outcome,
            Outcome::PartitionNotFound {
                name: "doesnotexist".to_string()
            }
        );
        assert_eq!(orchestrator.state(), SessionState::Done);
        assert!(!dir.path().join("doesnotexist.img").exists());
    }

    #[test]
    fn test_transport_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MemoryProbe::new(full_table()).with_replies([HandshakeReply::Fail]);
        let mut operator = ScriptedOperator::new(Some(Selection::System));
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);

        let err = orchestrator.run(&mut probe, &mut NoProgress).unwrap_err();
        assert!(matches!(err, EmmcError::Transport(DeviceError::Transport(_))));
        assert_eq!(orchestrator.state(), SessionState::Handshaking);
    }

    #[test]
    fn test_table_is_stale_after_boot0_dump() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MemoryProbe::new(full_table());
        let mut operator = ScriptedOperator::new(None);
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);

        let mut session = orchestrator.connect(&mut probe).unwrap();
        let table = orchestrator
            .read_partition_table(&mut session)
            .unwrap()
            .unwrap();

        let report = orchestrator
            .extract_boot0(&mut session, 8, &mut NoProgress)
            .unwrap();
        let boot0 = std::fs::read(report.path).unwrap();
        assert_eq!(&boot0[..9], b"EMMC_BOOT");

        let err = orchestrator
            .extract(&mut session, &table, &Selection::System, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, EmmcError::StaleTable));

        // decoding again after switching back makes it usable
        let table = orchestrator
            .read_partition_table(&mut session)
            .unwrap()
            .unwrap();
        assert!(matches!(
            orchestrator.extract(&mut session, &table, &Selection::System, &mut NoProgress),
            Ok(Outcome::Dumped { .. })
        ));
    }

    #[test]
    fn test_provision_respects_partition_size() {
        let dir = tempfile::tempdir().unwrap();
        let fits = dir.path().join("misc.bin");
        std::fs::write(&fits, b"boot-recovery").unwrap();
        let too_big = dir.path().join("big.bin");
        std::fs::write(&too_big, vec![1u8; 513]).unwrap();

        let mut probe = MemoryProbe::new(full_table());
        let mut operator = ScriptedOperator::new(None);
        let mut orchestrator = SessionOrchestrator::new(config(dir.path()), &mut operator);
        let mut session = orchestrator.connect(&mut probe).unwrap();
        let table = orchestrator
            .read_partition_table(&mut session)
            .unwrap()
            .unwrap();

        let blocks = orchestrator
            .provision(&mut session, &table, "misc", &fits, &mut NoProgress)
            .unwrap();
        assert_eq!(blocks, 1);
        let user = &session.inner().disk().user;
        assert_eq!(&user[0x20 * 512..0x20 * 512 + 13], b"boot-recovery");
        assert!(user[0x20 * 512 + 13..0x21 * 512].iter().all(|&b| b == 0));

        let err = orchestrator
            .provision(&mut session, &table, "misc", &too_big, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, EmmcError::Capacity { size: 1024, max: 512 }));
    }

    #[test]
    fn test_run_on_worker_thread_reports_over_channel() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let output_dir = dir.path().to_path_buf();

        let worker = thread::spawn(move || {
            let mut probe = MemoryProbe::new(full_table());
            let mut operator = ScriptedOperator::new(Some(Selection::Userdata));
            let mut orchestrator = SessionOrchestrator::new(config(&output_dir), &mut operator);
            let mut observer = ChannelObserver::new(tx);
            orchestrator.run(&mut probe, &mut observer)
        });

        let events: Vec<TransferEvent> = rx.iter().collect();
        let outcome = worker.join().unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Dumped { .. }));

        assert!(matches!(&events[0], TransferEvent::Status(s) if s.contains("userdata")));
        let percents: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                TransferEvent::Progress(sample) => Some(sample.percent()),
                TransferEvent::Status(_) => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last().copied(), Some(100.0));
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("1".parse::<Selection>().unwrap(), Selection::System);
        assert_eq!("userdata".parse::<Selection>().unwrap(), Selection::Userdata);
        assert_eq!(
            "custom:boot_a".parse::<Selection>().unwrap(),
            Selection::Custom("boot_a".to_string())
        );
        assert_eq!(
            "tee1".parse::<Selection>().unwrap(),
            Selection::Custom("tee1".to_string())
        );
        assert!("custom:".parse::<Selection>().is_err());
        // a partition literally named like a menu entry needs the prefix
        let literal = "custom:system".parse::<Selection>().unwrap();
        assert_eq!(literal, Selection::Custom("system".to_string()));
        assert_eq!(literal.partition_name(&OrchestratorConfig::default()), "system");
        assert_eq!(literal.image_name(), "system.img");
        assert_eq!(Selection::Custom("a/b".to_string()).image_name(), "a_b.img");
    }
}
