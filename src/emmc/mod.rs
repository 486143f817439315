//! eMMC access over a recovery-mode link: region switching, partition table
//! decoding, block transfers and the session flow tying them together.

pub mod block;
pub mod connect;
pub mod error;
pub mod gpt;
pub mod mode;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod transfer;

pub use block::{BLOCK_SIZE, Block, TransferJob};
pub use connect::{ConnectionEstablisher, RetryPolicy};
pub use error::EmmcError;
pub use gpt::{PartitionEntry, PartitionTable};
pub use orchestrator::{
    Operator, OrchestratorConfig, Outcome, ScriptedOperator, Selection, SessionOrchestrator,
    SessionState,
};
pub use progress::{ChannelObserver, NoProgress, ProgressObserver, ProgressSample, TransferEvent};
pub use session::EmmcSession;
pub use transfer::{BlockTransferEngine, DumpReport};
