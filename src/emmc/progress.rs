//! Progress reporting for block transfers.
//!
//! The engine never prints. It hands [`ProgressSample`]s to a [`ProgressObserver`]
//! at a bounded cadence; front ends decide how to show them.

use serde::Serialize;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSample {
    pub completed: u64,
    pub total: u64,
}

impl ProgressSample {
    /// Completion in percent, within [0, 100]. An empty job counts as done.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed.min(self.total) as f64 / self.total as f64) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

pub trait ProgressObserver {
    fn on_progress(&mut self, sample: ProgressSample);

    fn on_status(&mut self, _message: &str) {}
}

/// Observer that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _sample: ProgressSample) {}
}

/// Message sent from a transfer running on a worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Status(String),
    Progress(ProgressSample),
}

/// Forwards samples over a channel so a UI thread never shares state with the worker.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<TransferEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<TransferEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, sample: ProgressSample) {
        // receiver may be gone if the UI closed; the transfer still finishes
        let _ = self.tx.send(TransferEvent::Progress(sample));
    }

    fn on_status(&mut self, message: &str) {
        let _ = self.tx.send(TransferEvent::Status(message.to_string()));
    }
}

/// Decides which block completions are reported.
///
/// A sample is due every `interval` blocks and always for the final block, so
/// the last sample of a job is 100%.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval: u64,
    total: u64,
}

impl Cadence {
    pub fn new(interval: u64, total: u64) -> Self {
        Self {
            interval: interval.max(1),
            total,
        }
    }

    pub fn sample(&self, completed: u64) -> Option<ProgressSample> {
        if completed == self.total || completed % self.interval == 0 {
            Some(ProgressSample {
                completed,
                total: self.total,
            })
        } else {
            None
        }
    }
}
