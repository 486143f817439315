use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use crate::emmc::progress::{ProgressObserver, ProgressSample};
use crate::ui::prelude::*;

pub fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap()
            .tick_chars("⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Shows block transfers as a progress bar in text mode and as
/// `transfer.progress` events in JSON mode.
pub struct TransferProgress {
    bar: Option<ProgressBar>,
    message: String,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self {
            bar: None,
            message: String::new(),
        }
    }

    fn bar_for(&mut self, total: u64) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>8}/{len:8} blocks ({eta}) {msg}",
                    )
                    .unwrap()
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            pb.set_message(self.message.clone());
            pb
        })
    }

    pub fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransferProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ProgressObserver for TransferProgress {
    fn on_progress(&mut self, sample: ProgressSample) {
        if matches!(get_output_format(), OutputFormat::Json) {
            emit(
                Level::Info,
                "transfer.progress",
                &format!("{:.1}%", sample.percent()),
                Some(json!({
                    "completed": sample.completed,
                    "total": sample.total,
                    "percent": sample.percent(),
                })),
            );
            return;
        }

        let pb = self.bar_for(sample.total);
        pb.set_position(sample.completed);
        if sample.is_complete() {
            self.finish();
        }
    }

    fn on_status(&mut self, message: &str) {
        // a new job starts with a fresh bar
        self.finish();
        self.message = message.to_string();
    }
}
