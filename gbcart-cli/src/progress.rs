//! Terminal progress display for cartridge transfers.
//!
//! One bar is reused for every phase of a request: it shows bytes while
//! data moves and turns into a spinner while a flash erase is polled.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use gbcart_lib::{Operation, TransferProgress};

const TICK: Duration = Duration::from_millis(100);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .expect("static pattern")
        .tick_chars("/-\\|")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "  {spinner:.cyan} {msg:<14} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {prefix}",
    )
    .expect("static pattern")
    .tick_chars("/-\\|")
    .progress_chars("=> ")
}

/// Progress bar driven by [`TransferProgress`] events.
pub(crate) struct TransferBar {
    pb: ProgressBar,
    operation: Option<Operation>,
}

impl TransferBar {
    /// When `quiet` is true the bar is hidden.
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        pb.set_style(spinner_style());
        pb.set_message("Waiting for the adapter...");
        pb.enable_steady_tick(TICK);
        Self {
            pb,
            operation: None,
        }
    }

    pub(crate) fn update(&mut self, event: TransferProgress) {
        match event {
            TransferProgress::Started {
                operation,
                total_bytes,
            } => {
                self.operation = Some(operation);
                self.pb.reset();
                self.pb.set_prefix("");
                if total_bytes > 0 {
                    self.pb.set_style(bar_style());
                    self.pb.set_length(total_bytes);
                } else {
                    self.pb.set_style(spinner_style());
                }
                self.pb.set_message(operation.name());
            }
            TransferProgress::Bank { index, count } => {
                self.pb.set_prefix(format!("bank {}/{}", index + 1, count));
            }
            TransferProgress::Bytes { completed, .. } => {
                self.pb.set_position(completed);
            }
            TransferProgress::Polling { attempts } => {
                let name = self.operation.map_or("Waiting", |op| op.name());
                self.pb.set_message(format!("{} (poll {})", name, attempts));
            }
            TransferProgress::Completed | TransferProgress::Failed { .. } => self.finish(),
        }
    }

    pub(crate) fn finish(&self) {
        self.pb.disable_steady_tick();
        self.pb.finish_and_clear();
    }
}
