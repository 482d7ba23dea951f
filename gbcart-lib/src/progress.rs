//! Progress events emitted while a request runs.
//!
//! Engines report through a [`ProgressSink`], which must never block the
//! transfer. The std and tokio channel senders both implement it; a
//! dropped receiver simply means nobody is listening.

use std::sync::mpsc;

use tokio::sync::mpsc as tokio_mpsc;

/// The cartridge operation a progress stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadHeader,
    ReadRom,
    ReadSave,
    WriteSave,
    EraseSave,
    EraseFlash,
    WriteFlash,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadHeader => "Reading header",
            Self::ReadRom => "Reading ROM",
            Self::ReadSave => "Reading save",
            Self::WriteSave => "Writing save",
            Self::EraseSave => "Erasing save",
            Self::EraseFlash => "Erasing flash",
            Self::WriteFlash => "Writing flash",
        }
    }
}

/// Progress update sent during a transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferProgress {
    /// A transfer has started
    Started {
        operation: Operation,
        /// Bytes the transfer will move (zero for erase polling)
        total_bytes: u64,
    },

    /// Moving on to the next bank window
    Bank {
        /// Zero-based window index
        index: usize,
        count: usize,
    },

    /// A page was accounted
    Bytes { completed: u64, total: u64 },

    /// Still waiting for a flash erase to finish
    Polling { attempts: u32 },

    /// The request finished successfully
    Completed,

    /// The request failed or was cancelled
    Failed { message: String },
}

impl TransferProgress {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns the progress percentage (0.0 to 1.0) if calculable.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            Self::Bytes { completed, total } if *total > 0 => {
                Some(*completed as f64 / *total as f64)
            }
            Self::Completed => Some(1.0),
            _ => None,
        }
    }
}

/// Receives progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: TransferProgress);
}

impl ProgressSink for mpsc::Sender<TransferProgress> {
    fn report(&self, event: TransferProgress) {
        let _ = self.send(event);
    }
}

impl ProgressSink for tokio_mpsc::UnboundedSender<TransferProgress> {
    fn report(&self, event: TransferProgress) {
        let _ = self.send(event);
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: TransferProgress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_of_bytes() {
        let p = TransferProgress::Bytes {
            completed: 64,
            total: 256,
        };
        assert_eq!(p.percentage(), Some(0.25));
        assert_eq!(
            TransferProgress::Bytes {
                completed: 0,
                total: 0
            }
            .percentage(),
            None
        );
        assert_eq!(TransferProgress::Completed.percentage(), Some(1.0));
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        tx.report(TransferProgress::Completed);

        let (tx, rx) = tokio_mpsc::unbounded_channel();
        drop(rx);
        tx.report(TransferProgress::Completed);
    }
}
