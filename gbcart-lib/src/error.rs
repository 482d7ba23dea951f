use std::time::Duration;

use gbcart_core::{HeaderError, Platform};
use thiserror::Error;

/// Errors that can occur while talking to a cartridge adapter.
#[derive(Debug, Error)]
pub enum CartError {
    /// No attached serial device matched the configured adapter
    #[error("No cartridge adapter found ({0})")]
    DeviceNotFound(String),

    /// The header logo did not match; usually no cartridge is inserted
    #[error("Cartridge header is invalid (logo check failed); is a cartridge inserted?")]
    InvalidHeader,

    /// The header passed the logo check but describes impossible geometry
    #[error("Malformed cartridge header: {0}")]
    MalformedHeader(#[from] HeaderError),

    /// A blocking wait on the adapter ran out of time
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// The adapter was unplugged or the port failed mid-request
    #[error("Adapter was removed")]
    DeviceRemoved,

    /// The request's cancellation token fired
    #[error("Cancelled")]
    Cancelled,

    /// No JEDEC command sequence is registered for this flash chip
    #[error("Unsupported flash chip: {0}")]
    UnsupportedChipset(String),

    #[error("{0} cartridges are not supported")]
    UnsupportedPlatform(Platform),

    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Cartridge has no save RAM")]
    NoSaveRam,

    /// The chip may be partly erased; its contents are unknown.
    #[error(
        "Flash erase did not finish after {polls} polls ({:.1}s); flash contents are unknown, erase again",
        elapsed.as_secs_f64()
    )]
    EraseTimedOut { polls: u32, elapsed: Duration },

    /// A write failed after bytes were committed. Cartridge contents are
    /// unknown and should be verified again.
    #[error("Write interrupted after {written} of {total} bytes: {cause}")]
    WriteInterrupted {
        written: u64,
        total: u64,
        #[source]
        cause: Box<CartError>,
    },

    /// The adapter answered with something the protocol does not allow
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A pool worker died before reporting a result
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl CartError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a failure that happened after `written` bytes were committed.
    pub fn interrupted(written: u64, total: u64, cause: CartError) -> Self {
        Self::WriteInterrupted {
            written,
            total,
            cause: Box::new(cause),
        }
    }

    /// The underlying error, looking through `WriteInterrupted`.
    pub fn root_cause(&self) -> &CartError {
        match self {
            Self::WriteInterrupted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled)
    }

    pub fn is_removed(&self) -> bool {
        matches!(self.root_cause(), Self::DeviceRemoved)
    }
}
