use thiserror::Error;

use gbcart_lib::CartError;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The adapter or cartridge reported a failure
    #[error("{0}")]
    Device(#[from] CartError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Read-back after a write did not match
    #[error("Verification failed: {0}")]
    Verify(String),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn verify(msg: impl Into<String>) -> Self {
        Self::Verify(msg.into())
    }
}
