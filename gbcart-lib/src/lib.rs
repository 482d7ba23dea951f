//! Driver for GBxCart-style USB cartridge adapters.
//!
//! A [`Session`] owns the [`Link`] to one adapter and runs requests
//! against it one at a time: reading headers, ROMs and saves, restoring or
//! erasing saves, and erasing or programming flash cartridges. The link
//! talks through a [`Transport`]: [`SerialTransport`] for real hardware,
//! [`SimulatedCartridge`] for tests and dry runs.

pub mod async_util;
pub mod codec;
pub mod error;
pub mod flash;
pub mod geometry;
pub mod hasher;
pub mod link;
pub mod progress;
pub mod read;
pub mod serial;
pub mod session;
pub mod settings;
pub mod sim;
pub mod transfer;
pub mod wire;
pub mod worker_pool;
pub mod write;

pub use async_util::drive_with_progress;
pub use codec::{AddressCommand, WritePin};
pub use error::CartError;
pub use flash::FlashProfile;
pub use geometry::{BankWindow, Geometry};
pub use hasher::{DumpHashes, hash_bytes, hash_reader};
pub use link::{Inbox, Link, LinkHandle, Transport};
pub use progress::{NoProgress, Operation, ProgressSink, TransferProgress};
pub use serial::{DeviceMatcher, PortSummary, SerialTransport};
pub use session::{
    Outcome, Request, RequestControl, Session, SessionConfig, SessionEvent, SessionState,
};
pub use settings::Settings;
pub use sim::SimulatedCartridge;
pub use transfer::CancelToken;
pub use wire::Timing;
pub use worker_pool::{Job, JobResult, RequestPool};
