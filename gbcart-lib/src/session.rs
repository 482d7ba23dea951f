//! Request coordinator: one cartridge request at a time over a shared link.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use gbcart_core::{Header, Platform};
use parking_lot::Mutex;

use crate::codec::AddressCommand;
use crate::error::CartError;
use crate::flash::FlashProfile;
use crate::geometry::Geometry;
use crate::link::{Link, LinkHandle};
use crate::progress::{NoProgress, Operation, ProgressSink, TransferProgress};
use crate::read::ReadEngine;
use crate::transfer::CancelToken;
use crate::wire::{Timing, Wire};
use crate::write::WriteEngine;

/// Something a caller wants done to the cartridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadHeader,
    ReadCartridge,
    BackupSave,
    RestoreSave(Vec<u8>),
    EraseSave,
    EraseFlash,
    WriteFlash(Vec<u8>),
}

impl Request {
    /// The main operation the request performs.
    pub fn operation(&self) -> Operation {
        match self {
            Self::ReadHeader => Operation::ReadHeader,
            Self::ReadCartridge => Operation::ReadRom,
            Self::BackupSave => Operation::ReadSave,
            Self::RestoreSave(_) => Operation::WriteSave,
            Self::EraseSave => Operation::EraseSave,
            Self::EraseFlash => Operation::EraseFlash,
            Self::WriteFlash(_) => Operation::WriteFlash,
        }
    }
}

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Header(Header),
    Cartridge { header: Header, rom: Vec<u8> },
    Save { header: Header, data: Vec<u8> },
    SaveRestored { header: Header, bytes: u64 },
    SaveErased { header: Header, bytes: u64 },
    FlashErased,
    FlashWritten { header: Header, bytes: u64 },
}

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    /// Waiting for the link
    Acquiring,
    Running,
    Completing,
    Cancelling,
    /// The adapter went away mid-request
    Removed,
}

/// A state transition of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub request: u64,
    pub state: SessionState,
}

/// Per-request cancellation and progress reporting.
#[derive(Clone)]
pub struct RequestControl {
    pub cancel: CancelToken,
    pub progress: Arc<dyn ProgressSink>,
}

impl Default for RequestControl {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            progress: Arc::new(NoProgress),
        }
    }
}

impl std::fmt::Debug for RequestControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestControl")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RequestControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Arc::new(progress);
        self
    }
}

/// Static parameters of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub platform: Platform,
    pub timing: Timing,
    pub flash: FlashProfile,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            platform: Platform::GameBoy,
            timing: Timing::default(),
            flash: FlashProfile::default(),
        }
    }
}

/// Runs requests against one adapter, strictly one at a time.
pub struct Session {
    link: Link,
    config: SessionConfig,
    state: Mutex<SessionState>,
    observer: Option<Sender<SessionEvent>>,
    next_request: AtomicU64,
}

impl Session {
    pub fn new(link: Link, config: SessionConfig) -> Self {
        Self {
            link,
            config,
            state: Mutex::new(SessionState::Idle),
            observer: None,
            next_request: AtomicU64::new(1),
        }
    }

    /// Publish every state transition to `observer`.
    pub fn with_observer(mut self, observer: Sender<SessionEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    /// State of the request currently holding the link, or `Idle`.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Run one request to completion.
    ///
    /// Blocks while another request holds the link. The link is released
    /// before the outcome is returned, whatever happened.
    pub fn execute(&self, request: Request, control: &RequestControl) -> Result<Outcome, CartError> {
        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        log::debug!("request {} ({:?}) queued", id, request.operation());

        self.publish(id, SessionState::Acquiring, false);
        let handle = match self.link.acquire(self.config.timing.acquire) {
            Ok(handle) => handle,
            Err(e) => {
                self.publish(id, SessionState::Idle, false);
                control.progress.report(TransferProgress::failed(e.to_string()));
                return Err(e);
            }
        };
        self.publish(id, SessionState::Running, true);

        let result = self.run(&handle, request, control);

        let exit = match &result {
            Ok(_) => SessionState::Completing,
            Err(e) if e.is_cancelled() => SessionState::Cancelling,
            Err(e) if e.is_removed() => SessionState::Removed,
            Err(_) => SessionState::Completing,
        };
        self.publish(id, exit, true);
        match &result {
            Ok(_) => control.progress.report(TransferProgress::Completed),
            Err(e) => control.progress.report(TransferProgress::failed(e.to_string())),
        }

        *self.state.lock() = SessionState::Idle;
        drop(handle);
        self.publish(id, SessionState::Idle, false);
        result
    }

    fn run(
        &self,
        handle: &LinkHandle<'_>,
        request: Request,
        control: &RequestControl,
    ) -> Result<Outcome, CartError> {
        let platform = self.config.platform;
        let progress = control.progress.as_ref();
        let wire = Wire::new(handle, platform, self.config.timing, &control.cancel);
        let reader = ReadEngine::new(&wire, platform, progress);
        let writer = WriteEngine::new(&wire, &self.config.flash, progress);

        wire.send(&AddressCommand::RomMode)?;

        match request {
            Request::ReadHeader => reader.read_header().map(Outcome::Header),
            Request::ReadCartridge => {
                let header = reader.read_header()?;
                let geometry = Geometry::for_platform(platform, &header)?;
                let rom = reader.read_rom(&geometry)?;
                Ok(Outcome::Cartridge { header, rom })
            }
            Request::BackupSave => {
                let header = reader.read_header()?;
                let geometry = Geometry::for_platform(platform, &header)?;
                let data = reader.read_save(&geometry)?;
                Ok(Outcome::Save { header, data })
            }
            Request::RestoreSave(data) => {
                let header = reader.read_header()?;
                let geometry = Geometry::for_platform(platform, &header)?;
                writer.restore_save(&geometry, &data)?;
                Ok(Outcome::SaveRestored {
                    header,
                    bytes: data.len() as u64,
                })
            }
            Request::EraseSave => {
                let header = reader.read_header()?;
                let geometry = Geometry::for_platform(platform, &header)?;
                writer.erase_save(&geometry)?;
                Ok(Outcome::SaveErased {
                    header,
                    bytes: geometry.ram_size,
                })
            }
            Request::EraseFlash => {
                writer.erase_flash()?;
                Ok(Outcome::FlashErased)
            }
            Request::WriteFlash(image) => {
                if platform != Platform::GameBoy {
                    return Err(CartError::UnsupportedPlatform(platform));
                }
                let header = writer.write_flash(&image)?;
                Ok(Outcome::FlashWritten {
                    header,
                    bytes: image.len() as u64,
                })
            }
        }
    }

    fn publish(&self, request: u64, state: SessionState, holder: bool) {
        if holder {
            *self.state.lock() = state;
        }
        log::trace!("request {} -> {:?}", request, state);
        if let Some(observer) = &self.observer {
            let _ = observer.send(SessionEvent { request, state });
        }
    }

    pub fn read_header(&self, control: &RequestControl) -> Result<Header, CartError> {
        match self.execute(Request::ReadHeader, control)? {
            Outcome::Header(header) => Ok(header),
            other => Err(unexpected(other)),
        }
    }

    pub fn read_cartridge(&self, control: &RequestControl) -> Result<(Header, Vec<u8>), CartError> {
        match self.execute(Request::ReadCartridge, control)? {
            Outcome::Cartridge { header, rom } => Ok((header, rom)),
            other => Err(unexpected(other)),
        }
    }

    pub fn backup_save(&self, control: &RequestControl) -> Result<(Header, Vec<u8>), CartError> {
        match self.execute(Request::BackupSave, control)? {
            Outcome::Save { header, data } => Ok((header, data)),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(outcome: Outcome) -> CartError {
    let kind = match outcome {
        Outcome::Header(_) => "header",
        Outcome::Cartridge { .. } => "cartridge",
        Outcome::Save { .. } => "save",
        Outcome::SaveRestored { .. } => "save restore",
        Outcome::SaveErased { .. } => "save erase",
        Outcome::FlashErased => "flash erase",
        Outcome::FlashWritten { .. } => "flash write",
    };
    CartError::protocol(format!("request produced an unexpected {kind} outcome"))
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
