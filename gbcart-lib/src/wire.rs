//! Command-level driver shared by the read and write engines.

use std::thread;
use std::time::Duration;

use gbcart_core::Platform;

use crate::codec::{ACK, ACK_SIZE, AddressCommand, PAGE_SIZE};
use crate::error::CartError;
use crate::geometry::BankWindow;
use crate::link::LinkHandle;
use crate::progress::{ProgressSink, TransferProgress};
use crate::transfer::{CancelToken, Transfer};

/// Timeouts and limits for talking to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// How long a request waits for the link
    pub acquire: Duration,
    /// How long any single page, acknowledgement or status byte may take
    pub response: Duration,
    /// Ceiling on the whole flash erase poll loop
    pub erase: Duration,
    /// Optional ceiling on the number of erase status polls
    pub erase_poll_limit: Option<u32>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            acquire: Duration::from_secs(10),
            response: Duration::from_secs(2),
            erase: Duration::from_secs(180),
            erase_poll_limit: None,
        }
    }
}

/// Sends commands through a held link and accounts the replies.
pub struct Wire<'a> {
    link: &'a LinkHandle<'a>,
    platform: Platform,
    timing: Timing,
    cancel: &'a CancelToken,
}

impl<'a> Wire<'a> {
    pub fn new(
        link: &'a LinkHandle<'a>,
        platform: Platform,
        timing: Timing,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            link,
            platform,
            timing,
            cancel,
        }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.cancel
    }

    /// `Err(Cancelled)` once the request was cancelled.
    pub fn checkpoint(&self) -> Result<(), CartError> {
        self.cancel.check()
    }

    pub fn send(&self, command: &AddressCommand) -> Result<(), CartError> {
        log::trace!("-> {:?}", command);
        for frame in command.encode(self.platform) {
            if !self.link.send(&frame.bytes) {
                return Err(CartError::DeviceRemoved);
            }
            if let Some(delay) = frame.settle_after {
                thread::sleep(delay);
            }
        }
        Ok(())
    }

    pub fn send_all(&self, commands: &[AddressCommand]) -> Result<(), CartError> {
        commands.iter().try_for_each(|c| self.send(c))
    }

    /// Send a command the adapter acknowledges and wait for the ack.
    pub fn send_acked(&self, command: &AddressCommand) -> Result<(), CartError> {
        self.send(command)?;
        self.expect_ack()
    }

    pub fn receive(&self, count: usize) -> Result<Vec<u8>, CartError> {
        self.link.receive(count, self.timing.response, self.cancel)
    }

    pub fn expect_ack(&self) -> Result<(), CartError> {
        let reply = self.receive(ACK_SIZE)?;
        match reply.first() {
            Some(&ACK) => Ok(()),
            Some(other) => Err(CartError::protocol(format!(
                "expected acknowledgement, got 0x{other:02X}"
            ))),
            None => Err(CartError::protocol("empty acknowledgement")),
        }
    }

    /// Best-effort `Stop` used when bailing out of a stream.
    pub fn stop_quietly(&self) {
        if self.send(&AddressCommand::Stop).is_err() {
            log::debug!("could not send Stop while aborting");
        }
    }

    /// Stream `window.len` bytes starting at `window.address` into `transfer`.
    ///
    /// The bank must already be selected.
    pub fn read_window(
        &self,
        window: &BankWindow,
        transfer: &mut Transfer,
        progress: &dyn ProgressSink,
    ) -> Result<(), CartError> {
        self.send(&AddressCommand::GoTo(window.address))?;
        self.send(&AddressCommand::Read)?;

        let mut remaining = window.len;
        loop {
            let page = match self.receive(PAGE_SIZE) {
                Ok(page) => page,
                Err(e) => {
                    if matches!(e, CartError::Cancelled | CartError::Timeout(_)) {
                        self.stop_quietly();
                    }
                    return Err(e);
                }
            };
            let take = remaining.min(PAGE_SIZE as u64) as usize;
            transfer.append(&page[..take])?;
            remaining -= take as u64;
            progress.report(TransferProgress::Bytes {
                completed: transfer.completed(),
                total: transfer.target(),
            });

            if remaining == 0 {
                break;
            }
            if let Err(e) = self.checkpoint() {
                self.stop_quietly();
                return Err(e);
            }
            self.send(&AddressCommand::Continue)?;
        }
        self.send(&AddressCommand::Stop)
    }

    /// Read one page at `address` and throw it away.
    pub fn discard_page(&self, address: u32) -> Result<(), CartError> {
        self.send(&AddressCommand::GoTo(address))?;
        self.send(&AddressCommand::Read)?;
        let page = self.receive(PAGE_SIZE);
        self.send(&AddressCommand::Stop)?;
        page.map(drop)
    }

    /// Stream `data` as acknowledged 64-byte pages starting at `address`.
    pub fn write_window(
        &self,
        address: u32,
        data: &[u8],
        transfer: &mut Transfer,
        progress: &dyn ProgressSink,
    ) -> Result<(), CartError> {
        self.send(&AddressCommand::GoTo(address))?;
        for page in data.chunks(PAGE_SIZE) {
            self.checkpoint()?;
            if page.len() != PAGE_SIZE {
                return Err(CartError::protocol(format!(
                    "write page of {} bytes; pages are {} bytes",
                    page.len(),
                    PAGE_SIZE
                )));
            }
            self.send_acked(&AddressCommand::Write(page.to_vec()))?;
            transfer.advance(page.len() as u64)?;
            progress.report(TransferProgress::Bytes {
                completed: transfer.completed(),
                total: transfer.target(),
            });
        }
        Ok(())
    }
}
