//! Writing save RAM and programming flash cartridges.
//!
//! Writes are never rolled back. Once any byte has been committed, a
//! failure is reported as `WriteInterrupted` carrying the cause.

use std::time::Instant;

use gbcart_core::Header;

use crate::codec::{AddressCommand, STATUS_SIZE};
use crate::error::CartError;
use crate::flash::{ERASE_DONE, FlashProfile, JedecSequence};
use crate::geometry::Geometry;
use crate::progress::{Operation, ProgressSink, TransferProgress};
use crate::read::finish_ram_access;
use crate::transfer::Transfer;
use crate::wire::Wire;

/// Writes data onto a cartridge through a held link.
pub struct WriteEngine<'a> {
    wire: &'a Wire<'a>,
    flash: &'a FlashProfile,
    progress: &'a dyn ProgressSink,
}

impl<'a> WriteEngine<'a> {
    pub fn new(wire: &'a Wire<'a>, flash: &'a FlashProfile, progress: &'a dyn ProgressSink) -> Self {
        Self {
            wire,
            flash,
            progress,
        }
    }

    /// Overwrite save RAM with `data`, which must be exactly `ram_size` bytes.
    pub fn restore_save(&self, geometry: &Geometry, data: &[u8]) -> Result<(), CartError> {
        self.write_save(geometry, data, Operation::WriteSave)
    }

    /// Fill save RAM with zeros.
    pub fn erase_save(&self, geometry: &Geometry) -> Result<(), CartError> {
        let zeros = vec![0u8; geometry.ram_size as usize];
        self.write_save(geometry, &zeros, Operation::EraseSave)
    }

    fn write_save(
        &self,
        geometry: &Geometry,
        data: &[u8],
        operation: Operation,
    ) -> Result<(), CartError> {
        if !geometry.has_save_ram() {
            return Err(CartError::NoSaveRam);
        }
        if data.len() as u64 != geometry.ram_size {
            return Err(CartError::SizeMismatch {
                expected: geometry.ram_size,
                actual: data.len() as u64,
            });
        }
        self.progress.report(TransferProgress::Started {
            operation,
            total_bytes: geometry.ram_size,
        });
        let mut transfer = Transfer::new(geometry.ram_size, self.wire.cancel_token().clone());

        self.wire.send(&Geometry::toggle_ram(true))?;
        let result = self.write_ram_banks(geometry, data, &mut transfer);
        finish_ram_access(self.wire, &result);
        result.map_err(|e| interrupted(&transfer, e))
    }

    fn write_ram_banks(
        &self,
        geometry: &Geometry,
        data: &[u8],
        transfer: &mut Transfer,
    ) -> Result<(), CartError> {
        let windows = geometry.ram_windows();
        let chunks = data.chunks(geometry.ram_bank_size as usize);
        for (index, (window, chunk)) in windows.iter().zip(chunks).enumerate() {
            self.wire.checkpoint()?;
            self.progress.report(TransferProgress::Bank {
                index,
                count: windows.len(),
            });
            if geometry.needs_ram_fix() {
                self.wire.discard_page(0)?;
            }
            self.wire.send_all(&geometry.select_ram_bank(window.bank))?;
            self.wire
                .write_window(window.address, chunk, transfer, self.progress)?;
        }
        Ok(())
    }

    /// Erase the whole flash chip and wait for it to report completion.
    pub fn erase_flash(&self) -> Result<(), CartError> {
        let sequence = self.flash.sequence()?;
        self.progress.report(TransferProgress::Started {
            operation: Operation::EraseFlash,
            total_bytes: 0,
        });
        self.prepare_erase(sequence)?;
        self.erase_chip(sequence)
    }

    /// Select the write pin and put the chip in read-array mode. Nothing on
    /// the chip changes yet.
    fn prepare_erase(&self, sequence: &JedecSequence) -> Result<(), CartError> {
        if let Some(pin) = self.flash.we_pin {
            self.wire.send(&AddressCommand::PinMode(pin))?;
        }
        self.wire.send_acked(&sequence.reset_command())?;
        self.wire.discard_page(0)
    }

    fn erase_chip(&self, sequence: &JedecSequence) -> Result<(), CartError> {
        for command in sequence.erase_commands() {
            self.wire.send_acked(&command)?;
        }
        if let Err(e) = self.poll_erase() {
            if matches!(e, CartError::EraseTimedOut { .. })
                && self.wire.send_acked(&sequence.reset_command()).is_err()
            {
                log::debug!("could not reset flash after giving up on erase");
            }
            return Err(e);
        }
        self.wire.send_acked(&sequence.reset_command())
    }

    /// Poll the status byte at address 0 until the chip reads back 0xFF.
    fn poll_erase(&self) -> Result<(), CartError> {
        let timing = *self.wire.timing();
        let started = Instant::now();
        let mut polls = 0u32;

        self.wire.send(&AddressCommand::GoTo(0))?;
        self.wire.send(&AddressCommand::Read)?;
        loop {
            let status = match self.wire.receive(STATUS_SIZE) {
                Ok(status) => status[0],
                Err(e) => {
                    self.wire.stop_quietly();
                    return Err(e);
                }
            };
            polls += 1;
            self.progress.report(TransferProgress::Polling { attempts: polls });
            if status == ERASE_DONE {
                break;
            }

            let elapsed = started.elapsed();
            let over_limit = timing.erase_poll_limit.is_some_and(|limit| polls >= limit);
            if elapsed >= timing.erase || over_limit {
                self.wire.stop_quietly();
                return Err(CartError::EraseTimedOut { polls, elapsed });
            }
            if let Err(e) = self.wire.checkpoint() {
                self.wire.stop_quietly();
                return Err(e);
            }
            self.wire.send(&AddressCommand::Continue)?;
        }
        log::debug!("flash erase finished after {} polls", polls);
        self.wire.send(&AddressCommand::Stop)
    }

    /// Erase the chip and program `image` onto it.
    ///
    /// The image must carry a valid header and be exactly as large as that
    /// header declares.
    pub fn write_flash(&self, image: &[u8]) -> Result<Header, CartError> {
        let sequence = self.flash.sequence()?;
        let header = Header::parse(image)?;
        let geometry = Geometry::new(&header)?;
        if image.len() as u64 != geometry.rom_size {
            return Err(CartError::SizeMismatch {
                expected: geometry.rom_size,
                actual: image.len() as u64,
            });
        }

        self.progress.report(TransferProgress::Started {
            operation: Operation::EraseFlash,
            total_bytes: 0,
        });
        self.prepare_erase(sequence)?;
        // Once the erase command is out the old contents are gone
        self.erase_chip(sequence)
            .map_err(|e| CartError::interrupted(0, geometry.rom_size, e))?;

        self.progress.report(TransferProgress::Started {
            operation: Operation::WriteFlash,
            total_bytes: geometry.rom_size,
        });
        let mut transfer = Transfer::new(geometry.rom_size, self.wire.cancel_token().clone());
        let result = self.program(sequence, &geometry, image, &mut transfer);
        result.map_err(|e| interrupted(&transfer, e))?;
        Ok(header)
    }

    fn program(
        &self,
        sequence: &JedecSequence,
        geometry: &Geometry,
        image: &[u8],
        transfer: &mut Transfer,
    ) -> Result<(), CartError> {
        for command in sequence.program_commands() {
            self.wire.send_acked(&command)?;
        }
        let windows = geometry.rom_windows();
        let mut offset = 0usize;
        for (index, window) in windows.iter().enumerate() {
            self.wire.checkpoint()?;
            self.progress.report(TransferProgress::Bank {
                index,
                count: windows.len(),
            });
            self.wire.send_all(&geometry.select_rom_bank(window.bank))?;
            let end = offset + window.len as usize;
            self.wire
                .write_window(window.address, &image[offset..end], transfer, self.progress)?;
            offset = end;
        }
        self.wire.send_acked(&sequence.reset_command())
    }
}

/// Wrap `err` as `WriteInterrupted` once any byte of `transfer` was written.
fn interrupted(transfer: &Transfer, err: CartError) -> CartError {
    if transfer.completed() == 0 {
        err
    } else {
        CartError::interrupted(transfer.completed(), transfer.target(), err)
    }
}
