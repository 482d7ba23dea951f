//! Reading headers, ROM images and save RAM.

use gbcart_core::{Header, Platform};

use crate::error::CartError;
use crate::geometry::{BankWindow, Geometry};
use crate::progress::{Operation, ProgressSink, TransferProgress};
use crate::transfer::Transfer;
use crate::wire::Wire;

/// Bytes fetched for a header read: six pages, of which the first
/// `HEADER_LEN` are parsed.
pub const HEADER_READ_LEN: u64 = 0x180;

/// Reads data off a cartridge through a held link.
pub struct ReadEngine<'a> {
    wire: &'a Wire<'a>,
    platform: Platform,
    progress: &'a dyn ProgressSink,
}

impl<'a> ReadEngine<'a> {
    pub fn new(wire: &'a Wire<'a>, platform: Platform, progress: &'a dyn ProgressSink) -> Self {
        Self {
            wire,
            platform,
            progress,
        }
    }

    /// Read and validate the cartridge header.
    pub fn read_header(&self) -> Result<Header, CartError> {
        if self.platform != Platform::GameBoy {
            return Err(CartError::UnsupportedPlatform(self.platform));
        }
        self.progress.report(TransferProgress::Started {
            operation: Operation::ReadHeader,
            total_bytes: HEADER_READ_LEN,
        });
        let mut transfer = Transfer::new(HEADER_READ_LEN, self.wire.cancel_token().clone());
        let window = BankWindow {
            bank: 0,
            address: 0,
            len: HEADER_READ_LEN,
        };
        self.wire.read_window(&window, &mut transfer, self.progress)?;

        let header = Header::parse(&transfer.into_bytes())?;
        if !header.is_logo_valid() {
            return Err(CartError::InvalidHeader);
        }
        log::debug!(
            "header: {:?} ({}, ROM code 0x{:02X}, RAM code 0x{:02X})",
            header.title,
            header.controller,
            header.rom_size_code,
            header.ram_size_code
        );
        Ok(header)
    }

    /// Read the full ROM image.
    pub fn read_rom(&self, geometry: &Geometry) -> Result<Vec<u8>, CartError> {
        self.progress.report(TransferProgress::Started {
            operation: Operation::ReadRom,
            total_bytes: geometry.rom_size,
        });
        let mut transfer = Transfer::new(geometry.rom_size, self.wire.cancel_token().clone());
        let windows = geometry.rom_windows();
        for (index, window) in windows.iter().enumerate() {
            self.wire.checkpoint()?;
            self.progress.report(TransferProgress::Bank {
                index,
                count: windows.len(),
            });
            self.wire.send_all(&geometry.select_rom_bank(window.bank))?;
            self.wire.read_window(window, &mut transfer, self.progress)?;
        }
        Ok(transfer.into_bytes())
    }

    /// Read the whole save RAM.
    pub fn read_save(&self, geometry: &Geometry) -> Result<Vec<u8>, CartError> {
        if !geometry.has_save_ram() {
            return Err(CartError::NoSaveRam);
        }
        self.progress.report(TransferProgress::Started {
            operation: Operation::ReadSave,
            total_bytes: geometry.ram_size,
        });
        let mut transfer = Transfer::new(geometry.ram_size, self.wire.cancel_token().clone());

        self.wire.send(&Geometry::toggle_ram(true))?;
        let result = self.read_ram_banks(geometry, &mut transfer);
        finish_ram_access(self.wire, &result);
        result?;
        Ok(transfer.into_bytes())
    }

    fn read_ram_banks(&self, geometry: &Geometry, transfer: &mut Transfer) -> Result<(), CartError> {
        let windows = geometry.ram_windows();
        for (index, window) in windows.iter().enumerate() {
            self.wire.checkpoint()?;
            self.progress.report(TransferProgress::Bank {
                index,
                count: windows.len(),
            });
            if geometry.needs_ram_fix() {
                self.wire.discard_page(0)?;
            }
            self.wire.send_all(&geometry.select_ram_bank(window.bank))?;
            self.wire.read_window(window, transfer, self.progress)?;
        }
        Ok(())
    }
}

/// Disable save RAM after an access, unless the adapter is gone.
pub(crate) fn finish_ram_access<T>(wire: &Wire<'_>, result: &Result<T, CartError>) {
    if let Err(e) = result
        && e.is_removed()
    {
        return;
    }
    if let Err(e) = wire.send(&Geometry::toggle_ram(false)) {
        log::warn!("could not disable save RAM: {}", e);
    }
}
