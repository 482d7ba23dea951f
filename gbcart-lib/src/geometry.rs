//! Bank layout and bank-switch sequences for classic cartridges.
//!
//! ROM is read as one double-size window over 0x0000..0x8000 (banks 0 and
//! 1, with bank 1 selected) followed by every later bank through the
//! switchable window at 0x4000. Save RAM is read bank by bank at 0xA000.

use gbcart_core::{ControllerFamily, Header, Platform};

use crate::codec::AddressCommand;
use crate::error::CartError;

pub const ROM_BANK_SIZE: u64 = 0x4000;
pub const RAM_BANK_SIZE: u64 = 0x2000;

/// Start of the switchable ROM window.
pub const SWITCHABLE_ROM_START: u32 = 0x4000;

/// Start of the external RAM window.
pub const RAM_START: u32 = 0xA000;

/// RAM enable register and its magic values.
const RAM_ENABLE_ADDRESS: u32 = 0x0000;
const RAM_ENABLE: u32 = 0x0A;
const RAM_DISABLE: u32 = 0x00;

/// RAM bank register (also the upper ROM bits on MBC1).
const RAM_BANK_ADDRESS: u32 = 0x4000;

const MBC1_MODE_ADDRESS: u32 = 0x6000;
const MBC1_LOW_ADDRESS: u32 = 0x2000;
const ROM_BANK_ADDRESS: u32 = 0x2100;
const ROM_BANK_HIGH_ADDRESS: u32 = 0x3000;

/// A contiguous span read or written with one bank selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankWindow {
    /// Bank selected while the window is accessed
    pub bank: u32,
    /// Cartridge address the window starts at
    pub address: u32,
    pub len: u64,
}

/// Bank geometry derived from a trusted header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub controller: ControllerFamily,
    pub rom_size: u64,
    pub ram_size: u64,
    pub rom_bank_count: u32,
    pub rom_bank_size: u64,
    pub ram_bank_count: u32,
    pub ram_bank_size: u64,
}

impl Geometry {
    /// Geometry for a cartridge in the given slot.
    pub fn for_platform(platform: Platform, header: &Header) -> Result<Self, CartError> {
        match platform {
            Platform::GameBoy => Self::new(header),
            Platform::GameBoyAdvance => Err(CartError::UnsupportedPlatform(platform)),
        }
    }

    /// Geometry of a classic cartridge.
    ///
    /// Fails with `InvalidHeader` when the logo does not match and with
    /// `MalformedHeader` when a size code is unknown.
    pub fn new(header: &Header) -> Result<Self, CartError> {
        if !header.is_logo_valid() {
            return Err(CartError::InvalidHeader);
        }
        let rom_size = header.rom_size()?;
        let ram_size = header.ram_size()?;
        let ram_bank_size = ram_size.min(RAM_BANK_SIZE);
        let ram_bank_count = if ram_size == 0 {
            0
        } else {
            (ram_size / ram_bank_size) as u32
        };

        Ok(Self {
            controller: header.controller,
            rom_size,
            ram_size,
            rom_bank_count: (rom_size / ROM_BANK_SIZE).max(1) as u32,
            rom_bank_size: ROM_BANK_SIZE,
            ram_bank_count,
            ram_bank_size,
        })
    }

    /// Whether the controller has ROM bank registers at all.
    pub fn switches_banks(&self) -> bool {
        self.controller != ControllerFamily::None
    }

    pub fn has_save_ram(&self) -> bool {
        self.ram_size > 0
    }

    /// MBC1 and MBC2 need a throwaway read before each RAM bank access.
    pub fn needs_ram_fix(&self) -> bool {
        matches!(
            self.controller,
            ControllerFamily::Mbc1 | ControllerFamily::Mbc2
        )
    }

    /// ROM windows in ascending bank order. They cover exactly `rom_size` bytes.
    pub fn rom_windows(&self) -> Vec<BankWindow> {
        let mut windows = vec![BankWindow {
            bank: 1,
            address: 0,
            len: self.rom_size.min(2 * ROM_BANK_SIZE),
        }];
        windows.extend((2..self.rom_bank_count).map(|bank| BankWindow {
            bank,
            address: SWITCHABLE_ROM_START,
            len: ROM_BANK_SIZE,
        }));
        windows
    }

    /// Save RAM windows in ascending bank order; empty without save RAM.
    pub fn ram_windows(&self) -> Vec<BankWindow> {
        (0..self.ram_bank_count)
            .map(|bank| BankWindow {
                bank,
                address: RAM_START,
                len: self.ram_bank_size,
            })
            .collect()
    }

    /// Register writes that map ROM `bank` into the switchable window.
    ///
    /// MBC1 stays in mode 0 here, where the controller turns a low bank
    /// number of 0 into 1. Banks 0x20, 0x40 and 0x60 therefore read back as
    /// 0x21, 0x41 and 0x61, so a full dump of an MBC1 cartridge over 512 KB
    /// is only correct outside those three banks.
    ///
    /// On carts with more than 256 banks the ninth bank bit is written on
    /// every switch. It survives between requests, so leaving it set would
    /// map every low bank 256 banks too high on the next pass.
    pub fn select_rom_bank(&self, bank: u32) -> Vec<AddressCommand> {
        match self.controller {
            ControllerFamily::None => Vec::new(),
            ControllerFamily::Mbc1 => vec![
                AddressCommand::set_bank(MBC1_MODE_ADDRESS, 0),
                AddressCommand::set_bank(RAM_BANK_ADDRESS, bank >> 5),
                AddressCommand::set_bank(MBC1_LOW_ADDRESS, bank & 0x1F),
            ],
            _ => {
                let mut commands = vec![AddressCommand::set_bank(ROM_BANK_ADDRESS, bank)];
                if bank >= 0x100 {
                    commands.push(AddressCommand::set_bank(ROM_BANK_HIGH_ADDRESS, 1));
                } else if self.rom_bank_count > 0x100 {
                    commands.push(AddressCommand::set_bank(ROM_BANK_HIGH_ADDRESS, 0));
                }
                commands
            }
        }
    }

    /// Register writes that map RAM `bank` into the RAM window.
    pub fn select_ram_bank(&self, bank: u32) -> Vec<AddressCommand> {
        match self.controller {
            ControllerFamily::None | ControllerFamily::Mbc2 => Vec::new(),
            ControllerFamily::Mbc1 => vec![
                AddressCommand::set_bank(MBC1_MODE_ADDRESS, 1),
                AddressCommand::set_bank(RAM_BANK_ADDRESS, bank),
            ],
            _ => vec![AddressCommand::set_bank(RAM_BANK_ADDRESS, bank)],
        }
    }

    /// Enable or disable access to save RAM.
    pub fn toggle_ram(enabled: bool) -> AddressCommand {
        AddressCommand::set_bank(
            RAM_ENABLE_ADDRESS,
            if enabled { RAM_ENABLE } else { RAM_DISABLE },
        )
    }
}

#[cfg(test)]
#[path = "tests/geometry_tests.rs"]
mod tests;
