//! Game Boy cartridge header parsing.
//!
//! The header lives at 0x0100..0x0150 of the ROM. Parsing only fails when
//! the buffer is too short; field values that make no sense are kept as-is
//! so callers can decide what to trust. Nothing in a header should be used
//! for bank geometry unless [`Header::is_logo_valid`] holds.

use serde::{Deserialize, Serialize};

use crate::cartridge::{self, ControllerFamily};
use crate::error::HeaderError;
use crate::platform::Platform;
use crate::region::Region;
use crate::util::read_ascii_fixed;

/// Number of bytes from address 0 needed to parse a header.
pub const HEADER_LEN: usize = 0x0150;

const LOGO_OFFSET: usize = 0x0104;
const TITLE_OFFSET: usize = 0x0134;
const CGB_FLAG_OFFSET: usize = 0x0143;
const NEW_LICENSEE_OFFSET: usize = 0x0144;
const SGB_FLAG_OFFSET: usize = 0x0146;
const CARTRIDGE_TYPE_OFFSET: usize = 0x0147;
const ROM_SIZE_OFFSET: usize = 0x0148;
const RAM_SIZE_OFFSET: usize = 0x0149;
const DESTINATION_OFFSET: usize = 0x014A;
const OLD_LICENSEE_OFFSET: usize = 0x014B;
const VERSION_OFFSET: usize = 0x014C;
const HEADER_CHECKSUM_OFFSET: usize = 0x014D;
const GLOBAL_CHECKSUM_OFFSET: usize = 0x014E;

/// The boot logo every licensed cartridge carries at 0x0104.
pub const NINTENDO_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99,
    0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

/// Game Boy Color support declared at 0x0143.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CgbMode {
    /// Original Game Boy only
    Dmg,
    /// Runs on both, with color enhancements
    Compatible,
    /// Game Boy Color only
    Exclusive,
}

impl CgbMode {
    fn from_flag(flag: u8) -> Self {
        match flag {
            0x80 => Self::Compatible,
            0xC0 => Self::Exclusive,
            _ => Self::Dmg,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dmg => "Game Boy",
            Self::Compatible => "Game Boy Color (Compatible)",
            Self::Exclusive => "Game Boy Color (Exclusive)",
        }
    }
}

/// Publisher code, either the old single byte or the newer two-letter form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Licensee {
    Old(u8),
    New(String),
}

impl std::fmt::Display for Licensee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Old(code) => write!(f, "0x{:02X}", code),
            Self::New(code) => write!(f, "\"{}\"", code),
        }
    }
}

/// A parsed cartridge header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Internal title (11 characters on color games, 16 otherwise)
    pub title: String,
    pub cgb_mode: CgbMode,
    /// Super Game Boy functions enabled
    pub sgb: bool,
    /// Raw cartridge type code at 0x0147
    pub cartridge_type: u8,
    pub controller: ControllerFamily,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub region: Region,
    pub licensee: Licensee,
    pub version: u8,
    /// Header checksum as stored in the ROM
    pub header_checksum: u8,
    /// Global checksum as stored in the ROM
    pub global_checksum: u16,
    logo_valid: bool,
    header_checksum_valid: bool,
}

impl Header {
    /// Parse a header from a buffer that starts at cartridge address 0.
    ///
    /// The buffer must hold at least [`HEADER_LEN`] bytes.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_LEN {
            return Err(HeaderError::TooSmall {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }

        let cgb_flag = buf[CGB_FLAG_OFFSET];
        let cgb_mode = CgbMode::from_flag(cgb_flag);
        let title_len = if cgb_mode == CgbMode::Dmg { 16 } else { 11 };
        let title = read_ascii_fixed(&buf[TITLE_OFFSET..TITLE_OFFSET + title_len]);

        let cartridge_type = buf[CARTRIDGE_TYPE_OFFSET];
        let old_licensee = buf[OLD_LICENSEE_OFFSET];
        let licensee = if old_licensee == 0x33 {
            Licensee::New(read_ascii_fixed(
                &buf[NEW_LICENSEE_OFFSET..NEW_LICENSEE_OFFSET + 2],
            ))
        } else {
            Licensee::Old(old_licensee)
        };

        let region = match buf[DESTINATION_OFFSET] {
            0x00 => Region::Japan,
            0x01 => Region::World,
            _ => Region::Unknown,
        };

        let header_checksum = buf[HEADER_CHECKSUM_OFFSET];

        Ok(Self {
            title,
            cgb_mode,
            sgb: buf[SGB_FLAG_OFFSET] == 0x03,
            cartridge_type,
            controller: ControllerFamily::from_cartridge_type(cartridge_type),
            rom_size_code: buf[ROM_SIZE_OFFSET],
            ram_size_code: buf[RAM_SIZE_OFFSET],
            region,
            licensee,
            version: buf[VERSION_OFFSET],
            header_checksum,
            global_checksum: u16::from_be_bytes([
                buf[GLOBAL_CHECKSUM_OFFSET],
                buf[GLOBAL_CHECKSUM_OFFSET + 1],
            ]),
            logo_valid: buf[LOGO_OFFSET..LOGO_OFFSET + NINTENDO_LOGO.len()] == NINTENDO_LOGO,
            header_checksum_valid: compute_header_checksum(buf) == header_checksum,
        })
    }

    /// Whether the boot logo matched. An invalid logo means no cartridge is
    /// inserted, or it is not making contact.
    pub fn is_logo_valid(&self) -> bool {
        self.logo_valid
    }

    pub fn is_header_checksum_valid(&self) -> bool {
        self.header_checksum_valid
    }

    /// ROM size in bytes.
    pub fn rom_size(&self) -> Result<u64, HeaderError> {
        cartridge::rom_size(self.rom_size_code).ok_or_else(|| {
            HeaderError::malformed(format!("unknown ROM size code 0x{:02X}", self.rom_size_code))
        })
    }

    /// Save RAM size in bytes, accounting for the RAM built into MBC2.
    pub fn ram_size(&self) -> Result<u64, HeaderError> {
        if self.controller.has_builtin_ram() {
            return Ok(512);
        }
        cartridge::ram_size(self.ram_size_code).ok_or_else(|| {
            HeaderError::malformed(format!("unknown RAM size code 0x{:02X}", self.ram_size_code))
        })
    }

    pub fn cartridge_type_name(&self) -> &'static str {
        cartridge::cartridge_type_name(self.cartridge_type)
    }

    pub fn has_battery(&self) -> bool {
        cartridge::has_battery(self.cartridge_type)
    }

    /// Game Boy and Game Boy Color cartridges share the classic slot.
    pub fn platform(&self) -> Platform {
        Platform::GameBoy
    }
}

/// Compute the header checksum over 0x0134..=0x014C.
///
/// `buf` must hold at least [`HEADER_LEN`] bytes.
pub fn compute_header_checksum(buf: &[u8]) -> u8 {
    buf[TITLE_OFFSET..=VERSION_OFFSET]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1))
}

/// Compute the global checksum: the sum of every ROM byte except the two
/// checksum bytes themselves.
pub fn compute_global_checksum(rom: &[u8]) -> u16 {
    rom.iter()
        .enumerate()
        .filter(|(i, _)| *i != GLOBAL_CHECKSUM_OFFSET && *i != GLOBAL_CHECKSUM_OFFSET + 1)
        .fold(0u16, |acc, (_, &b)| acc.wrapping_add(b as u16))
}

/// Check a full ROM image against the global checksum in its own header.
pub fn verify_global_checksum(rom: &[u8]) -> bool {
    if rom.len() < HEADER_LEN {
        return false;
    }
    let stored = u16::from_be_bytes([rom[GLOBAL_CHECKSUM_OFFSET], rom[GLOBAL_CHECKSUM_OFFSET + 1]]);
    compute_global_checksum(rom) == stored
}

#[cfg(test)]
#[path = "tests/header_tests.rs"]
mod tests;
