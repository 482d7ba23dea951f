//! Cartridge type, controller family, and memory size tables.
//!
//! Values come from the header bytes at 0x0147 (cartridge type),
//! 0x0148 (ROM size code) and 0x0149 (RAM size code).

use serde::{Deserialize, Serialize};

/// Memory bank controller family fitted to a cartridge.
///
/// Only the family matters to the dumper: it decides which control
/// registers select ROM and RAM banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerFamily {
    /// No controller: 32 KB of ROM mapped directly
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
    Mbc6,
    Mbc7,
    Mmm01,
    PocketCamera,
    BandaiTama5,
    HuC1,
    HuC3,
    /// A cartridge type code with no known controller
    Unknown(u8),
}

impl ControllerFamily {
    /// Controller family for a cartridge type code.
    pub fn from_cartridge_type(code: u8) -> Self {
        match code {
            0x00 | 0x08 | 0x09 => Self::None,
            0x01..=0x03 => Self::Mbc1,
            0x05 | 0x06 => Self::Mbc2,
            0x0B..=0x0D => Self::Mmm01,
            0x0F..=0x13 => Self::Mbc3,
            0x19..=0x1E => Self::Mbc5,
            0x20 => Self::Mbc6,
            0x22 => Self::Mbc7,
            0xFC => Self::PocketCamera,
            0xFD => Self::BandaiTama5,
            0xFE => Self::HuC3,
            0xFF => Self::HuC1,
            other => Self::Unknown(other),
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Mbc1 => "MBC1",
            Self::Mbc2 => "MBC2",
            Self::Mbc3 => "MBC3",
            Self::Mbc5 => "MBC5",
            Self::Mbc6 => "MBC6",
            Self::Mbc7 => "MBC7",
            Self::Mmm01 => "MMM01",
            Self::PocketCamera => "Pocket Camera",
            Self::BandaiTama5 => "Bandai TAMA5",
            Self::HuC1 => "HuC1",
            Self::HuC3 => "HuC3",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// MBC2 carries 512 half-bytes of RAM inside the controller itself.
    pub fn has_builtin_ram(&self) -> bool {
        matches!(self, Self::Mbc2)
    }
}

impl std::fmt::Display for ControllerFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown (0x{:02X})", code),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Human-readable name of a cartridge type code.
pub fn cartridge_type_name(code: u8) -> &'static str {
    match code {
        0x00 => "ROM ONLY",
        0x01 => "MBC1",
        0x02 => "MBC1+RAM",
        0x03 => "MBC1+RAM+BATTERY",
        0x05 => "MBC2",
        0x06 => "MBC2+BATTERY",
        0x08 => "ROM+RAM",
        0x09 => "ROM+RAM+BATTERY",
        0x0B => "MMM01",
        0x0C => "MMM01+RAM",
        0x0D => "MMM01+RAM+BATTERY",
        0x0F => "MBC3+TIMER+BATTERY",
        0x10 => "MBC3+TIMER+RAM+BATTERY",
        0x11 => "MBC3",
        0x12 => "MBC3+RAM",
        0x13 => "MBC3+RAM+BATTERY",
        0x19 => "MBC5",
        0x1A => "MBC5+RAM",
        0x1B => "MBC5+RAM+BATTERY",
        0x1C => "MBC5+RUMBLE",
        0x1D => "MBC5+RUMBLE+RAM",
        0x1E => "MBC5+RUMBLE+RAM+BATTERY",
        0x20 => "MBC6",
        0x22 => "MBC7+SENSOR+RUMBLE+RAM+BATTERY",
        0xFC => "POCKET CAMERA",
        0xFD => "BANDAI TAMA5",
        0xFE => "HuC3",
        0xFF => "HuC1+RAM+BATTERY",
        _ => "Unknown",
    }
}

/// Whether a cartridge type code declares a battery (i.e. persistent saves).
pub fn has_battery(code: u8) -> bool {
    matches!(
        code,
        0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0x22 | 0xFF
    )
}

/// ROM size in bytes for a ROM size code, `None` if the code is invalid.
pub fn rom_size(code: u8) -> Option<u64> {
    match code {
        0x00..=0x08 => Some((32 * 1024) << code),
        _ => None,
    }
}

/// RAM size in bytes for a RAM size code, `None` if the code is invalid.
///
/// Code 0x01 is listed as "unused" by Nintendo and is treated as no RAM.
pub fn ram_size(code: u8) -> Option<u64> {
    match code {
        0x00 | 0x01 => Some(0),
        0x02 => Some(8 * 1024),
        0x03 => Some(32 * 1024),
        0x04 => Some(128 * 1024),
        0x05 => Some(64 * 1024),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_family_ranges() {
        assert_eq!(ControllerFamily::from_cartridge_type(0x00), ControllerFamily::None);
        assert_eq!(ControllerFamily::from_cartridge_type(0x03), ControllerFamily::Mbc1);
        assert_eq!(ControllerFamily::from_cartridge_type(0x06), ControllerFamily::Mbc2);
        assert_eq!(ControllerFamily::from_cartridge_type(0x10), ControllerFamily::Mbc3);
        assert_eq!(ControllerFamily::from_cartridge_type(0x1E), ControllerFamily::Mbc5);
        assert_eq!(ControllerFamily::from_cartridge_type(0xFE), ControllerFamily::HuC3);
        assert_eq!(
            ControllerFamily::from_cartridge_type(0x04),
            ControllerFamily::Unknown(0x04)
        );
    }

    #[test]
    fn test_battery_flags() {
        assert!(has_battery(0x03));
        assert!(has_battery(0x1B));
        assert!(!has_battery(0x01));
        assert!(!has_battery(0x19));
    }

    #[test]
    fn test_unknown_display_includes_code() {
        assert_eq!(ControllerFamily::Unknown(0x42).to_string(), "Unknown (0x42)");
        assert_eq!(ControllerFamily::Mbc5.to_string(), "MBC5");
    }
}
