//! Flash chip profiles for reproduction and development cartridges.
//!
//! Only chips with a known JEDEC command sequence can be erased or
//! programmed. The sequences here are the AMD-style 0x555/0x2AA unlock
//! used by the common 29F/29LV parts on flash carts.

use crate::codec::{AddressCommand, WritePin};
use crate::error::CartError;

/// Command that returns the chip to read-array mode.
pub const RESET: (u32, u8) = (0x0000, 0xF0);

/// Byte the chip returns on a status poll once an erase has finished.
pub const ERASE_DONE: u8 = 0xFF;

/// JEDEC command sequences for one chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecSequence {
    pub reset: (u32, u8),
    pub chip_erase: [(u32, u8); 6],
    pub program: [(u32, u8); 3],
}

const AMD_STYLE: JedecSequence = JedecSequence {
    reset: RESET,
    chip_erase: [
        (0x555, 0xAA),
        (0x2AA, 0x55),
        (0x555, 0x80),
        (0x555, 0xAA),
        (0x2AA, 0x55),
        (0x555, 0x10),
    ],
    program: [(0x555, 0xAA), (0x2AA, 0x55), (0x555, 0xA0)],
};

/// Registered chips, by lowercase part name.
const REGISTRY: &[(&str, &JedecSequence)] = &[
    ("am29f016b", &AMD_STYLE),
    ("am29f080b", &AMD_STYLE),
    ("s29gl032", &AMD_STYLE),
    ("29lv160", &AMD_STYLE),
];

/// The chip name used when none is configured.
pub const DEFAULT_CHIP: &str = "am29f016b";

/// Look up the command sequences for a chip.
pub fn jedec_sequence(chip: &str) -> Option<&'static JedecSequence> {
    let chip = chip.trim().to_ascii_lowercase();
    REGISTRY
        .iter()
        .find(|(name, _)| *name == chip)
        .map(|(_, seq)| *seq)
}

/// Names of every registered chip.
pub fn registered_chips() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// The configured flash chip and how its write-enable line is wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashProfile {
    pub chip: String,
    /// Pin to select before flash commands; `None` leaves the adapter default
    pub we_pin: Option<WritePin>,
}

impl Default for FlashProfile {
    fn default() -> Self {
        Self {
            chip: DEFAULT_CHIP.to_string(),
            we_pin: None,
        }
    }
}

impl FlashProfile {
    /// The chip's command sequences, or `UnsupportedChipset`.
    pub fn sequence(&self) -> Result<&'static JedecSequence, CartError> {
        jedec_sequence(&self.chip).ok_or_else(|| CartError::UnsupportedChipset(self.chip.clone()))
    }
}

impl JedecSequence {
    pub fn reset_command(&self) -> AddressCommand {
        AddressCommand::flash_byte(self.reset.0, self.reset.1)
    }

    pub fn erase_commands(&self) -> Vec<AddressCommand> {
        self.chip_erase
            .iter()
            .map(|&(address, byte)| AddressCommand::flash_byte(address, byte))
            .collect()
    }

    pub fn program_commands(&self) -> Vec<AddressCommand> {
        self.program
            .iter()
            .map(|&(address, byte)| AddressCommand::flash_byte(address, byte))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(jedec_sequence("AM29F016B").is_some());
        assert!(jedec_sequence(" 29lv160 ").is_some());
        assert!(jedec_sequence("mx29f1615").is_none());
        assert!(registered_chips().any(|c| c == DEFAULT_CHIP));
    }

    #[test]
    fn test_unregistered_chip_is_unsupported() {
        let profile = FlashProfile {
            chip: "sst39sf040".into(),
            we_pin: None,
        };
        assert!(matches!(
            profile.sequence(),
            Err(CartError::UnsupportedChipset(name)) if name == "sst39sf040"
        ));
    }

    #[test]
    fn test_erase_sequence_order() {
        let seq = FlashProfile::default().sequence().unwrap();
        let cmds = seq.erase_commands();
        assert_eq!(cmds.len(), 6);
        assert_eq!(cmds[0], AddressCommand::flash_byte(0x555, 0xAA));
        assert_eq!(cmds[5], AddressCommand::flash_byte(0x555, 0x10));
        assert_eq!(
            seq.program_commands()[2],
            AddressCommand::flash_byte(0x555, 0xA0)
        );
        assert_eq!(seq.reset_command(), AddressCommand::flash_byte(0, 0xF0));
    }
}
