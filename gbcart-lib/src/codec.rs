//! ASCII command protocol spoken by GBxCart-style adapters.
//!
//! Every command is a short ASCII frame. Addresses are uppercase hex
//! terminated by a NUL byte; bank numbers are written in a caller-chosen
//! radix (decimal unless stated otherwise). Read payloads arrive in
//! 64-byte pages, acknowledgements and flash status in single bytes.

use std::time::Duration;

use gbcart_core::Platform;
use serde::{Deserialize, Serialize};

use crate::error::CartError;

/// Size of one read or write packet.
pub const PAGE_SIZE: usize = 64;

/// Size of a write acknowledgement.
pub const ACK_SIZE: usize = 1;

/// Size of one flash status poll response.
pub const STATUS_SIZE: usize = 1;

/// Byte the adapter sends after accepting a `W` or `F` command.
pub const ACK: u8 = b'1';

/// Pause the adapter needs between the two halves of a bank switch.
pub const SETTLE_DELAY: Duration = Duration::from_micros(250);

/// Radix bank numbers are written in unless a command says otherwise.
pub const DEFAULT_BANK_RADIX: u32 = 10;

/// Cartridge pin wired to the flash chip's write-enable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePin {
    /// The audio pin (pin 31), used by most reproduction flash carts
    Audio,
    /// The regular WR pin
    Wr,
}

impl WritePin {
    fn code(&self) -> u8 {
        match self {
            Self::Audio => b'A',
            Self::Wr => b'W',
        }
    }
}

/// One protocol step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressCommand {
    /// End the current read stream
    Stop,
    /// Request the next page (or status byte) of the current stream
    Continue,
    /// Move the adapter's address cursor
    GoTo(u32),
    /// Write `bank` to the controller register at `address`
    SetBank { address: u32, bank: u32, radix: u32 },
    /// Start streaming pages from the cursor
    Read,
    /// Write one 64-byte page at the cursor
    Write(Vec<u8>),
    /// Write a single byte straight to the flash chip
    FlashByte { address: u32, byte: u8 },
    /// Put the adapter in cartridge mode for the current platform
    RomMode,
    /// Select the flash write-enable pin
    PinMode(WritePin),
}

/// An encoded frame and how long to wait after sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub settle_after: Option<Duration>,
}

impl Frame {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            settle_after: None,
        }
    }
}

impl AddressCommand {
    /// A bank switch with the bank number written in decimal.
    pub fn set_bank(address: u32, bank: u32) -> Self {
        Self::SetBank {
            address,
            bank,
            radix: DEFAULT_BANK_RADIX,
        }
    }

    pub fn flash_byte(address: u32, byte: u8) -> Self {
        Self::FlashByte { address, byte }
    }

    /// Whether the adapter answers this command with an [`ACK`] byte.
    pub fn expects_ack(&self) -> bool {
        matches!(self, Self::Write(_) | Self::FlashByte { .. })
    }

    /// Serialize into the frames sent on the wire, in order.
    pub fn encode(&self, platform: Platform) -> Vec<Frame> {
        match self {
            Self::Stop => vec![Frame::new(b"0".to_vec())],
            Self::Continue => vec![Frame::new(b"1".to_vec())],
            Self::GoTo(address) => vec![Frame::new(terminated(b'A', &format!("{address:X}")))],
            Self::SetBank {
                address,
                bank,
                radix,
            } => vec![
                Frame {
                    bytes: terminated(b'B', &format!("{address:X}")),
                    settle_after: Some(SETTLE_DELAY),
                },
                Frame::new(terminated(b'B', &format_radix(*bank, *radix))),
            ],
            Self::Read => vec![Frame::new(vec![match platform {
                Platform::GameBoy => b'R',
                Platform::GameBoyAdvance => b'r',
            }])],
            Self::Write(page) => {
                let mut bytes = Vec::with_capacity(1 + page.len());
                bytes.push(b'W');
                bytes.extend_from_slice(page);
                vec![Frame::new(bytes)]
            }
            Self::FlashByte { address, byte } => {
                let mut bytes = terminated(b'F', &format!("{address:X}"));
                bytes.extend_from_slice(format!("{byte:X}").as_bytes());
                bytes.push(0);
                vec![Frame::new(bytes)]
            }
            Self::RomMode => vec![Frame::new(vec![match platform {
                Platform::GameBoy => b'G',
                Platform::GameBoyAdvance => b'g',
            }])],
            Self::PinMode(pin) => vec![Frame::new(vec![b'P', pin.code()])],
        }
    }
}

fn terminated(prefix: u8, digits: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(digits.len() + 2);
    bytes.push(prefix);
    bytes.extend_from_slice(digits.as_bytes());
    bytes.push(0);
    bytes
}

/// Format `value` in `radix` with uppercase digits.
///
/// The radix is clamped to 2..=36.
pub fn format_radix(mut value: u32, radix: u32) -> String {
    let radix = radix.clamp(2, 36);
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        if let Some(c) = char::from_digit(value % radix, radix) {
            digits.push(c.to_ascii_uppercase());
        }
        value /= radix;
    }
    digits.iter().rev().collect()
}

/// Longest digit string any numeric field may carry.
const MAX_DIGITS: usize = 10;

#[derive(Debug, Default)]
enum DecodeState {
    #[default]
    Idle,
    GoTo(String),
    Bank(String),
    FlashAddress(String),
    FlashData {
        address: u32,
        digits: String,
    },
    Write(Vec<u8>),
    Pin,
}

/// Incremental parser for the adapter side of the protocol.
///
/// Feed it the bytes a host sends and it yields each command once its
/// last byte has arrived. The two frames of a bank switch come back as a
/// single [`AddressCommand::SetBank`]; the bank number is read as decimal.
#[derive(Debug, Default)]
pub struct CommandDecoder {
    state: DecodeState,
    bank_address: Option<u32>,
}

impl CommandDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any half-parsed command.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Decode every complete command in `bytes`.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<AddressCommand>, CartError> {
        let mut commands = Vec::new();
        for &byte in bytes {
            if let Some(command) = self.push(byte)? {
                commands.push(command);
            }
        }
        Ok(commands)
    }

    /// Advance the parser by one byte.
    pub fn push(&mut self, byte: u8) -> Result<Option<AddressCommand>, CartError> {
        match std::mem::take(&mut self.state) {
            DecodeState::Idle => self.start(byte),
            DecodeState::GoTo(digits) => match collect(digits, byte)? {
                Digits::Pending(digits) => {
                    self.state = DecodeState::GoTo(digits);
                    Ok(None)
                }
                Digits::Done(digits) => Ok(Some(AddressCommand::GoTo(parse_hex(&digits)?))),
            },
            DecodeState::Bank(digits) => match collect(digits, byte)? {
                Digits::Pending(digits) => {
                    self.state = DecodeState::Bank(digits);
                    Ok(None)
                }
                Digits::Done(digits) => match self.bank_address.take() {
                    None => {
                        self.bank_address = Some(parse_hex(&digits)?);
                        Ok(None)
                    }
                    Some(address) => Ok(Some(AddressCommand::SetBank {
                        address,
                        bank: parse_radix(&digits, DEFAULT_BANK_RADIX)?,
                        radix: DEFAULT_BANK_RADIX,
                    })),
                },
            },
            DecodeState::FlashAddress(digits) => {
                match collect(digits, byte)? {
                    Digits::Pending(digits) => self.state = DecodeState::FlashAddress(digits),
                    Digits::Done(digits) => {
                        self.state = DecodeState::FlashData {
                            address: parse_hex(&digits)?,
                            digits: String::new(),
                        }
                    }
                }
                Ok(None)
            }
            DecodeState::FlashData { address, digits } => match collect(digits, byte)? {
                Digits::Pending(digits) => {
                    self.state = DecodeState::FlashData { address, digits };
                    Ok(None)
                }
                Digits::Done(digits) => {
                    let value = parse_hex(&digits)?;
                    let byte = u8::try_from(value).map_err(|_| {
                        CartError::protocol(format!("flash data 0x{value:X} is wider than a byte"))
                    })?;
                    Ok(Some(AddressCommand::FlashByte { address, byte }))
                }
            },
            DecodeState::Write(mut page) => {
                page.push(byte);
                if page.len() == PAGE_SIZE {
                    Ok(Some(AddressCommand::Write(page)))
                } else {
                    self.state = DecodeState::Write(page);
                    Ok(None)
                }
            }
            DecodeState::Pin => match byte {
                b'A' => Ok(Some(AddressCommand::PinMode(WritePin::Audio))),
                b'W' => Ok(Some(AddressCommand::PinMode(WritePin::Wr))),
                other => Err(CartError::protocol(format!(
                    "unknown pin selector 0x{other:02X}"
                ))),
            },
        }
    }

    fn start(&mut self, byte: u8) -> Result<Option<AddressCommand>, CartError> {
        let command = match byte {
            b'0' => Some(AddressCommand::Stop),
            b'1' => Some(AddressCommand::Continue),
            b'R' | b'r' => Some(AddressCommand::Read),
            b'G' | b'g' => Some(AddressCommand::RomMode),
            b'A' => {
                self.state = DecodeState::GoTo(String::new());
                None
            }
            b'B' => {
                self.state = DecodeState::Bank(String::new());
                None
            }
            b'F' => {
                self.state = DecodeState::FlashAddress(String::new());
                None
            }
            b'W' => {
                self.state = DecodeState::Write(Vec::with_capacity(PAGE_SIZE));
                None
            }
            b'P' => {
                self.state = DecodeState::Pin;
                None
            }
            other => {
                return Err(CartError::protocol(format!(
                    "unexpected command byte 0x{other:02X}"
                )));
            }
        };
        Ok(command)
    }
}

enum Digits {
    Pending(String),
    Done(String),
}

fn collect(mut digits: String, byte: u8) -> Result<Digits, CartError> {
    if byte == 0 {
        return Ok(Digits::Done(digits));
    }
    if digits.len() >= MAX_DIGITS {
        return Err(CartError::protocol("numeric field is missing its terminator"));
    }
    digits.push(byte as char);
    Ok(Digits::Pending(digits))
}

fn parse_hex(digits: &str) -> Result<u32, CartError> {
    parse_radix(digits, 16)
}

fn parse_radix(digits: &str, radix: u32) -> Result<u32, CartError> {
    u32::from_str_radix(digits, radix)
        .map_err(|_| CartError::protocol(format!("bad base-{radix} number {digits:?}")))
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
