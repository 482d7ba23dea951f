//! In-memory adapter and cartridge for tests and dry runs.
//!
//! [`SimulatedCartridge`] implements [`Transport`] by decoding the host's
//! command stream and answering the way a real adapter with a cartridge
//! inserted would. It models the bank registers of the common controllers,
//! save RAM behind its enable register, and optionally an AMD-style NOR
//! flash chip in place of the mask ROM.

use std::io;
use std::sync::Arc;

use gbcart_core::header::{HEADER_LEN, compute_global_checksum, compute_header_checksum};
use gbcart_core::{ControllerFamily, Header, NINTENDO_LOGO, rom_size};
use parking_lot::Mutex;

use crate::codec::{ACK, AddressCommand, CommandDecoder, PAGE_SIZE};
use crate::error::CartError;
use crate::flash::{DEFAULT_CHIP, ERASE_DONE, RESET, jedec_sequence};
use crate::geometry::{RAM_BANK_SIZE, RAM_START, ROM_BANK_SIZE};
use crate::link::{Inbox, Transport};

/// Status byte a busy flash chip returns while erasing.
const ERASE_BUSY: u8 = 0x4C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashState {
    ReadArray,
    Program,
    Erasing { busy_polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Idle,
    Pages,
    Status,
}

#[derive(Debug, Default)]
struct Registers {
    ram_enabled: bool,
    rom_low: u32,
    rom_high: u32,
    ram_bank: u32,
    mode: u32,
}

#[derive(Debug)]
struct SimState {
    rom: Vec<u8>,
    ram: Vec<u8>,
    controller: ControllerFamily,
    registers: Registers,
    cursor: u32,
    stream: Stream,

    flash: bool,
    flash_state: FlashState,
    erase_busy_polls: u32,
    unlock: Vec<(u32, u8)>,

    attached: bool,
    mute: bool,
    remove_after_reads: Option<usize>,
    reads: usize,

    inbox: Option<Arc<Inbox>>,
    decoder: CommandDecoder,
    log: Vec<AddressCommand>,
}

/// A simulated adapter with a cartridge inserted.
///
/// Clones share the same cartridge, so a test can keep one clone for
/// inspection while the link owns another.
#[derive(Debug, Clone)]
pub struct SimulatedCartridge {
    shared: Arc<Mutex<SimState>>,
}

impl SimulatedCartridge {
    /// A cartridge holding `rom`. The controller and save RAM size come
    /// from the ROM's header; an unreadable header means no controller
    /// and no RAM.
    pub fn new(rom: Vec<u8>) -> Self {
        let header = Header::parse(&rom).ok().filter(|h| h.is_logo_valid());
        let controller = header
            .as_ref()
            .map(|h| h.controller)
            .unwrap_or(ControllerFamily::None);
        let ram_len = header
            .as_ref()
            .and_then(|h| h.ram_size().ok())
            .unwrap_or(0) as usize;
        // Unprogrammed RAM powers up as 0xFF on most carts
        let ram = vec![0xFF; ram_len];

        Self {
            shared: Arc::new(Mutex::new(SimState {
                rom,
                ram,
                controller,
                registers: Registers::default(),
                cursor: 0,
                stream: Stream::Idle,
                flash: false,
                flash_state: FlashState::ReadArray,
                erase_busy_polls: 0,
                unlock: Vec::new(),
                attached: true,
                mute: false,
                remove_after_reads: None,
                reads: 0,
                inbox: None,
                decoder: CommandDecoder::new(),
                log: Vec::new(),
            })),
        }
    }

    /// A blank MBC5 flash cartridge of `size` bytes that reports busy
    /// for `busy_polls` status polls per erase.
    pub fn blank_flash(size: usize, busy_polls: u32) -> Self {
        Self::new(vec![0xFF; size])
            .with_controller(ControllerFamily::Mbc5)
            .with_flash(busy_polls)
    }

    /// Replace the save RAM contents (and size).
    pub fn with_ram(self, ram: Vec<u8>) -> Self {
        self.shared.lock().ram = ram;
        self
    }

    pub fn with_controller(self, controller: ControllerFamily) -> Self {
        self.shared.lock().controller = controller;
        self
    }

    /// Back the ROM with a NOR flash chip that answers erase and program
    /// sequences.
    pub fn with_flash(self, busy_polls: u32) -> Self {
        {
            let mut state = self.shared.lock();
            state.flash = true;
            state.erase_busy_polls = busy_polls;
        }
        self
    }

    /// Vanish when the host issues read trigger number `reads + 1`.
    pub fn remove_after_reads(self, reads: usize) -> Self {
        self.shared.lock().remove_after_reads = Some(reads);
        self
    }

    /// Unplug the adapter: opening fails and an open port dies.
    pub fn detach(&self) {
        let mut state = self.shared.lock();
        state.attached = false;
        if let Some(inbox) = state.inbox.take() {
            inbox.mark_removed();
        }
    }

    /// Plug the adapter back in. A pending `remove_after_reads` is dropped.
    pub fn attach(&self) {
        let mut state = self.shared.lock();
        state.attached = true;
        state.remove_after_reads = None;
    }

    /// Stop answering anything, as a hung adapter would.
    pub fn set_mute(&self, mute: bool) {
        self.shared.lock().mute = mute;
    }

    pub fn rom(&self) -> Vec<u8> {
        self.shared.lock().rom.clone()
    }

    pub fn ram(&self) -> Vec<u8> {
        self.shared.lock().ram.clone()
    }

    /// Every command decoded so far, in arrival order.
    pub fn commands(&self) -> Vec<AddressCommand> {
        self.shared.lock().log.clone()
    }

    pub fn count_commands(&self, wanted: &AddressCommand) -> usize {
        self.shared.lock().log.iter().filter(|c| *c == wanted).count()
    }

    pub fn clear_commands(&self) {
        self.shared.lock().log.clear();
    }
}

impl Transport for SimulatedCartridge {
    fn open(&mut self, inbox: Arc<Inbox>) -> Result<(), CartError> {
        let mut state = self.shared.lock();
        if !state.attached {
            return Err(CartError::DeviceNotFound("simulated adapter is detached".into()));
        }
        state.decoder.reset();
        state.stream = Stream::Idle;
        state.inbox = Some(inbox);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.lock().inbox.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.shared.lock();
        if state.inbox.is_none() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        for &byte in bytes {
            match state.decoder.push(byte) {
                Ok(Some(command)) => state.execute(command),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("simulated adapter ignored input: {}", e);
                    state.decoder.reset();
                }
            }
            if state.inbox.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shared.lock().inbox = None;
    }

    fn describe(&self) -> String {
        "simulated adapter".to_string()
    }
}

impl SimState {
    fn execute(&mut self, command: AddressCommand) {
        self.log.push(command.clone());
        match command {
            AddressCommand::Stop => self.stream = Stream::Idle,
            AddressCommand::Continue => match self.stream {
                Stream::Pages => self.serve_page(),
                Stream::Status => self.serve_status(),
                Stream::Idle => {}
            },
            AddressCommand::GoTo(address) => self.cursor = address,
            AddressCommand::Read => self.trigger_read(),
            AddressCommand::SetBank { address, bank, .. } => self.bus_write(address, bank),
            AddressCommand::Write(page) => {
                self.write_page(&page);
                self.reply(&[ACK]);
            }
            AddressCommand::FlashByte { address, byte } => {
                self.flash_command(address, byte);
                self.reply(&[ACK]);
            }
            AddressCommand::RomMode | AddressCommand::PinMode(_) => {}
        }
    }

    fn reply(&self, bytes: &[u8]) {
        if self.mute {
            return;
        }
        if let Some(inbox) = &self.inbox {
            inbox.deliver(bytes);
        }
    }

    fn trigger_read(&mut self) {
        if let Some(limit) = self.remove_after_reads
            && self.reads >= limit
        {
            log::debug!("simulated adapter removed after {} reads", self.reads);
            self.attached = false;
            if let Some(inbox) = self.inbox.take() {
                inbox.mark_removed();
            }
            return;
        }
        self.reads += 1;
        if matches!(self.flash_state, FlashState::Erasing { .. }) {
            self.stream = Stream::Status;
            self.serve_status();
        } else {
            self.stream = Stream::Pages;
            self.serve_page();
        }
    }

    fn serve_page(&mut self) {
        let page: Vec<u8> = (0..PAGE_SIZE as u32)
            .map(|offset| self.bus_read(self.cursor.wrapping_add(offset)))
            .collect();
        self.cursor = self.cursor.wrapping_add(PAGE_SIZE as u32);
        self.reply(&page);
    }

    fn serve_status(&mut self) {
        let status = match self.flash_state {
            FlashState::Erasing { busy_polls: 0 } => {
                self.rom.fill(0xFF);
                self.flash_state = FlashState::ReadArray;
                self.stream = Stream::Pages;
                ERASE_DONE
            }
            FlashState::Erasing { busy_polls } => {
                self.flash_state = FlashState::Erasing {
                    busy_polls: busy_polls - 1,
                };
                ERASE_BUSY
            }
            _ => ERASE_DONE,
        };
        self.reply(&[status]);
    }

    fn rom_bank(&self) -> u32 {
        let r = &self.registers;
        match self.controller {
            ControllerFamily::None => 1,
            ControllerFamily::Mbc1 => (r.rom_high << 5) | r.rom_low.max(1),
            ControllerFamily::Mbc2 | ControllerFamily::Mbc3 => r.rom_low.max(1),
            _ => (r.rom_high << 8) | r.rom_low,
        }
    }

    fn ram_bank(&self) -> u32 {
        match self.controller {
            ControllerFamily::None | ControllerFamily::Mbc2 => 0,
            ControllerFamily::Mbc1 if self.registers.mode == 1 => self.registers.rom_high,
            ControllerFamily::Mbc1 => 0,
            _ => self.registers.ram_bank,
        }
    }

    fn rom_offset(&self, address: u32) -> Option<usize> {
        if self.rom.is_empty() {
            return None;
        }
        let offset = if address < 0x4000 {
            address as u64
        } else {
            self.rom_bank() as u64 * ROM_BANK_SIZE + (address as u64 - 0x4000)
        };
        Some((offset % self.rom.len() as u64) as usize)
    }

    fn ram_offset(&self, address: u32) -> Option<usize> {
        if self.ram.is_empty() || !self.registers.ram_enabled {
            return None;
        }
        let within = (address - RAM_START) as u64;
        let offset = match self.controller {
            ControllerFamily::Mbc2 => within & 0x1FF,
            _ => self.ram_bank() as u64 * RAM_BANK_SIZE + within,
        };
        Some((offset % self.ram.len() as u64) as usize)
    }

    fn bus_read(&self, address: u32) -> u8 {
        match address {
            0x0000..=0x7FFF => self.rom_offset(address).map_or(0xFF, |i| self.rom[i]),
            0xA000..=0xBFFF => self.ram_offset(address).map_or(0xFF, |i| self.ram[i]),
            _ => 0xFF,
        }
    }

    /// A host write into the ROM area lands in the controller registers.
    fn bus_write(&mut self, address: u32, value: u32) {
        let r = &mut self.registers;
        let enable = value & 0x0F == 0x0A;
        match (self.controller, address) {
            (ControllerFamily::Mbc2, 0x0000..=0x3FFF) => {
                if address & 0x100 != 0 {
                    r.rom_low = value & 0x0F;
                } else {
                    r.ram_enabled = enable;
                }
            }
            (_, 0x0000..=0x1FFF) => r.ram_enabled = enable,
            (ControllerFamily::Mbc1, 0x2000..=0x3FFF) => r.rom_low = value & 0x1F,
            (ControllerFamily::Mbc1, 0x4000..=0x5FFF) => r.rom_high = value & 0x03,
            (ControllerFamily::Mbc1, 0x6000..=0x7FFF) => r.mode = value & 0x01,
            (ControllerFamily::Mbc3, 0x2000..=0x3FFF) => r.rom_low = value & 0x7F,
            (ControllerFamily::None, _) => {}
            (_, 0x2000..=0x2FFF) => r.rom_low = value & 0xFF,
            (_, 0x3000..=0x3FFF) => r.rom_high = value & 0x01,
            (_, 0x4000..=0x5FFF) => r.ram_bank = value & 0x0F,
            _ => {}
        }
    }

    fn write_page(&mut self, page: &[u8]) {
        let start = self.cursor;
        for (i, &byte) in page.iter().enumerate() {
            let address = start.wrapping_add(i as u32);
            match address {
                0x0000..=0x7FFF if self.flash && self.flash_state == FlashState::Program => {
                    if let Some(offset) = self.rom_offset(address) {
                        // NOR programming can only clear bits
                        self.rom[offset] &= byte;
                    }
                }
                0xA000..=0xBFFF => {
                    if let Some(offset) = self.ram_offset(address) {
                        self.ram[offset] = byte;
                    }
                }
                _ => {}
            }
        }
        self.cursor = start.wrapping_add(page.len() as u32);
    }

    fn flash_command(&mut self, address: u32, byte: u8) {
        if !self.flash {
            return;
        }
        if (address, byte) == RESET {
            self.unlock.clear();
            if self.flash_state == FlashState::Program {
                self.flash_state = FlashState::ReadArray;
            }
            return;
        }
        self.unlock.push((address, byte));
        let Some(sequence) = jedec_sequence(DEFAULT_CHIP) else {
            return;
        };
        if self.unlock.ends_with(&sequence.chip_erase) {
            self.unlock.clear();
            self.flash_state = FlashState::Erasing {
                busy_polls: self.erase_busy_polls,
            };
        } else if self.unlock.ends_with(&sequence.program) {
            self.unlock.clear();
            self.flash_state = FlashState::Program;
        }
        if self.unlock.len() > sequence.chip_erase.len() {
            self.unlock.remove(0);
        }
    }
}

/// Offset within each bank of the byte naming the bank's high bits.
const BANK_MARKER_OFFSET: usize = 0x200;

/// Build a ROM image with a valid header and recognizable bank contents.
///
/// Every byte outside the header holds `bank ^ (offset & 0xFF)`. That
/// repeats every 256 banks, so offset 0x200 of each bank also carries the
/// bank's high bits; a dump taken with the wrong bank selected never matches.
pub fn synthetic_rom(
    title: &str,
    cartridge_type: u8,
    rom_size_code: u8,
    ram_size_code: u8,
) -> Vec<u8> {
    let size = rom_size(rom_size_code).unwrap_or(0x8000) as usize;
    let mut rom: Vec<u8> = (0..size)
        .map(|i| ((i / ROM_BANK_SIZE as usize) as u8) ^ (i as u8))
        .collect();
    for (bank, chunk) in rom.chunks_mut(ROM_BANK_SIZE as usize).enumerate() {
        chunk[BANK_MARKER_OFFSET] = 0x80 | (bank >> 8) as u8;
    }

    rom[0x0100..0x0104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[0x0104..0x0134].copy_from_slice(&NINTENDO_LOGO);
    rom[0x0134..0x0144].fill(0);
    let title = title.as_bytes();
    let len = title.len().min(16);
    rom[0x0134..0x0134 + len].copy_from_slice(&title[..len]);
    rom[0x0144..0x0146].fill(0);
    rom[0x0146] = 0x00;
    rom[0x0147] = cartridge_type;
    rom[0x0148] = rom_size_code;
    rom[0x0149] = ram_size_code;
    rom[0x014A] = 0x01;
    rom[0x014B] = 0x01;
    rom[0x014C] = 0x00;
    rom[0x014D] = compute_header_checksum(&rom[..HEADER_LEN]);
    let global = compute_global_checksum(&rom);
    rom[0x014E..0x0150].copy_from_slice(&global.to_be_bytes());

    rom
}

#[cfg(test)]
#[path = "tests/sim_tests.rs"]
mod tests;
