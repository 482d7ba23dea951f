use super::*;

/// Build a minimal 32 KB ROM with a valid logo, the given title and
/// correct checksums.
fn make_gb_rom(title: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];

    // Entry point: NOP + JP 0x0150
    rom[0x0100] = 0x00;
    rom[0x0101] = 0xC3;
    rom[0x0102] = 0x50;
    rom[0x0103] = 0x01;

    rom[0x0104..0x0134].copy_from_slice(&NINTENDO_LOGO);
    rom[0x0134..0x0134 + title.len()].copy_from_slice(title);

    rom[0x0147] = 0x00; // ROM ONLY
    rom[0x0148] = 0x00; // 32 KB
    rom[0x0149] = 0x00; // no RAM
    rom[0x014A] = 0x01; // International
    rom[0x014B] = 0x01; // Nintendo

    recompute_checksums(&mut rom);
    rom
}

fn recompute_checksums(rom: &mut [u8]) {
    rom[0x014D] = compute_header_checksum(rom);
    rom[0x014E] = 0;
    rom[0x014F] = 0;
    let global = compute_global_checksum(rom);
    rom[0x014E] = (global >> 8) as u8;
    rom[0x014F] = (global & 0xFF) as u8;
}

#[test]
fn test_parse_header_window_only() {
    let rom = make_gb_rom(b"TESTROM");
    let header = Header::parse(&rom[..HEADER_LEN]).unwrap();

    assert_eq!(header.title, "TESTROM");
    assert!(header.is_logo_valid());
    assert!(header.is_header_checksum_valid());
    assert_eq!(header.controller, ControllerFamily::None);
    assert_eq!(header.rom_size().unwrap(), 0x8000);
    assert_eq!(header.ram_size().unwrap(), 0);
    assert_eq!(header.region, Region::World);
    assert_eq!(header.licensee, Licensee::Old(0x01));
    assert_eq!(header.cartridge_type_name(), "ROM ONLY");
}

#[test]
fn test_too_small_buffer() {
    let rom = make_gb_rom(b"TESTROM");
    let err = Header::parse(&rom[..0x0100]).unwrap_err();
    assert_eq!(
        err,
        HeaderError::TooSmall {
            expected: HEADER_LEN,
            actual: 0x0100
        }
    );
}

#[test]
fn test_corrupted_logo_is_not_valid() {
    for offset in [0x0104, 0x011F, 0x0133] {
        let mut rom = make_gb_rom(b"TESTROM");
        rom[offset] ^= 0xFF;
        let header = Header::parse(&rom).unwrap();
        assert!(!header.is_logo_valid(), "logo byte 0x{:04X} corrupted", offset);
    }
}

#[test]
fn test_empty_slot_parses_but_is_untrusted() {
    // An empty slot reads back as open bus
    let buf = vec![0xFFu8; HEADER_LEN];
    let header = Header::parse(&buf).unwrap();
    assert!(!header.is_logo_valid());
    assert!(header.rom_size().is_err());
}

#[test]
fn test_title_with_cgb_flag() {
    let mut rom = make_gb_rom(b"SHORTNAME\0\0XXXX");
    rom[0x0143] = 0x80;
    recompute_checksums(&mut rom);

    let header = Header::parse(&rom).unwrap();
    assert_eq!(header.title, "SHORTNAME");
    assert_eq!(header.cgb_mode, CgbMode::Compatible);
}

#[test]
fn test_title_full_16_chars() {
    let rom = make_gb_rom(b"ABCDEFGHIJKLMNOP");
    let header = Header::parse(&rom).unwrap();
    assert_eq!(header.title, "ABCDEFGHIJKLMNOP");
    assert_eq!(header.cgb_mode, CgbMode::Dmg);
}

#[test]
fn test_cgb_exclusive() {
    let mut rom = make_gb_rom(b"COLOR");
    rom[0x0143] = 0xC0;
    recompute_checksums(&mut rom);
    let header = Header::parse(&rom).unwrap();
    assert_eq!(header.cgb_mode, CgbMode::Exclusive);
    assert_eq!(header.cgb_mode.name(), "Game Boy Color (Exclusive)");
}

#[test]
fn test_sgb_flag() {
    let mut rom = make_gb_rom(b"SGB");
    rom[0x0146] = 0x03;
    recompute_checksums(&mut rom);
    assert!(Header::parse(&rom).unwrap().sgb);
}

#[test]
fn test_japan_region() {
    let mut rom = make_gb_rom(b"JP");
    rom[0x014A] = 0x00;
    recompute_checksums(&mut rom);
    assert_eq!(Header::parse(&rom).unwrap().region, Region::Japan);
}

#[test]
fn test_new_licensee_code() {
    let mut rom = make_gb_rom(b"LIC");
    rom[0x014B] = 0x33;
    rom[0x0144] = b'0';
    rom[0x0145] = b'1';
    recompute_checksums(&mut rom);
    assert_eq!(
        Header::parse(&rom).unwrap().licensee,
        Licensee::New("01".to_string())
    );
}

#[test]
fn test_cartridge_with_ram() {
    let mut rom = make_gb_rom(b"SAVES");
    rom[0x0147] = 0x03; // MBC1+RAM+BATTERY
    rom[0x0148] = 0x05; // 1 MB
    rom[0x0149] = 0x03; // 32 KB
    recompute_checksums(&mut rom);

    let header = Header::parse(&rom).unwrap();
    assert_eq!(header.controller, ControllerFamily::Mbc1);
    assert_eq!(header.rom_size().unwrap(), 1024 * 1024);
    assert_eq!(header.ram_size().unwrap(), 32 * 1024);
    assert!(header.has_battery());
}

#[test]
fn test_mbc2_has_builtin_ram() {
    let mut rom = make_gb_rom(b"MBC2");
    rom[0x0147] = 0x06;
    rom[0x0149] = 0x00;
    recompute_checksums(&mut rom);
    assert_eq!(Header::parse(&rom).unwrap().ram_size().unwrap(), 512);
}

#[test]
fn test_header_checksum_mismatch() {
    let mut rom = make_gb_rom(b"BAD");
    rom[0x014D] = rom[0x014D].wrapping_add(1);
    let header = Header::parse(&rom).unwrap();
    assert!(header.is_logo_valid());
    assert!(!header.is_header_checksum_valid());
}

#[test]
fn test_global_checksum() {
    let mut rom = make_gb_rom(b"GLOBAL");
    assert!(verify_global_checksum(&rom));
    rom[0x4000] = 0x42;
    assert!(!verify_global_checksum(&rom));
}

#[test]
fn test_rom_size_lookup() {
    assert_eq!(cartridge::rom_size(0x00), Some(32 * 1024));
    assert_eq!(cartridge::rom_size(0x01), Some(64 * 1024));
    assert_eq!(cartridge::rom_size(0x05), Some(1024 * 1024));
    assert_eq!(cartridge::rom_size(0x08), Some(8 * 1024 * 1024));
    assert_eq!(cartridge::rom_size(0x09), None);
    assert_eq!(cartridge::rom_size(0xFF), None);
}

#[test]
fn test_ram_size_lookup() {
    assert_eq!(cartridge::ram_size(0x00), Some(0));
    assert_eq!(cartridge::ram_size(0x01), Some(0));
    assert_eq!(cartridge::ram_size(0x02), Some(8 * 1024));
    assert_eq!(cartridge::ram_size(0x03), Some(32 * 1024));
    assert_eq!(cartridge::ram_size(0x04), Some(128 * 1024));
    assert_eq!(cartridge::ram_size(0x05), Some(64 * 1024));
    assert_eq!(cartridge::ram_size(0x06), None);
}

#[test]
fn test_mbc_cartridge_type_names() {
    assert_eq!(cartridge::cartridge_type_name(0x00), "ROM ONLY");
    assert_eq!(cartridge::cartridge_type_name(0x01), "MBC1");
    assert_eq!(cartridge::cartridge_type_name(0x13), "MBC3+RAM+BATTERY");
    assert_eq!(cartridge::cartridge_type_name(0x1B), "MBC5+RAM+BATTERY");
    assert_eq!(cartridge::cartridge_type_name(0xFE), "HuC3");
    assert_eq!(cartridge::cartridge_type_name(0x04), "Unknown");
}

#[test]
fn test_suggested_filename() {
    use crate::{DumpKind, suggested_filename};

    let mut rom = make_gb_rom(b"POKEMON RED");
    let header = Header::parse(&rom).unwrap();
    assert_eq!(suggested_filename(&header, DumpKind::Rom), "POKEMON RED.gb");
    assert_eq!(suggested_filename(&header, DumpKind::Save), "POKEMON RED.sav");

    rom[0x0134..0x0144].copy_from_slice(b"A/B:C\0\0\0\0\0\0\0\0\0\0\x80");
    recompute_checksums(&mut rom);
    let header = Header::parse(&rom).unwrap();
    assert_eq!(suggested_filename(&header, DumpKind::Rom), "A_B_C.gbc");
}
