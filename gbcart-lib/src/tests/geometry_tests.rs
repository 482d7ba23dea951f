use super::*;
use crate::sim::synthetic_rom;

fn geometry(cartridge_type: u8, rom_code: u8, ram_code: u8) -> Geometry {
    let rom = synthetic_rom("GEOMETRY", cartridge_type, rom_code, ram_code);
    Geometry::new(&Header::parse(&rom).unwrap()).unwrap()
}

#[test]
fn test_windows_cover_every_rom_size() {
    for (cartridge_type, rom_code) in [(0x00, 0x00), (0x01, 0x00), (0x01, 0x01)]
        .into_iter()
        .chain((0x00..=0x08).map(|code| (0x19, code)))
    {
        let g = geometry(cartridge_type, rom_code, 0x00);
        assert!(g.rom_bank_count >= 1);
        assert_eq!(g.rom_bank_count as u64 * g.rom_bank_size, g.rom_size);

        let windows = g.rom_windows();
        let covered: u64 = windows.iter().map(|w| w.len).sum();
        assert_eq!(covered, g.rom_size, "rom size code 0x{:02X}", rom_code);
        assert!(windows.windows(2).all(|pair| pair[0].bank < pair[1].bank));
    }
}

#[test]
fn test_first_window_is_double_size() {
    let g = geometry(0x19, 0x02, 0x00); // 128 KB
    let windows = g.rom_windows();
    assert_eq!(windows.len(), 7);
    assert_eq!(
        windows[0],
        BankWindow {
            bank: 1,
            address: 0,
            len: 0x8000
        }
    );
    assert_eq!(
        windows[1],
        BankWindow {
            bank: 2,
            address: 0x4000,
            len: 0x4000
        }
    );
    assert_eq!(windows[6].bank, 7);
}

#[test]
fn test_mbc1_bank_0x25() {
    let g = geometry(0x01, 0x05, 0x00);
    assert_eq!(
        g.select_rom_bank(0x25),
        vec![
            AddressCommand::set_bank(0x6000, 0),
            AddressCommand::set_bank(0x4000, 1),
            AddressCommand::set_bank(0x2000, 5),
        ]
    );
}

#[test]
fn test_mbc5_high_bank_bit() {
    let g = geometry(0x19, 0x08, 0x00);
    assert_eq!(
        g.select_rom_bank(0x42),
        vec![
            AddressCommand::set_bank(0x2100, 0x42),
            AddressCommand::set_bank(0x3000, 0),
        ]
    );
    assert_eq!(
        g.select_rom_bank(0x1A0),
        vec![
            AddressCommand::set_bank(0x2100, 0x1A0),
            AddressCommand::set_bank(0x3000, 1),
        ]
    );
}

#[test]
fn test_high_bank_bit_untouched_below_256_banks() {
    let g = geometry(0x19, 0x07, 0x00); // 4 MB, exactly 256 banks
    assert_eq!(g.rom_bank_count, 0x100);
    for bank in [1, 0x42, 0xFF] {
        assert_eq!(
            g.select_rom_bank(bank),
            vec![AddressCommand::set_bank(0x2100, bank)]
        );
    }
}

#[test]
fn test_rom_only_never_switches() {
    let g = geometry(0x00, 0x00, 0x00);
    assert!(!g.switches_banks());
    assert!(g.select_rom_bank(1).is_empty());
    assert_eq!(g.rom_windows().len(), 1);
}

#[test]
fn test_ram_geometry() {
    let g = geometry(0x03, 0x04, 0x03); // MBC1, 32 KB RAM
    assert_eq!(g.ram_bank_count, 4);
    assert_eq!(g.ram_bank_size, 0x2000);
    assert!(g.needs_ram_fix());
    assert_eq!(
        g.select_ram_bank(2),
        vec![
            AddressCommand::set_bank(0x6000, 1),
            AddressCommand::set_bank(0x4000, 2),
        ]
    );
    let windows = g.ram_windows();
    assert_eq!(windows.len(), 4);
    assert!(windows.iter().all(|w| w.address == RAM_START));

    let g = geometry(0x1B, 0x04, 0x02); // MBC5, 8 KB RAM
    assert_eq!(g.ram_bank_count, 1);
    assert!(!g.needs_ram_fix());
    assert_eq!(
        g.select_ram_bank(0),
        vec![AddressCommand::set_bank(0x4000, 0)]
    );
}

#[test]
fn test_mbc2_builtin_ram() {
    let g = geometry(0x06, 0x03, 0x00);
    assert_eq!(g.ram_size, 512);
    assert_eq!(g.ram_bank_count, 1);
    assert_eq!(g.ram_bank_size, 512);
    assert!(g.select_ram_bank(0).is_empty());
    assert!(g.needs_ram_fix());
}

#[test]
fn test_no_ram_means_no_ram_banks() {
    let g = geometry(0x19, 0x01, 0x00);
    assert_eq!(g.ram_bank_count, 0);
    assert!(!g.has_save_ram());
    assert!(g.ram_windows().is_empty());
}

#[test]
fn test_toggle_ram() {
    assert_eq!(
        Geometry::toggle_ram(true),
        AddressCommand::set_bank(0x0000, 0x0A)
    );
    assert_eq!(
        Geometry::toggle_ram(false),
        AddressCommand::set_bank(0x0000, 0x00)
    );
}

#[test]
fn test_invalid_logo_is_rejected() {
    let mut rom = synthetic_rom("NOLOGO", 0x19, 0x01, 0x00);
    rom[0x0110] ^= 0xFF;
    let header = Header::parse(&rom).unwrap();
    assert!(matches!(Geometry::new(&header), Err(CartError::InvalidHeader)));
}

#[test]
fn test_unknown_size_code_is_malformed() {
    let mut rom = synthetic_rom("BADSIZE", 0x19, 0x01, 0x00);
    rom[0x0148] = 0x52;
    let header = Header::parse(&rom).unwrap();
    assert!(matches!(
        Geometry::new(&header),
        Err(CartError::MalformedHeader(_))
    ));
}

#[test]
fn test_advance_has_no_geometry() {
    let rom = synthetic_rom("GBA", 0x19, 0x01, 0x00);
    let header = Header::parse(&rom).unwrap();
    assert!(matches!(
        Geometry::for_platform(Platform::GameBoyAdvance, &header),
        Err(CartError::UnsupportedPlatform(Platform::GameBoyAdvance))
    ));
}
