use super::*;

fn wire(command: &AddressCommand) -> Vec<u8> {
    command
        .encode(Platform::GameBoy)
        .into_iter()
        .flat_map(|f| f.bytes)
        .collect()
}

#[test]
fn test_stream_control() {
    assert_eq!(wire(&AddressCommand::Stop), b"0");
    assert_eq!(wire(&AddressCommand::Continue), b"1");
}

#[test]
fn test_goto_is_uppercase_hex_with_terminator() {
    assert_eq!(wire(&AddressCommand::GoTo(0xA000)), b"AA000\0");
    assert_eq!(wire(&AddressCommand::GoTo(0)), b"A0\0");
    assert_eq!(wire(&AddressCommand::GoTo(0x4abc)), b"A4ABC\0");
}

#[test]
fn test_read_trigger_depends_on_platform() {
    let classic = AddressCommand::Read.encode(Platform::GameBoy);
    let advance = AddressCommand::Read.encode(Platform::GameBoyAdvance);
    assert_eq!(classic[0].bytes, b"R");
    assert_eq!(advance[0].bytes, b"r");
    assert_eq!(AddressCommand::RomMode.encode(Platform::GameBoy)[0].bytes, b"G");
    assert_eq!(
        AddressCommand::RomMode.encode(Platform::GameBoyAdvance)[0].bytes,
        b"g"
    );
}

#[test]
fn test_set_bank_has_two_frames_and_settle_delay() {
    let frames = AddressCommand::set_bank(0x2000, 5).encode(Platform::GameBoy);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].bytes, b"B2000\0");
    assert_eq!(frames[0].settle_after, Some(SETTLE_DELAY));
    assert_eq!(frames[1].bytes, b"B5\0");
    assert_eq!(frames[1].settle_after, None);
}

#[test]
fn test_set_bank_radix() {
    let cmd = AddressCommand::SetBank {
        address: 0x2100,
        bank: 0x1F,
        radix: 16,
    };
    assert_eq!(wire(&cmd), b"B2100\0B1F\0");
    assert_eq!(wire(&AddressCommand::set_bank(0x2100, 300)), b"B2100\0B300\0");
}

#[test]
fn test_flash_byte() {
    assert_eq!(
        wire(&AddressCommand::flash_byte(0x555, 0xAA)),
        b"F555\0AA\0"
    );
    assert_eq!(wire(&AddressCommand::flash_byte(0, 0xF0)), b"F0\0F0\0");
    assert!(AddressCommand::flash_byte(0, 0xF0).expects_ack());
}

#[test]
fn test_write_page_is_raw() {
    let page: Vec<u8> = (0..64).collect();
    let bytes = wire(&AddressCommand::Write(page.clone()));
    assert_eq!(bytes.len(), 65);
    assert_eq!(bytes[0], b'W');
    assert_eq!(&bytes[1..], page.as_slice());
    assert!(AddressCommand::Write(page).expects_ack());
    assert!(!AddressCommand::Read.expects_ack());
}

#[test]
fn test_pin_mode() {
    assert_eq!(wire(&AddressCommand::PinMode(WritePin::Audio)), b"PA");
    assert_eq!(wire(&AddressCommand::PinMode(WritePin::Wr)), b"PW");
}

#[test]
fn test_format_radix() {
    assert_eq!(format_radix(0, 10), "0");
    assert_eq!(format_radix(255, 16), "FF");
    assert_eq!(format_radix(5, 2), "101");
    assert_eq!(format_radix(37, 10), "37");
}

#[test]
fn test_decoder_reassembles_a_session() {
    let sequence = [
        AddressCommand::RomMode,
        AddressCommand::set_bank(0x6000, 0),
        AddressCommand::set_bank(0x4000, 1),
        AddressCommand::set_bank(0x2000, 5),
        AddressCommand::GoTo(0x4000),
        AddressCommand::Read,
        AddressCommand::Continue,
        AddressCommand::Stop,
        AddressCommand::flash_byte(0x2AA, 0x55),
        AddressCommand::Write(vec![0x5A; PAGE_SIZE]),
        AddressCommand::PinMode(WritePin::Audio),
    ];
    let bytes: Vec<u8> = sequence.iter().flat_map(wire).collect();

    let mut decoder = CommandDecoder::new();
    let decoded = decoder.feed(&bytes).unwrap();
    assert_eq!(decoded, sequence);
}

#[test]
fn test_decoder_handles_split_input() {
    let bytes = wire(&AddressCommand::GoTo(0xA000));
    let mut decoder = CommandDecoder::new();
    assert!(decoder.feed(&bytes[..3]).unwrap().is_empty());
    assert_eq!(
        decoder.feed(&bytes[3..]).unwrap(),
        vec![AddressCommand::GoTo(0xA000)]
    );
}

#[test]
fn test_decoder_rejects_garbage() {
    let mut decoder = CommandDecoder::new();
    assert!(matches!(decoder.push(b'Z'), Err(CartError::Protocol(_))));

    decoder.reset();
    assert!(decoder.feed(b"AXYZ\0").is_err());

    decoder.reset();
    assert!(decoder.feed(b"A123456789012").is_err());
}
