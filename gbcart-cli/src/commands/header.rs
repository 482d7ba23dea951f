use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gbcart_core::{Header, HeaderError};
use gbcart_core::util::format_bytes;
use gbcart_lib::{Outcome, Request};

use super::device::{open_session, run_request};
use crate::cli_types::DeviceArgs;
use crate::error::CliError;

/// Read the cartridge header and show what it says.
pub(crate) fn run_header(device: &DeviceArgs, quiet: bool) -> Result<(), CliError> {
    let session = open_session(device)?;
    let header = match run_request(session, Request::ReadHeader, quiet)? {
        Outcome::Header(header) => header,
        _ => return Err(CliError::runtime("unexpected outcome for a header read")),
    };
    print_header(&header);
    Ok(())
}

pub(crate) fn print_header(header: &Header) {
    log::info!("{}", header.title.if_supports_color(Stdout, |t| t.bold()));

    let size = |result: Result<u64, HeaderError>| match result {
        Ok(bytes) => format_bytes(bytes),
        Err(e) => format!("{}", e),
    };
    let checksum = if header.is_header_checksum_valid() {
        format!("{}", "OK".if_supports_color(Stdout, |t| t.green()))
    } else {
        format!("{}", "BAD".if_supports_color(Stdout, |t| t.red()))
    };

    let fields: &[(&str, String)] = &[
        ("Platform", header.platform().to_string()),
        ("Color", header.cgb_mode.name().to_string()),
        (
            "Type",
            format!("{} (0x{:02X})", header.cartridge_type_name(), header.cartridge_type),
        ),
        ("Controller", header.controller.to_string()),
        ("ROM size", size(header.rom_size())),
        ("RAM size", size(header.ram_size())),
        ("Battery", if header.has_battery() { "yes" } else { "no" }.to_string()),
        ("Region", header.region.to_string()),
        ("Licensee", header.licensee.to_string()),
        ("Version", format!("{}", header.version)),
        (
            "Checksum",
            format!("0x{:02X} {}", header.header_checksum, checksum),
        ),
    ];
    for (name, value) in fields {
        log::info!(
            "  {} {}",
            format!("{:<11}", format!("{}:", name)).if_supports_color(Stdout, |t| t.cyan()),
            value,
        );
    }
}
