use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gbcart_core::header::verify_global_checksum;
use gbcart_core::{DumpKind, suggested_filename};
use gbcart_lib::{Outcome, Request};

use super::device::{open_session, run_request};
use super::write_dump;
use crate::cli_types::DeviceArgs;
use crate::error::CliError;

/// Dump the whole ROM to `output`, or to a name derived from the title.
pub(crate) fn run_read_rom(
    device: &DeviceArgs,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let session = open_session(device)?;
    let (header, rom) = match run_request(session, Request::ReadCartridge, quiet)? {
        Outcome::Cartridge { header, rom } => (header, rom),
        _ => return Err(CliError::runtime("unexpected outcome for a ROM read")),
    };

    log::info!(
        "{} {} ({})",
        "Dumped".if_supports_color(Stdout, |t| t.bold()),
        header.title.if_supports_color(Stdout, |t| t.cyan()),
        header.cartridge_type_name(),
    );
    let path = output.unwrap_or_else(|| PathBuf::from(suggested_filename(&header, DumpKind::Rom)));
    write_dump(&path, &rom)?;

    // Many licensed carts ship with a wrong global checksum, so this only warns
    if !verify_global_checksum(&rom) {
        log::warn!(
            "{} Global checksum does not match (stored 0x{:04X})",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            header.global_checksum,
        );
    }
    Ok(())
}
