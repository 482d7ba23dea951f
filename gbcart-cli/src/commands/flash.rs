use std::fs;
use std::path::Path;
use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gbcart_core::util::format_bytes;
use gbcart_lib::{Outcome, Request};

use super::device::{open_session, run_request};
use super::log_hashes;
use crate::cli_types::DeviceArgs;
use crate::error::CliError;

pub(crate) fn run_erase_flash(device: &DeviceArgs, quiet: bool) -> Result<(), CliError> {
    let session = open_session(device)?;
    log::info!(
        "Erasing with the {} command set",
        session.config().flash.chip.if_supports_color(Stdout, |t| t.cyan()),
    );
    match run_request(session, Request::EraseFlash, quiet)? {
        Outcome::FlashErased => {
            log::info!(
                "{} Flash erased",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            );
            Ok(())
        }
        _ => Err(CliError::runtime("unexpected outcome for a flash erase")),
    }
}

/// Erase the flash cartridge and program `file` onto it.
///
/// With `verify`, the cartridge is read back and its hashes compared with
/// the image's.
pub(crate) fn run_write_flash(
    device: &DeviceArgs,
    file: &Path,
    verify: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let image = fs::read(file)?;
    let expected = gbcart_lib::hash_bytes(&image);
    let session = open_session(device)?;

    match run_request(Arc::clone(&session), Request::WriteFlash(image), quiet)? {
        Outcome::FlashWritten { header, bytes } => {
            log::info!(
                "{} Programmed {} ({})",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                header.title.if_supports_color(Stdout, |t| t.cyan()),
                format_bytes(bytes),
            );
        }
        _ => return Err(CliError::runtime("unexpected outcome for a flash write")),
    }

    if !verify {
        return Ok(());
    }
    let rom = match run_request(session, Request::ReadCartridge, quiet)? {
        Outcome::Cartridge { rom, .. } => rom,
        _ => return Err(CliError::runtime("unexpected outcome for a ROM read")),
    };
    let actual = gbcart_lib::hash_bytes(&rom);
    if !actual.matches(&expected) {
        log_hashes(&actual);
        return Err(CliError::verify(format!(
            "read back {} with SHA-1 {}, expected {} with SHA-1 {}",
            format_bytes(actual.data_size),
            actual.sha1,
            format_bytes(expected.data_size),
            expected.sha1,
        )));
    }
    log::info!(
        "{} Read-back matches",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
    );
    log_hashes(&actual);
    Ok(())
}
