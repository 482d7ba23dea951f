use std::fs;
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gbcart_core::util::format_bytes;
use gbcart_core::{DumpKind, suggested_filename};
use gbcart_lib::{Outcome, Request};

use super::device::{open_session, run_request};
use super::write_dump;
use crate::cli_types::DeviceArgs;
use crate::error::CliError;

/// Back up save RAM to `output`, or to a name derived from the title.
pub(crate) fn run_backup_save(
    device: &DeviceArgs,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let session = open_session(device)?;
    let (header, data) = match run_request(session, Request::BackupSave, quiet)? {
        Outcome::Save { header, data } => (header, data),
        _ => return Err(CliError::runtime("unexpected outcome for a save backup")),
    };
    let path =
        output.unwrap_or_else(|| PathBuf::from(suggested_filename(&header, DumpKind::Save)));
    write_dump(&path, &data)?;
    Ok(())
}

/// Overwrite save RAM with the contents of `file`.
pub(crate) fn run_restore_save(
    device: &DeviceArgs,
    file: &Path,
    quiet: bool,
) -> Result<(), CliError> {
    let data = fs::read(file)?;
    let session = open_session(device)?;
    match run_request(session, Request::RestoreSave(data), quiet)? {
        Outcome::SaveRestored { header, bytes } => {
            log::info!(
                "{} Restored {} of save data to {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                format_bytes(bytes),
                header.title.if_supports_color(Stdout, |t| t.cyan()),
            );
            Ok(())
        }
        _ => Err(CliError::runtime("unexpected outcome for a save restore")),
    }
}

pub(crate) fn run_erase_save(device: &DeviceArgs, quiet: bool) -> Result<(), CliError> {
    let session = open_session(device)?;
    match run_request(session, Request::EraseSave, quiet)? {
        Outcome::SaveErased { header, bytes } => {
            log::info!(
                "{} Cleared {} of save data on {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                format_bytes(bytes),
                header.title.if_supports_color(Stdout, |t| t.cyan()),
            );
            Ok(())
        }
        _ => Err(CliError::runtime("unexpected outcome for a save erase")),
    }
}
