//! gbcart CLI
//!
//! Command-line interface for dumping, restoring and reflashing Game Boy
//! cartridges through a USB cartridge adapter.

mod cli_types;
mod commands;
mod error;
mod progress;

use std::io::Write;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use cli_types::{Cli, Commands, ConfigAction};
use commands::config::{run_config_init, run_config_path, run_config_show};
use commands::flash::{run_erase_flash, run_write_flash};
use commands::header::run_header;
use commands::ports::run_ports;
use commands::rom::run_read_rom;
use commands::save::{run_backup_save, run_erase_save, run_restore_save};
use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    if let Err(e) = run(cli) {
        log::error!("{} {}", "\u{2718}".if_supports_color(Stderr, |t| t.red()), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let device = &cli.device;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Ports => run_ports(device),
        Commands::Header => run_header(device, quiet),
        Commands::ReadRom { output } => run_read_rom(device, output, quiet),
        Commands::BackupSave { output } => run_backup_save(device, output, quiet),
        Commands::RestoreSave { file } => run_restore_save(device, &file, quiet),
        Commands::EraseSave => run_erase_save(device, quiet),
        Commands::EraseFlash => run_erase_flash(device, quiet),
        Commands::WriteFlash { file, verify } => run_write_flash(device, &file, verify, quiet),
        Commands::Config { action } => match action {
            ConfigAction::Show => run_config_show(device),
            ConfigAction::Path => {
                run_config_path();
                Ok(())
            }
            ConfigAction::Init { force } => run_config_init(force),
        },
    }
}

/// Route `log` output to the terminal.
///
/// Normal runs print bare messages to stdout, so `log::info!` doubles as
/// the command output. `--verbose` adds timestamps, levels and debug
/// records; `RUST_LOG` still overrides the filter.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        log::LevelFilter::Warn
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    if verbose {
        builder.format_timestamp_millis();
    } else {
        builder
            .target(env_logger::Target::Stdout)
            .format(|buf, record| writeln!(buf, "{}", record.args()));
    }
    builder.init();
}
