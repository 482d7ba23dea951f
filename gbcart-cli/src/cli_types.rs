//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gbcart_core::Platform;

#[derive(Parser)]
#[command(name = "gbcart")]
#[command(about = "Dump and write Game Boy cartridges through a USB cartridge adapter", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which adapter to talk to. Overrides the settings file.
#[derive(Args, Clone, Default)]
pub(crate) struct DeviceArgs {
    /// Serial port of the adapter (e.g., /dev/ttyUSB0, COM3)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Cartridge slot to use (gb, gba)
    #[arg(long, global = true)]
    pub platform: Option<Platform>,

    /// Run against a simulated adapter holding this ROM image instead of hardware
    #[arg(long, global = true, value_name = "ROM")]
    pub simulate: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List serial ports and show which one looks like the adapter
    Ports,

    /// Read and show the cartridge header
    Header,

    /// Dump the full ROM to a file
    ReadRom {
        /// Output file (default: derived from the cartridge title)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Back up the save RAM to a file
    BackupSave {
        /// Output file (default: derived from the cartridge title)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Overwrite the save RAM with a file's contents
    RestoreSave {
        /// Save file; must be exactly the cartridge's RAM size
        file: PathBuf,
    },

    /// Fill the save RAM with zeros
    EraseSave,

    /// Erase a flash cartridge
    EraseFlash,

    /// Erase a flash cartridge and program a ROM image onto it
    WriteFlash {
        /// ROM image to program
        file: PathBuf,

        /// Read the cartridge back afterwards and compare hashes
        #[arg(long)]
        verify: bool,
    },

    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the effective settings
    Show,

    /// Print the settings file path
    Path,

    /// Write a settings file with the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_device_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "gbcart",
            "write-flash",
            "game.gb",
            "--verify",
            "--port",
            "/dev/ttyUSB1",
            "--platform",
            "gbc",
        ])
        .unwrap();
        assert_eq!(cli.device.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(cli.device.platform, Some(Platform::GameBoy));
        match cli.command {
            Commands::WriteFlash { file, verify } => {
                assert_eq!(file, PathBuf::from("game.gb"));
                assert!(verify);
            }
            _ => panic!("expected write-flash"),
        }
    }
}
