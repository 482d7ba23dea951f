use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gbcart_lib::Settings;
use gbcart_lib::flash::registered_chips;
use gbcart_lib::settings::settings_path;

use super::device::load_settings;
use crate::cli_types::DeviceArgs;
use crate::error::CliError;

/// Show the effective settings, command-line overrides included.
pub(crate) fn run_config_show(device: &DeviceArgs) -> Result<(), CliError> {
    let path = settings_path();
    log::info!(
        "{}",
        "gbcart Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");
    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!("");

    let settings = load_settings(device)?;
    for line in settings.to_toml()?.lines() {
        log::info!("  {}", line);
    }
    log::info!("");
    log::info!(
        "  {} {}",
        "Known flash chips:".if_supports_color(Stdout, |t| t.dimmed()),
        registered_chips().collect::<Vec<_>>().join(", "),
    );
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    log::info!("{}", settings_path().display());
}

/// Write the default settings, refusing to clobber an existing file
/// unless `force` is set.
pub(crate) fn run_config_init(force: bool) -> Result<(), CliError> {
    let path = settings_path();
    if path.exists() && !force {
        return Err(CliError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Settings::default().save_to(&path)?;
    log::info!(
        "{} Settings saved to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}
