use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::device::load_settings;
use crate::cli_types::DeviceArgs;
use crate::error::CliError;

/// List serial ports, marking the ones the adapter matcher accepts.
pub(crate) fn run_ports(device: &DeviceArgs) -> Result<(), CliError> {
    let matcher = load_settings(device)?.matcher();
    let ports = matcher.scan()?;

    if ports.is_empty() {
        log::info!(
            "{}",
            "No serial ports found.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }

    log::info!(
        "{} (looking for {:04X}:{:04X})",
        "Serial ports:".if_supports_color(Stdout, |t| t.bold()),
        matcher.vid,
        matcher.pid,
    );
    for port in &ports {
        let usb = port
            .usb_id
            .map(|(vid, pid)| format!(" [{:04X}:{:04X}]", vid, pid))
            .unwrap_or_default();
        let product = port
            .product
            .as_deref()
            .map(|p| format!(" {}", p))
            .unwrap_or_default();
        if port.matches {
            log::info!(
                "  {} {}{}{}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                port.path.if_supports_color(Stdout, |t| t.bold()),
                usb.if_supports_color(Stdout, |t| t.cyan()),
                product,
            );
        } else {
            log::info!(
                "    {}{}{}",
                port.path,
                usb.if_supports_color(Stdout, |t| t.dimmed()),
                product.if_supports_color(Stdout, |t| t.dimmed()),
            );
        }
    }

    match matcher.find() {
        Ok(path) => log::info!("Using {}", path.if_supports_color(Stdout, |t| t.cyan())),
        Err(e) => log::warn!("{}", e),
    }
    Ok(())
}
