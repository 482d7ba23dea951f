//! Persistent settings shared by every frontend.
//!
//! The settings file is always `~/.config/gbcart/settings.toml`. Missing
//! files and missing fields fall back to defaults, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gbcart_core::Platform;
use serde::{Deserialize, Serialize};

use crate::codec::WritePin;
use crate::error::CartError;
use crate::flash::{DEFAULT_CHIP, FlashProfile};
use crate::serial::{DEFAULT_PATH_PREFIXES, DEFAULT_PID, DEFAULT_VID, DeviceMatcher};
use crate::session::SessionConfig;
use crate::wire::Timing;

/// Canonical path to the settings file: `~/.config/gbcart/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("gbcart").join("settings.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceSettings,
    pub timing: TimingSettings,
    pub flash: FlashSettings,
}

/// `[device]`: how to find the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub vid: u16,
    pub pid: u16,
    pub path_prefixes: Vec<String>,
    /// Explicit port, e.g. `/dev/ttyUSB0`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Cartridge slot: `gb` or `gba`
    pub platform: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vid: DEFAULT_VID,
            pid: DEFAULT_PID,
            path_prefixes: DEFAULT_PATH_PREFIXES.iter().map(|s| s.to_string()).collect(),
            port: None,
            platform: Platform::GameBoy.short_name().to_string(),
        }
    }
}

/// `[timing]`: timeouts, in the units their names say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub acquire_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub erase_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erase_poll_limit: Option<u32>,
}

impl Default for TimingSettings {
    fn default() -> Self {
        let timing = Timing::default();
        Self {
            acquire_timeout_ms: timing.acquire.as_millis() as u64,
            response_timeout_ms: timing.response.as_millis() as u64,
            erase_timeout_secs: timing.erase.as_secs(),
            erase_poll_limit: timing.erase_poll_limit,
        }
    }
}

/// `[flash]`: the flash chip on reproduction carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashSettings {
    pub chip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub we_pin: Option<WritePin>,
}

impl Default for FlashSettings {
    fn default() -> Self {
        Self {
            chip: DEFAULT_CHIP.to_string(),
            we_pin: None,
        }
    }
}

impl Settings {
    /// Load from the canonical path.
    pub fn load() -> Result<Self, CartError> {
        Self::load_from(&settings_path())
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, CartError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents)
                .map_err(|e| CartError::config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, CartError> {
        toml::from_str(contents).map_err(|e| CartError::config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, CartError> {
        toml::to_string_pretty(self).map_err(|e| CartError::config(e.to_string()))
    }

    /// Save to `path`, writing a temporary file and renaming it over the
    /// old one.
    pub fn save_to(&self, path: &Path) -> Result<(), CartError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = self.to_toml()?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &serialized)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), CartError> {
        self.save_to(&settings_path())
    }

    pub fn platform(&self) -> Result<Platform, CartError> {
        self.device
            .platform
            .parse()
            .map_err(|e: gbcart_core::PlatformParseError| CartError::config(e.to_string()))
    }

    pub fn matcher(&self) -> DeviceMatcher {
        DeviceMatcher {
            vid: self.device.vid,
            pid: self.device.pid,
            path_prefixes: self.device.path_prefixes.clone(),
            port: self.device.port.clone(),
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            acquire: Duration::from_millis(self.timing.acquire_timeout_ms),
            response: Duration::from_millis(self.timing.response_timeout_ms),
            erase: Duration::from_secs(self.timing.erase_timeout_secs),
            erase_poll_limit: self.timing.erase_poll_limit,
        }
    }

    pub fn flash_profile(&self) -> FlashProfile {
        FlashProfile {
            chip: self.flash.chip.clone(),
            we_pin: self.flash.we_pin,
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig, CartError> {
        Ok(SessionConfig {
            platform: self.platform()?,
            timing: self.timing(),
            flash: self.flash_profile(),
        })
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
