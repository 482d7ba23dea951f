/// Cartridge slot families the adapter can drive.
///
/// The adapter speaks the same ASCII protocol to both slots, but the read
/// trigger and mode command differ, and only the classic slot has bank
/// geometry support in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Platform {
    /// Game Boy / Game Boy Color (classic slot)
    GameBoy,
    /// Game Boy Advance
    GameBoyAdvance,
}

const ALL_PLATFORMS: &[Platform] = &[Platform::GameBoy, Platform::GameBoyAdvance];

impl Platform {
    /// Canonical short name used for CLI arguments and config files.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::GameBoy => "gb",
            Self::GameBoyAdvance => "gba",
        }
    }

    /// Full display name for the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GameBoy => "Game Boy / Game Boy Color",
            Self::GameBoyAdvance => "Game Boy Advance",
        }
    }

    /// All accepted names for this platform (case-insensitive matching).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::GameBoy => &["gb", "gbc", "gameboy", "game boy", "dmg", "classic"],
            Self::GameBoyAdvance => &["gba", "game boy advance", "gameboy advance", "advance", "agb"],
        }
    }

    pub fn all() -> &'static [Platform] {
        ALL_PLATFORMS
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error returned when a string cannot be parsed into a `Platform`.
#[derive(Debug, Clone)]
pub struct PlatformParseError(pub String);

impl std::fmt::Display for PlatformParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown platform: '{}'", self.0)
    }
}

impl std::error::Error for PlatformParseError {}

impl std::str::FromStr for Platform {
    type Err = PlatformParseError;

    /// Parse a platform from any recognized name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ALL_PLATFORMS
            .iter()
            .copied()
            .find(|p| p.aliases().contains(&lower.as_str()))
            .ok_or_else(|| PlatformParseError(s.to_string()))
    }
}
