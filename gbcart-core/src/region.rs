use serde::{Deserialize, Serialize};

/// Destination declared in a cartridge header.
///
/// Game Boy headers only distinguish Japan from everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// Japan
    Japan,
    /// Overseas / international release
    World,
    /// Destination byte holds neither known value
    Unknown,
}

impl Region {
    /// Returns the full name of this region.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Japan => "Japan",
            Self::World => "World",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
