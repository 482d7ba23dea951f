//! Game Boy cartridge metadata shared by the gbcart crates.
//!
//! This crate knows how to read a cartridge header out of a byte buffer and
//! what the header's fields mean. It performs no I/O; the device protocol
//! lives in `gbcart-lib`.

pub mod cartridge;
pub mod error;
pub mod header;
pub mod platform;
pub mod region;
pub mod util;

pub use cartridge::{ControllerFamily, cartridge_type_name, ram_size, rom_size};
pub use error::HeaderError;
pub use header::{CgbMode, Header, Licensee, NINTENDO_LOGO};
pub use platform::{Platform, PlatformParseError};
pub use region::Region;

/// What kind of image a dump holds. Used to pick file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DumpKind {
    /// Full ROM image
    Rom,
    /// Battery-backed save RAM
    Save,
}

/// Suggest a file name for a dump of the cartridge described by `header`.
///
/// The title is sanitized for use as a file name. Color-only and
/// color-enhanced games get `.gbc`, everything else `.gb`; saves are `.sav`.
pub fn suggested_filename(header: &Header, kind: DumpKind) -> String {
    let stem = util::sanitize_file_stem(&header.title);
    let stem = if stem.is_empty() { "untitled".to_string() } else { stem };
    let ext = match kind {
        DumpKind::Save => "sav",
        DumpKind::Rom if header.cgb_mode != CgbMode::Dmg => "gbc",
        DumpKind::Rom => "gb",
    };
    format!("{stem}.{ext}")
}
