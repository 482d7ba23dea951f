pub(crate) mod config;
pub(crate) mod device;
pub(crate) mod flash;
pub(crate) mod header;
pub(crate) mod ports;
pub(crate) mod rom;
pub(crate) mod save;

use std::fs;
use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gbcart_lib::DumpHashes;

use crate::error::CliError;

/// Write a dump to `path` and report its size and hashes.
///
/// The hashes are taken from the file as written, so they are the ones a
/// dump database lookup will see.
pub(crate) fn write_dump(path: &Path, data: &[u8]) -> Result<DumpHashes, CliError> {
    fs::write(path, data)?;
    let hashes = gbcart_lib::hash_reader(&mut fs::File::open(path)?, &|_| {})?;
    if hashes.data_size != data.len() as u64 {
        return Err(CliError::verify(format!(
            "{} holds {} bytes after writing {}",
            path.display(),
            hashes.data_size,
            data.len()
        )));
    }
    log::info!(
        "{} Wrote {} ({})",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        gbcart_core::util::format_bytes(hashes.data_size),
    );
    log_hashes(&hashes);
    Ok(hashes)
}

pub(crate) fn log_hashes(hashes: &DumpHashes) {
    log::info!(
        "  {} {}",
        "CRC32:".if_supports_color(Stdout, |t| t.dimmed()),
        hashes.crc32,
    );
    log::info!(
        "  {} {}",
        "SHA-1:".if_supports_color(Stdout, |t| t.dimmed()),
        hashes.sha1,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_dump_hashes_the_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TESTROM.gb");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let hashes = write_dump(&path, &data).unwrap();
        assert_eq!(fs::read(&path).unwrap(), data);
        assert_eq!(hashes, gbcart_lib::hash_bytes(&data));
    }
}
