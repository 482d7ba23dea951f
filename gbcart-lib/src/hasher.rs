//! CRC32 and SHA-1 of dumps, in the form dump databases list them.

use std::io::Read;

use sha1::Digest;

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Hashes of one dumped image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHashes {
    /// Lowercase hex, 8 digits
    pub crc32: String,
    /// Lowercase hex, 40 digits
    pub sha1: String,
    pub data_size: u64,
}

impl DumpHashes {
    /// Whether two dumps hold the same bytes.
    pub fn matches(&self, other: &DumpHashes) -> bool {
        self.data_size == other.data_size && self.sha1 == other.sha1
    }
}

/// Hash an in-memory dump.
pub fn hash_bytes(data: &[u8]) -> DumpHashes {
    let mut crc = crc32fast::Hasher::new();
    let mut sha = sha1::Sha1::new();
    for chunk in data.chunks(CHUNK_SIZE) {
        crc.update(chunk);
        sha.update(chunk);
    }
    DumpHashes {
        crc32: format!("{:08x}", crc.finalize()),
        sha1: format!("{:x}", sha.finalize()),
        data_size: data.len() as u64,
    }
}

/// Hash a dump file. The callback receives the bytes processed so far.
pub fn hash_reader(
    reader: &mut dyn Read,
    progress: &dyn Fn(u64),
) -> std::io::Result<DumpHashes> {
    let mut crc = crc32fast::Hasher::new();
    let mut sha = sha1::Sha1::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut processed: u64 = 0;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        crc.update(&buf[..n]);
        sha.update(&buf[..n]);
        processed += n as u64;
        progress(processed);
    }

    Ok(DumpHashes {
        crc32: format!("{:08x}", crc.finalize()),
        sha1: format!("{:x}", sha.finalize()),
        data_size: processed,
    })
}

#[cfg(test)]
#[path = "tests/hasher_tests.rs"]
mod tests;
