/// Format a byte count as a human-readable size string (e.g., "8 KB", "2 MB").
///
/// Uses exact integer division: values that aren't clean multiples of KB/MB
/// are shown in bytes.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 && bytes.is_multiple_of(1024 * 1024) {
        format!("{} MB", bytes / (1024 * 1024))
    } else if bytes >= 1024 && bytes.is_multiple_of(1024) {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Read a fixed-length ASCII string from a byte slice.
///
/// Non-printable bytes are replaced with spaces, then the result is trimmed.
/// Header fields are padded with 0x00 or 0xFF rather than null-terminated,
/// so the whole slice is processed.
pub fn read_ascii_fixed(buf: &[u8]) -> String {
    let s: String = buf
        .iter()
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                b as char
            } else {
                ' '
            }
        })
        .collect();
    s.trim().to_string()
}

/// Turn a cartridge title into something safe to use as a file stem.
///
/// Path separators and characters reserved on common filesystems become
/// underscores; surrounding whitespace and dots are dropped.
pub fn sanitize_file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(8192), "8 KB");
        assert_eq!(format_bytes(32768), "32 KB");
        assert_eq!(format_bytes(1048576), "1 MB");
        assert_eq!(format_bytes(8388608), "8 MB");
        assert_eq!(format_bytes(1025), "1025 bytes");
    }

    #[test]
    fn test_read_ascii_fixed() {
        assert_eq!(read_ascii_fixed(b"HELLO\0\0\0"), "HELLO");
        assert_eq!(read_ascii_fixed(b"\xFF\xFFABC\xFF\xFF"), "ABC");
        assert_eq!(read_ascii_fixed(b"  PADDED  "), "PADDED");
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("TETRIS"), "TETRIS");
        assert_eq!(sanitize_file_stem("A/B:C"), "A_B_C");
        assert_eq!(sanitize_file_stem("  ..HIDDEN.. "), "HIDDEN");
        assert_eq!(sanitize_file_stem(""), "");
    }
}
