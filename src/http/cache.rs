//! `ETag` generation and conditional request handling
//!
//! Tags are derived from file metadata (size and modification time), so a
//! revalidation answered with 304 never has to read the file.

use std::time::{SystemTime, UNIX_EPOCH};

/// Quoted `ETag` from a file's length and mtime, e.g. `"1c-65f1a2b3.1e240"`
///
/// Files without a usable mtime are tagged by length alone.
pub fn generate_etag(len: u64, modified: Option<SystemTime>) -> String {
    match modified.and_then(|m| m.duration_since(UNIX_EPOCH).ok()) {
        Some(since) => format!("\"{len:x}-{:x}.{:x}\"", since.as_secs(), since.subsec_nanos()),
        None => format!("\"{len:x}\""),
    }
}

/// True if the client's `If-None-Match` covers `etag` (so a 304 is due)
///
/// Accepts a single tag, a comma-separated list, or `*`. Comparison is weak:
/// a `W/` prefix on either side is ignored.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let etag = strip_weak(etag);
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|e| e == "*" || strip_weak(e) == etag)
    })
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_etag_tracks_length_and_mtime() {
        let mtime = UNIX_EPOCH + Duration::new(1_700_000_000, 500);
        let etag = generate_etag(24, Some(mtime));
        assert_eq!(etag, "\"18-6553f100.1f4\"");
        assert_eq!(etag, generate_etag(24, Some(mtime)));
        assert_ne!(etag, generate_etag(25, Some(mtime)));
        assert_ne!(etag, generate_etag(24, Some(mtime + Duration::from_secs(1))));
    }

    #[test]
    fn test_etag_without_mtime() {
        assert_eq!(generate_etag(255, None), "\"ff\"");
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }
}
