//! Content fingerprints using blake3.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint(b"body{}"); // -> "a1b2c3d4"
//! let tag = hash::etag(b"<html>");       // -> "\"a1b2c3d4e5f60718\""
//! ```

/// Length of the fingerprint embedded in output file names.
pub const FINGERPRINT_LEN: usize = 8;

/// Hex-encoded blake3 digest of `data`.
#[inline]
pub fn hex_digest<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    hex::encode(blake3::hash(data.as_ref()).as_bytes())
}

/// Short content fingerprint for cache-busting file names
/// (e.g. `index-a1b2c3d4.js`).
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let mut digest = hex_digest(data);
    digest.truncate(FINGERPRINT_LEN);
    digest
}

/// Strong HTTP entity tag for `data` (quoted, 16 hex chars).
pub fn etag<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let digest = hex_digest(data);
    format!("\"{}\"", &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint("body { color: red; }");
        let b = fingerprint("body { color: red; }");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(fingerprint("console.log(1)"), fingerprint("console.log(2)"));
    }

    #[test]
    fn test_etag_quoted() {
        let tag = etag("<html></html>");
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag.len(), 18);
    }
}
