//! SHA-256 checksums in the canonical `sha256:<hex>` format
//!
//! Lock files record one checksum per synced file so later runs can tell
//! whether the content on disk still matches what was last written.

use sha2::{Digest, Sha256};

use crate::{Error, NormalizedPath, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the checksum of raw bytes.
pub fn compute_checksum(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the checksum of a file's contents.
pub fn compute_file_checksum(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    let content = std::fs::read(&native).map_err(|e| Error::io(native, e))?;
    Ok(compute_checksum(content))
}

/// Whether `checksum` was produced from `content`.
pub fn matches(checksum: &str, content: impl AsRef<[u8]>) -> bool {
    checksum == compute_checksum(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_known_value() {
        assert_eq!(
            compute_checksum("hello world"),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn bytes_and_str_agree() {
        assert_eq!(compute_checksum(b"abc".to_vec()), compute_checksum("abc"));
        assert!(matches(&compute_checksum("abc"), "abc"));
        assert!(!matches(&compute_checksum("abc"), "abd"));
    }

    #[test]
    fn file_checksum_matches_content_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("Button.tsx"));
        std::fs::write(path.to_native(), "export default 1;").unwrap();

        assert_eq!(
            compute_file_checksum(&path).unwrap(),
            compute_checksum("export default 1;")
        );
    }
}
