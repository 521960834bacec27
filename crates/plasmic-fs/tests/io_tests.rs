//! Tests for atomic I/O

use plasmic_fs::{Error, NormalizedPath, io};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_parent_dirs() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("plasmic/proj/PlasmicButton.tsx"));

    io::write_atomic(&path, b"export {}").unwrap();

    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "export {}");
}

#[test]
fn test_write_atomic_overwrites_and_leaves_no_temp() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("plasmic.json");
    fs::write(&file_path, "original").unwrap();

    io::write_atomic(&NormalizedPath::new(&file_path), b"updated").unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[test]
fn test_write_private_restricts_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join(".plasmic.auth"));
    io::write_private(&path, b"{}").unwrap();

    let mode = fs::metadata(path.to_native()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_read_text_missing_is_not_found() {
    let path = NormalizedPath::new("/nonexistent/plasmic.json");
    assert!(matches!(io::read_text(&path), Err(Error::NotFound { .. })));
    assert!(io::read_text_optional(&path).unwrap().is_none());
}
