//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Paths are cleaned lexically on construction: repeated separators and `.`
/// segments are dropped and `..` segments are folded where possible. Config
/// files store paths such as `./src/components/Button.tsx`; comparing two
/// spellings of the same location only works once both are normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&raw),
        }
    }

    /// Resolve symlinks and make the path absolute.
    ///
    /// Uses `dunce` so Windows paths do not gain a `\\?\` prefix.
    pub fn canonicalize(&self) -> Result<Self> {
        let native = self.to_native();
        dunce::canonicalize(&native)
            .map(Self::new)
            .map_err(|e| Error::io(native, e))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    ///
    /// An absolute segment replaces the base entirely.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        if is_absolute_str(&segment) {
            return Self::new(segment);
        }
        if self.inner == "." {
            return Self::new(segment);
        }
        Self::new(format!("{}/{}", self.inner, segment))
    }

    /// Get the parent directory.
    ///
    /// A single relative segment has `.` as its parent.
    pub fn parent(&self) -> Option<Self> {
        if self.inner == "." || self.inner == "/" {
            return None;
        }
        match self.inner.rfind('/') {
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => Some(Self {
                inner: ".".to_string(),
            }),
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        if self.inner == "." || self.inner == "/" {
            return None;
        }
        self.inner.rsplit('/').next()
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }

    /// Remove the file extension. With `composed`, everything from the
    /// first dot of the file name is removed (`a.module.css` -> `a`).
    pub fn strip_extension(&self, composed: bool) -> Self {
        Self {
            inner: strip_extension(&self.inner, composed),
        }
    }

    /// Replace the extension, including composed ones, with `ext`.
    ///
    /// `ext` carries its leading dot, e.g. `.module.css`.
    pub fn with_extension(&self, ext: &str) -> Self {
        Self {
            inner: format!("{}{}", strip_extension(&self.inner, true), ext),
        }
    }

    /// Express this path relative to `base`, if it lives under it.
    pub fn relative_to(&self, base: &NormalizedPath) -> Option<Self> {
        if self == base {
            return Some(Self {
                inner: ".".to_string(),
            });
        }
        let rest = if base.inner == "/" {
            self.inner.strip_prefix('/')?
        } else {
            self.inner
                .strip_prefix(base.inner.as_str())?
                .strip_prefix('/')?
        };
        Some(Self {
            inner: rest.to_string(),
        })
    }

    /// Whether this path equals `base` or lives underneath it.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        self.relative_to(base).is_some()
    }

    /// Whether the path is absolute (unix root or a Windows drive).
    pub fn is_absolute(&self) -> bool {
        is_absolute_str(&self.inner)
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Compute the relative path from directory `from_dir` to `to`.
///
/// Both paths must share the same base (both absolute, or both relative to
/// the same directory). Returns `""` when they are equal, like Node's
/// `path.relative`.
pub fn relative_path(from_dir: &NormalizedPath, to: &NormalizedPath) -> String {
    let from: Vec<&str> = segments(&from_dir.inner);
    let target: Vec<&str> = segments(&to.inner);

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from.len() {
        parts.push("..");
    }
    parts.extend(&target[common..]);
    parts.join("/")
}

/// Relative module path suitable for an `import` statement: always starts
/// with `./` or `../`.
pub fn relative_import_path(from_dir: &NormalizedPath, to: &NormalizedPath) -> String {
    let relative = relative_path(from_dir, to);
    if relative.starts_with('.') {
        relative
    } else {
        format!("./{relative}")
    }
}

/// Remove the extension of a raw path string.
///
/// Works on unnormalized strings so module paths like `./Button.tsx` keep
/// their leading `./`.
pub fn strip_extension(path: &str, composed: bool) -> String {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    let dot = if composed {
        name.char_indices()
            .skip(1)
            .find(|(_, c)| *c == '.')
            .map(|(i, _)| i)
    } else {
        name.rfind('.').filter(|&i| i > 0)
    };
    match dot {
        Some(i) => path[..name_start + i].to_string(),
        None => path.to_string(),
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

fn is_absolute_str(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/') || (bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic())
}

fn clean(raw: &str) -> String {
    let slashed = raw.replace('\\', "/");
    let (prefix, rest) = if slashed.starts_with("//") && !slashed.starts_with("///") {
        ("//", &slashed[2..])
    } else if slashed.starts_with('/') {
        ("/", slashed.trim_start_matches('/'))
    } else {
        ("", slashed.as_str())
    };

    let mut parts: Vec<&str> = Vec::new();
    for seg in rest.split('/') {
        match seg {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if prefix.is_empty() => parts.push(".."),
                // Cannot climb above the root
                _ => {}
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (prefix, body.is_empty()) {
        ("", true) => ".".to_string(),
        (p, true) => p.to_string(),
        (p, false) => format!("{p}{body}"),
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_drops_dot_segments() {
        assert_eq!(NormalizedPath::new("./src/./components").as_str(), "src/components");
        assert_eq!(NormalizedPath::new("a/b/../c").as_str(), "a/c");
        assert_eq!(NormalizedPath::new("../a").as_str(), "../a");
        assert_eq!(NormalizedPath::new("/../a").as_str(), "/a");
        assert_eq!(NormalizedPath::new("").as_str(), ".");
    }

    #[test]
    fn strip_extension_simple_and_composed() {
        assert_eq!(strip_extension("./Button.tsx", false), "./Button");
        assert_eq!(strip_extension("a/b.module.css", false), "a/b.module");
        assert_eq!(strip_extension("a/b.module.css", true), "a/b");
        assert_eq!(strip_extension("a.b/.hidden", false), "a.b/.hidden");
        assert_eq!(strip_extension("noext", true), "noext");
    }

    #[test]
    fn relative_path_walks_up() {
        let from = NormalizedPath::new("/root/src/pages");
        let to = NormalizedPath::new("/root/src/components/Button.tsx");
        assert_eq!(relative_path(&from, &to), "../components/Button.tsx");
        assert_eq!(
            relative_import_path(&NormalizedPath::new("/root/src"), &to),
            "./components/Button.tsx"
        );
    }
}
