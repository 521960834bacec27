//! Source tree listing and basename lookup

use std::collections::BTreeMap;

use walkdir::WalkDir;

use crate::{Error, FsTransaction, NormalizedPath, Result};

/// Decides which files under a source directory are considered.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    extensions: Vec<String>,
    ignored_dirs: Vec<String>,
}

impl SourceFilter {
    /// Accept files with any of `extensions` (without the dot), skipping
    /// `node_modules`.
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            ignored_dirs: vec!["node_modules".to_string()],
        }
    }

    /// Accept a path given relative to the walked directory.
    pub fn accepts(&self, relative: &NormalizedPath) -> bool {
        let ext_ok = relative
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext));
        ext_ok
            && !relative
                .as_str()
                .split('/')
                .any(|segment| self.skips_dir(segment))
    }

    fn skips_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }
}

/// List files on disk under `dir` accepted by `filter`.
///
/// A missing directory yields an empty list.
pub fn walk_disk(dir: &NormalizedPath, filter: &SourceFilter) -> Result<Vec<NormalizedPath>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir.to_native())
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !filter.skips_dir(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(|p| p.to_path_buf()).unwrap_or_else(|| dir.to_native());
            Error::io(path, std::io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = NormalizedPath::new(entry.path());
        if let Some(relative) = path.relative_to(dir)
            && filter.accepts(&relative)
        {
            files.push(path);
        }
    }

    Ok(files)
}

/// Files under a directory grouped by their file name.
///
/// Used to detect files the user moved: a tracked file that is missing at
/// its recorded location but has exactly one namesake elsewhere in the tree
/// was most likely moved there.
#[derive(Debug, Clone, Default)]
pub struct BaseNameIndex {
    by_name: BTreeMap<String, Vec<NormalizedPath>>,
}

impl BaseNameIndex {
    /// Index every file under `dir` visible to `tx`.
    pub fn build(tx: &FsTransaction, dir: &NormalizedPath, filter: &SourceFilter) -> Result<Self> {
        let mut by_name: BTreeMap<String, Vec<NormalizedPath>> = BTreeMap::new();
        for path in tx.list_files(dir, filter)? {
            if let Some(name) = path.file_name() {
                by_name.entry(name.to_string()).or_default().push(path.clone());
            }
        }
        Ok(Self { by_name })
    }

    /// Every indexed file named `file_name`.
    pub fn candidates(&self, file_name: &str) -> &[NormalizedPath] {
        self.by_name
            .get(file_name)
            .map(|paths| paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
