//! Buffered file-system transaction
//!
//! A sync run performs dozens of file operations. Routing them through an
//! [`FsTransaction`] keeps them in memory until [`FsTransaction::commit`],
//! so a failure anywhere in the run leaves the disk untouched and a dev
//! server watching the tree sees one burst of changes instead of a trickle.
//!
//! Reads see pending content first, then the disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use tracing::debug;

use crate::walk::{self, SourceFilter};
use crate::{Error, NormalizedPath, Result, io};

/// What happened to a file when the transaction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Written,
    Deleted,
}

/// A single file-system effect of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: NormalizedPath,
    pub kind: FileChangeKind,
}

#[derive(Debug, Clone)]
enum Pending {
    Write(Vec<u8>),
    /// Content lives on disk at another path until commit.
    MovedFrom(NormalizedPath),
    Delete,
}

/// Write-batching view over the file system.
///
/// Dropping a transaction without committing discards every pending change.
#[derive(Debug)]
pub struct FsTransaction {
    buffered: bool,
    pending: BTreeMap<NormalizedPath, Pending>,
    /// Effects already applied in unbuffered mode.
    applied: Vec<FileChange>,
}

impl Default for FsTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl FsTransaction {
    /// Start a buffered transaction.
    pub fn new() -> Self {
        Self {
            buffered: true,
            pending: BTreeMap::new(),
            applied: Vec::new(),
        }
    }

    /// A pass-through transaction that applies every operation immediately.
    pub fn unbuffered() -> Self {
        Self {
            buffered: false,
            pending: BTreeMap::new(),
            applied: Vec::new(),
        }
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Number of paths with pending changes.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether the file exists in the transaction's view.
    pub fn exists(&self, path: &NormalizedPath) -> bool {
        match self.pending.get(path) {
            Some(Pending::Write(_)) | Some(Pending::MovedFrom(_)) => true,
            Some(Pending::Delete) => false,
            None => path.is_file(),
        }
    }

    /// Read raw bytes, preferring pending content over the disk.
    pub fn read(&self, path: &NormalizedPath) -> Result<Vec<u8>> {
        match self.pending.get(path) {
            Some(Pending::Write(content)) => Ok(content.clone()),
            Some(Pending::MovedFrom(source)) => io::read_bytes(source),
            Some(Pending::Delete) => Err(Error::not_found(path.to_native())),
            None => io::read_bytes(path),
        }
    }

    /// Read UTF-8 text, preferring pending content over the disk.
    pub fn read_text(&self, path: &NormalizedPath) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            Error::io(
                path.to_native(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Replace the content of `path`.
    pub fn write(&mut self, path: &NormalizedPath, content: impl Into<Vec<u8>>) -> Result<()> {
        let content = content.into();
        if !self.buffered {
            if write_if_changed(path, &content)? {
                self.applied.push(FileChange {
                    path: path.clone(),
                    kind: FileChangeKind::Written,
                });
            }
            return Ok(());
        }
        debug!(path = %path, bytes = content.len(), "buffering write");
        self.pending.insert(path.clone(), Pending::Write(content));
        Ok(())
    }

    /// Move `from` to `to`, replacing anything at `to`.
    pub fn rename(&mut self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if !self.exists(from) {
            return Err(Error::not_found(from.to_native()));
        }

        if !self.buffered {
            let target = to.to_native();
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fs::rename(from.to_native(), &target).map_err(|e| Error::io(target, e))?;
            self.applied.push(FileChange {
                path: to.clone(),
                kind: FileChangeKind::Written,
            });
            self.applied.push(FileChange {
                path: from.clone(),
                kind: FileChangeKind::Deleted,
            });
            return Ok(());
        }

        debug!(from = %from, to = %to, "buffering rename");
        let moved = match self.pending.get(from) {
            Some(Pending::Write(content)) => Pending::Write(content.clone()),
            Some(Pending::MovedFrom(source)) => Pending::MovedFrom(source.clone()),
            _ => Pending::MovedFrom(from.clone()),
        };
        self.pending.insert(to.clone(), moved);
        self.pending.insert(from.clone(), Pending::Delete);
        Ok(())
    }

    /// Remove `path`.
    pub fn delete(&mut self, path: &NormalizedPath) -> Result<()> {
        if !self.exists(path) {
            return Err(Error::not_found(path.to_native()));
        }
        if !self.buffered {
            let native = path.to_native();
            fs::remove_file(&native).map_err(|e| Error::io(native, e))?;
            self.applied.push(FileChange {
                path: path.clone(),
                kind: FileChangeKind::Deleted,
            });
            return Ok(());
        }
        debug!(path = %path, "buffering delete");
        self.pending.insert(path.clone(), Pending::Delete);
        Ok(())
    }

    /// List files under `dir` accepted by `filter`, as seen by this
    /// transaction.
    pub fn list_files(&self, dir: &NormalizedPath, filter: &SourceFilter) -> Result<Vec<NormalizedPath>> {
        let mut files: BTreeSet<NormalizedPath> =
            walk::walk_disk(dir, filter)?.into_iter().collect();

        for (path, pending) in &self.pending {
            let Some(relative) = path.relative_to(dir) else {
                continue;
            };
            match pending {
                Pending::Delete => {
                    files.remove(path);
                }
                _ if filter.accepts(&relative) => {
                    files.insert(path.clone());
                }
                _ => {}
            }
        }

        Ok(files.into_iter().collect())
    }

    /// Apply every pending change to disk.
    ///
    /// Writes whose content already matches the file on disk are skipped,
    /// so committing a no-op run touches nothing.
    pub fn commit(mut self) -> Result<Vec<FileChange>> {
        let pending = std::mem::take(&mut self.pending);
        let mut changes = std::mem::take(&mut self.applied);

        // Moved sources must be read before anything overwrites them
        let mut writes: Vec<(NormalizedPath, Vec<u8>)> = Vec::new();
        let mut deletes: Vec<NormalizedPath> = Vec::new();
        for (path, pending) in pending {
            match pending {
                Pending::Write(content) => writes.push((path, content)),
                Pending::MovedFrom(source) => {
                    let content = io::read_bytes(&source)?;
                    writes.push((path, content));
                }
                Pending::Delete => deletes.push(path),
            }
        }

        for (path, content) in writes {
            if write_if_changed(&path, &content)? {
                changes.push(FileChange {
                    path,
                    kind: FileChangeKind::Written,
                });
            }
        }

        for path in deletes {
            let native = path.to_native();
            match fs::remove_file(&native) {
                Ok(()) => changes.push(FileChange {
                    path,
                    kind: FileChangeKind::Deleted,
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(native, e)),
            }
        }

        debug!(changes = changes.len(), "transaction committed");
        Ok(changes)
    }

    /// Drop every pending change.
    pub fn discard(mut self) {
        self.pending.clear();
    }
}

impl Drop for FsTransaction {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            debug!(pending = self.pending.len(), "discarding uncommitted changes");
        }
    }
}

/// Returns whether the file was actually written.
fn write_if_changed(path: &NormalizedPath, content: &[u8]) -> Result<bool> {
    if let Ok(existing) = fs::read(path.to_native())
        && existing == content
    {
        return Ok(false);
    }
    io::write_atomic(path, content)?;
    Ok(true)
}
