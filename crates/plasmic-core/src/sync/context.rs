//! State threaded through one sync run

use plasmic_fs::{FsTransaction, NormalizedPath};
use tracing::debug;

use crate::config::{Config, Lang, Lock, ProjectLock};
use crate::confirm::Confirmer;
use crate::error::{Error, Result};

use super::engine::{SyncOptions, SyncReport};

/// Everything a sync run reads and mutates.
///
/// Config and lock are loaded once, changed in memory and written back
/// through `tx` at the end of the run.
pub(crate) struct SyncContext<'a> {
    pub root: NormalizedPath,
    pub src_dir: NormalizedPath,
    pub config: Config,
    pub lock: Lock,
    pub tx: FsTransaction,
    pub options: &'a SyncOptions,
    pub confirmer: &'a dyn Confirmer,
    pub report: SyncReport,
    /// Set once any recorded path changed during this run.
    pub paths_changed: bool,
}

impl SyncContext<'_> {
    /// Absolute path of a file recorded relative to `srcDir`.
    pub fn path(&self, relative: &str) -> NormalizedPath {
        self.src_dir.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.tx.exists(&self.path(relative))
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        Ok(self.tx.read_text(&self.path(relative))?)
    }

    /// Write a file under `srcDir`.
    ///
    /// Without `force`, replacing a file with different content needs
    /// confirmation; declining fails with `FileExists`.
    pub fn write(&mut self, relative: &str, content: impl Into<Vec<u8>>, force: bool) -> Result<()> {
        let path = self.path(relative);
        let content = content.into();
        if !force && self.tx.exists(&path) && self.tx.read(&path)? != content {
            let overwrite = self
                .confirmer
                .confirm(&format!("File {relative} already exists. Do you want to overwrite it?"), false)?;
            if !overwrite {
                return Err(Error::FileExists {
                    path: relative.to_string(),
                });
            }
        }
        debug!(path = relative, "writing file");
        self.tx.write(&path, content)?;
        Ok(())
    }

    /// Move a recorded file and mark the run as having changed paths.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.tx.rename(&self.path(from), &self.path(to))?;
        self.paths_changed = true;
        self.report.action(format!("Renamed {from} to {to}"));
        Ok(())
    }

    pub fn delete(&mut self, relative: &str) -> Result<()> {
        self.tx.delete(&self.path(relative))?;
        self.report.action(format!("Deleted {relative}"));
        Ok(())
    }

    /// Point `recorded` at `target`, moving the file if it still exists at
    /// the old location.
    pub fn relocate(&mut self, recorded: &mut String, target: String) -> Result<()> {
        if *recorded == target {
            return Ok(());
        }
        if !recorded.is_empty() && self.exists(recorded) {
            self.rename(recorded, &target)?;
        }
        *recorded = target;
        self.paths_changed = true;
        Ok(())
    }

    /// Position of a tracked project in the config.
    pub fn project_index(&self, project_id: &str) -> Result<usize> {
        self.config
            .projects
            .iter()
            .position(|p| p.project_id == project_id)
            .ok_or_else(|| Error::resolution(format!("project {project_id} is not tracked in plasmic.json")))
    }

    /// Lock entry of a project, created on first use.
    pub fn project_lock(&mut self, project_id: &str, branch_name: &str) -> &mut ProjectLock {
        let lang: Lang = self.config.code.lang;
        self.lock.project_entry(project_id, branch_name, lang)
    }
}
