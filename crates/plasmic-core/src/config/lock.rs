//! Typed model of `plasmic.lock`: what was last synced, exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::Lang;

pub const LOCK_FILE_NAME: &str = "plasmic.lock";

/// Category of a checksummed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileLockKind {
    RenderModule,
    CssRules,
    Icon,
    Image,
    ProjectCss,
    GlobalVariant,
    GlobalContexts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLock {
    #[serde(rename = "type")]
    pub kind: FileLockKind,
    pub asset_id: String,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLock {
    pub project_id: String,
    #[serde(default = "default_branch")]
    pub branch_name: String,
    /// Exact version last synced; empty until the first sync completes.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub lang: Lang,
    #[serde(default)]
    pub file_locks: Vec<FileLock>,
}

impl ProjectLock {
    pub fn new(project_id: impl Into<String>, branch_name: impl Into<String>, lang: Lang) -> Self {
        Self {
            project_id: project_id.into(),
            branch_name: branch_name.into(),
            version: String::new(),
            dependencies: BTreeMap::new(),
            lang,
            file_locks: Vec::new(),
        }
    }

    /// Record the checksum of an asset, replacing any previous one.
    pub fn upsert_file_lock(&mut self, kind: FileLockKind, asset_id: &str, checksum: String) {
        match self
            .file_locks
            .iter_mut()
            .find(|l| l.kind == kind && l.asset_id == asset_id)
        {
            Some(lock) => lock.checksum = checksum,
            None => self.file_locks.push(FileLock {
                kind,
                asset_id: asset_id.to_string(),
                checksum,
            }),
        }
    }

    /// Forget every file lock of `asset_id` whose kind is in `kinds`.
    pub fn remove_file_locks(&mut self, asset_id: &str, kinds: &[FileLockKind]) {
        self.file_locks
            .retain(|l| !(l.asset_id == asset_id && kinds.contains(&l.kind)));
    }

    /// `(asset id, checksum)` pairs of one kind, in lock order.
    pub fn checksums(&self, kind: FileLockKind) -> Vec<(String, String)> {
        self.file_locks
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| (l.asset_id.clone(), l.checksum.clone()))
            .collect()
    }

    pub fn checksum(&self, kind: FileLockKind, asset_id: &str) -> Option<&str> {
        self.file_locks
            .iter()
            .find(|l| l.kind == kind && l.asset_id == asset_id)
            .map(|l| l.checksum.as_str())
    }
}

/// Root of `plasmic.lock`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    #[serde(default)]
    pub projects: Vec<ProjectLock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_version: Option<String>,
}

impl Lock {
    pub fn project(&self, project_id: &str) -> Option<&ProjectLock> {
        self.projects.iter().find(|p| p.project_id == project_id)
    }

    /// Exact version last synced for a project, if any.
    pub fn version_of(&self, project_id: &str) -> Option<&str> {
        self.project(project_id)
            .map(|p| p.version.as_str())
            .filter(|v| !v.is_empty())
    }

    /// The project's entry, created empty when missing.
    pub fn project_entry(&mut self, project_id: &str, branch_name: &str, lang: Lang) -> &mut ProjectLock {
        let index = match self.projects.iter().position(|p| p.project_id == project_id) {
            Some(index) => index,
            None => {
                self.projects
                    .push(ProjectLock::new(project_id, branch_name, lang));
                self.projects.len() - 1
            }
        };
        &mut self.projects[index]
    }
}

fn default_branch() -> String {
    "main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn upsert_replaces_matching_lock() {
        let mut lock = ProjectLock::new("p1", "main", Lang::Ts);
        lock.upsert_file_lock(FileLockKind::RenderModule, "c1", "sha256:aa".into());
        lock.upsert_file_lock(FileLockKind::CssRules, "c1", "sha256:bb".into());
        lock.upsert_file_lock(FileLockKind::RenderModule, "c1", "sha256:cc".into());

        assert_eq!(lock.file_locks.len(), 2);
        assert_eq!(lock.checksum(FileLockKind::RenderModule, "c1"), Some("sha256:cc"));
    }

    #[test]
    fn remove_only_named_kinds() {
        let mut lock = ProjectLock::new("p1", "main", Lang::Ts);
        lock.upsert_file_lock(FileLockKind::RenderModule, "c1", "a".into());
        lock.upsert_file_lock(FileLockKind::CssRules, "c1", "b".into());
        lock.upsert_file_lock(FileLockKind::Icon, "c1", "c".into());

        lock.remove_file_locks("c1", &[FileLockKind::RenderModule, FileLockKind::CssRules]);

        assert_eq!(lock.checksums(FileLockKind::Icon), vec![("c1".into(), "c".into())]);
        assert_eq!(lock.file_locks.len(), 1);
    }

    #[test]
    fn empty_version_counts_as_never_synced() {
        let mut lock = Lock::default();
        lock.project_entry("p1", "main", Lang::Ts);
        assert_eq!(lock.version_of("p1"), None);

        lock.project_entry("p1", "main", Lang::Ts).version = "1.0.0".into();
        assert_eq!(lock.version_of("p1"), Some("1.0.0"));
        assert_eq!(lock.projects.len(), 1);
    }

    #[test]
    fn serializes_camel_case() {
        let mut lock = ProjectLock::new("p1", "main", Lang::Js);
        lock.upsert_file_lock(FileLockKind::ProjectCss, "p1", "x".into());
        let json = serde_json::to_value(&lock).unwrap();
        assert_eq!(json["fileLocks"][0]["type"], "projectCss");
        assert_eq!(json["fileLocks"][0]["assetId"], "p1");
        assert_eq!(json["lang"], "js");
    }
}
