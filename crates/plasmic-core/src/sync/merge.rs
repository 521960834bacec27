//! Direct-scheme merges
//!
//! Skeletons of direct-scheme components are user-edited. They are merged
//! against the new generated code after every destination path is final,
//! so both sides carry the same import paths. The common ancestor is the
//! skeleton the server generated at the revision stamped in the file.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use plasmic_code::{MergeOutcome, find_managed_jsx_revision, restore_markers, strip_markers, three_way_merge};
use plasmic_fs::NormalizedPath;
use tracing::{debug, warn};

use crate::api::{PlasmicApi, ProjectSyncMetadata};
use crate::error::{Error, Result};
use crate::fixup::{ImportTargets, fix_imports_in_source};

use super::context::SyncContext;

/// A skeleton waiting to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMerge {
    pub component_id: String,
    pub project_id: String,
    pub branch_name: String,
    /// Skeleton path relative to `srcDir`.
    pub path: String,
    /// Current content on disk.
    pub edited: String,
    /// Newly generated skeleton.
    pub new: String,
}

/// Both sides of one merge, keyed by component id in [`CodeMerger::merge_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFile {
    pub edited: String,
    pub new: String,
}

/// Source of merge bases.
pub trait MetadataProvider {
    /// Base skeletons of a project at `revision`, `None` when the server no
    /// longer has them.
    fn sync_metadata(&self, project_id: &str, branch_name: &str, revision: u64) -> Result<Option<ProjectSyncMetadata>>;
}

/// Fetches merge bases from the server, once per revision.
pub struct ApiMetadataProvider<'a> {
    api: &'a dyn PlasmicApi,
    cache: RefCell<HashMap<(String, String, u64), Option<ProjectSyncMetadata>>>,
}

impl<'a> ApiMetadataProvider<'a> {
    pub fn new(api: &'a dyn PlasmicApi) -> Self {
        Self {
            api,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl MetadataProvider for ApiMetadataProvider<'_> {
    fn sync_metadata(&self, project_id: &str, branch_name: &str, revision: u64) -> Result<Option<ProjectSyncMetadata>> {
        let key = (project_id.to_string(), branch_name.to_string(), revision);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let metadata = match self.api.project_sync_metadata(project_id, branch_name, revision) {
            Ok(metadata) => Some(metadata),
            Err(Error::AppServer { status, message }) => {
                debug!(project_id, revision, status, %message, "merge base unavailable");
                None
            }
            Err(e) => return Err(e),
        };
        self.cache.borrow_mut().insert(key, metadata.clone());
        Ok(metadata)
    }
}

/// Produces merged skeletons.
///
/// Components missing from the returned map had no usable merge base.
pub trait CodeMerger {
    fn merge_files(
        &self,
        project_id: &str,
        branch_name: &str,
        files: &BTreeMap<String, MergeFile>,
        metadata: &dyn MetadataProvider,
    ) -> Result<BTreeMap<String, MergeOutcome>>;
}

/// Line-based three-way merge against the revision stamped in each file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineMerger;

impl CodeMerger for LineMerger {
    fn merge_files(
        &self,
        project_id: &str,
        branch_name: &str,
        files: &BTreeMap<String, MergeFile>,
        metadata: &dyn MetadataProvider,
    ) -> Result<BTreeMap<String, MergeOutcome>> {
        let mut merged = BTreeMap::new();
        for (component_id, file) in files {
            let Some(revision) = find_managed_jsx_revision(&file.edited) else {
                debug!(component_id, "no managed-jsx revision in edited file");
                continue;
            };
            let Some(meta) = metadata.sync_metadata(project_id, branch_name, revision)? else {
                continue;
            };
            let Some(base) = meta.components.get(component_id) else {
                continue;
            };
            merged.insert(component_id.clone(), three_way_merge(base, &file.edited, &file.new));
        }
        Ok(merged)
    }
}

/// Hands the merger bases with imports in the same shape as both sides.
struct PreparedMetadata<'a> {
    inner: &'a dyn MetadataProvider,
    targets: &'a ImportTargets<'a>,
    src_dir: &'a NormalizedPath,
    /// Component id to skeleton path.
    paths: &'a HashMap<String, String>,
}

impl MetadataProvider for PreparedMetadata<'_> {
    fn sync_metadata(&self, project_id: &str, branch_name: &str, revision: u64) -> Result<Option<ProjectSyncMetadata>> {
        let Some(mut meta) = self.inner.sync_metadata(project_id, branch_name, revision)? else {
            return Ok(None);
        };
        for (component_id, base) in meta.components.iter_mut() {
            let Some(path) = self.paths.get(component_id) else {
                continue;
            };
            // Bases may reference components this project no longer has
            let prepared = match fix_imports_in_source(self.targets, self.src_dir, path, base, true) {
                Ok(Some(fixed)) => fixed,
                Ok(None) => continue,
                Err(_) => strip_markers(path, base)?,
            };
            *base = prepared;
        }
        Ok(Some(meta))
    }
}

/// What a merge decided to put on disk.
struct MergeWrite {
    path: String,
    content: String,
}

/// Run every pending merge and write the results.
pub(crate) fn resolve_pending_merges(
    ctx: &mut SyncContext<'_>,
    merger: &dyn CodeMerger,
    metadata: &dyn MetadataProvider,
    pending: Vec<PendingMerge>,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let mut groups: BTreeMap<(String, String), Vec<PendingMerge>> = BTreeMap::new();
    for job in pending {
        groups
            .entry((job.project_id.clone(), job.branch_name.clone()))
            .or_default()
            .push(job);
    }

    let mut writes = Vec::new();
    let mut warnings = Vec::new();
    {
        let targets = ImportTargets::new(&ctx.config);
        for ((project_id, branch_name), jobs) in &groups {
            let paths: HashMap<String, String> = jobs
                .iter()
                .map(|job| (job.component_id.clone(), job.path.clone()))
                .collect();
            let mut files = BTreeMap::new();
            let mut references = HashMap::new();
            for job in jobs {
                let edited = fix_imports_in_source(&targets, &ctx.src_dir, &job.path, &job.edited, true)?
                    .unwrap_or_else(|| job.edited.clone());
                let new_fixed = fix_imports_in_source(&targets, &ctx.src_dir, &job.path, &job.new, false)?
                    .unwrap_or_else(|| job.new.clone());
                let new = strip_markers(&job.path, &new_fixed)?;
                files.insert(job.component_id.clone(), MergeFile { edited, new });
                references.insert(job.component_id.clone(), new_fixed);
            }

            let prepared = PreparedMetadata {
                inner: metadata,
                targets: &targets,
                src_dir: &ctx.src_dir,
                paths: &paths,
            };
            let mut merged = merger.merge_files(project_id, branch_name, &files, &prepared)?;

            for job in jobs {
                match merged.remove(&job.component_id) {
                    Some(outcome) => {
                        let reference = references.get(&job.component_id).unwrap_or(&job.new);
                        let content = restore_markers(&job.path, &outcome.merged, reference)?;
                        if !outcome.is_clean() {
                            warnings.push(format!(
                                "{} had {} conflicting change(s) with the new version; your edits were kept. \
                                 Please review the file.",
                                job.path, outcome.conflicts
                            ));
                        }
                        writes.push(MergeWrite {
                            path: job.path.clone(),
                            content,
                        });
                    }
                    None => writes.push(missing_base(ctx, job, &mut warnings)?),
                }
            }
        }
    }

    for warning in warnings {
        ctx.report.warn(warning);
    }
    for write in writes {
        ctx.write(&write.path, write.content, true)?;
    }
    Ok(())
}

/// No merge base: overwrite, append or give up.
fn missing_base(ctx: &SyncContext<'_>, job: &PendingMerge, warnings: &mut Vec<String>) -> Result<MergeWrite> {
    if ctx.options.force_overwrite {
        warn!(path = %job.path, "overwriting edited file without a merge base");
        warnings.push(format!(
            "Cannot merge {} without its base version; overwrote it with the new version since --force-overwrite \
             was given. Your edits are lost.",
            job.path
        ));
        return Ok(MergeWrite {
            path: job.path.clone(),
            content: job.new.clone(),
        });
    }
    if ctx.options.append_jsx_on_missing_base {
        warnings.push(format!(
            "Cannot merge {} without its base version; appended the new version as comments. Please merge them \
             by hand.",
            job.path
        ));
        let commented: String = job.new.lines().map(|line| format!("// {line}\n")).collect();
        return Ok(MergeWrite {
            path: job.path.clone(),
            content: format!("{}\n\n{commented}", job.edited.trim_end()),
        });
    }
    Err(Error::MergeBaseUnavailable {
        component_id: job.component_id.clone(),
        path: job.path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FixedMetadata(ProjectSyncMetadata);

    impl MetadataProvider for FixedMetadata {
        fn sync_metadata(&self, _: &str, _: &str, revision: u64) -> Result<Option<ProjectSyncMetadata>> {
            Ok((revision == self.0.revision).then(|| self.0.clone()))
        }
    }

    fn metadata(base: &str) -> FixedMetadata {
        FixedMetadata(ProjectSyncMetadata {
            project_id: "p1".into(),
            revision: 3,
            components: BTreeMap::from([("c1".to_string(), base.to_string())]),
        })
    }

    #[test]
    fn line_merger_keeps_both_sides() {
        let base = "// plasmic-managed-jsx/3\na\nb\nc\n";
        let edited = "// plasmic-managed-jsx/3\na\nb (mine)\nc\n";
        let new = "// plasmic-managed-jsx/4\na\nb\nc\nd\n";
        let files = BTreeMap::from([(
            "c1".to_string(),
            MergeFile {
                edited: edited.into(),
                new: new.into(),
            },
        )]);

        let merged = LineMerger.merge_files("p1", "main", &files, &metadata(base)).unwrap();

        let outcome = &merged["c1"];
        assert!(outcome.is_clean());
        assert_eq!(outcome.merged, "// plasmic-managed-jsx/4\na\nb (mine)\nc\nd\n");
    }

    #[test]
    fn unknown_revision_has_no_result() {
        let files = BTreeMap::from([(
            "c1".to_string(),
            MergeFile {
                edited: "// plasmic-managed-jsx/9\nx\n".into(),
                new: "// plasmic-managed-jsx/10\ny\n".into(),
            },
        )]);

        let merged = LineMerger.merge_files("p1", "main", &files, &metadata("")).unwrap();

        assert!(merged.is_empty());
    }

    #[test]
    fn unstamped_file_has_no_result() {
        let files = BTreeMap::from([(
            "c1".to_string(),
            MergeFile {
                edited: "x\n".into(),
                new: "y\n".into(),
            },
        )]);

        let merged = LineMerger.merge_files("p1", "main", &files, &metadata("")).unwrap();

        assert!(merged.is_empty());
    }
}
