//! SyncEngine implementation
//!
//! One call to [`SyncEngine::sync`] is one transaction: every file it
//! touches is buffered and flushed only after the whole run succeeded.

use std::collections::BTreeSet;

use plasmic_fs::{FileChange, FileChangeKind, FsTransaction, NormalizedPath};
use semver::Version;
use tracing::{info, warn};

use crate::api::PlasmicApi;
use crate::config::{ComponentScheme, Config, StateStore};
use crate::confirm::Confirmer;
use crate::error::{Error, Result};
use crate::hooks::{self, HookContext, HookResult};
use crate::resolve::{self, ProjectSpec, ResolveOptions, SyncTarget, VersionResolver};
use crate::{fixup, packages, paths};

use super::components::UpdateSummary;
use super::context::SyncContext;
use super::merge::{self, ApiMetadataProvider, CodeMerger, LineMerger};
use super::project;

/// Version of this tool, as recorded in plasmic.json and plasmic.lock.
pub fn tool_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// A project written by a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedProject {
    pub project_id: String,
    pub project_name: String,
    pub version: String,
}

/// Report from a sync operation
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Actions taken during the operation
    pub actions: Vec<String>,
    /// Problems that did not stop the sync
    pub warnings: Vec<String>,
    pub synced: Vec<SyncedProject>,
    /// Files written or deleted when the transaction was flushed
    pub changes: Vec<FileChange>,
    /// Post-sync commands that ran
    pub hooks: Vec<HookResult>,
    /// Nothing needed syncing
    pub up_to_date: bool,
}

impl SyncReport {
    /// Record an action and log it.
    pub fn action(&mut self, action: impl Into<String>) {
        let action = action.into();
        info!("{action}");
        self.actions.push(action);
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add an action to the report
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn files_written(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.kind == FileChangeKind::Written)
            .count()
    }

    pub fn files_deleted(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.kind == FileChangeKind::Deleted)
            .count()
    }
}

/// Options for a sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Directory to start looking for plasmic.json from.
    pub base_dir: NormalizedPath,
    /// Use this plasmic.json instead of searching for one.
    pub config_path: Option<NormalizedPath>,
    pub projects: Vec<ProjectSpec>,
    /// Restrict the sync to these component ids or names.
    pub components: Vec<String>,
    pub force: bool,
    /// Replace skeleton files that cannot be merged.
    pub force_overwrite: bool,
    pub recursive: bool,
    /// Scheme for components synced for the first time.
    pub new_component_scheme: Option<ComponentScheme>,
    /// Keep local edits and append the generated code as comments when a
    /// merge base is unavailable.
    pub append_jsx_on_missing_base: bool,
    pub ignore_post_sync: bool,
    pub skip_upgrade_check: bool,
    /// Write files as they are produced instead of at the end.
    pub skip_buffering: bool,
}

impl SyncOptions {
    pub fn new(base_dir: impl Into<NormalizedPath>) -> Self {
        Self {
            base_dir: base_dir.into(),
            config_path: None,
            projects: Vec::new(),
            components: Vec::new(),
            force: false,
            force_overwrite: false,
            recursive: true,
            new_component_scheme: None,
            append_jsx_on_missing_base: false,
            ignore_post_sync: false,
            skip_upgrade_check: false,
            skip_buffering: false,
        }
    }
}

/// Engine for syncing Plasmic projects into a source tree
pub struct SyncEngine<'a> {
    api: &'a dyn PlasmicApi,
    confirmer: &'a dyn Confirmer,
    merger: Box<dyn CodeMerger + 'a>,
    tool_version: Version,
}

impl<'a> SyncEngine<'a> {
    pub fn new(api: &'a dyn PlasmicApi, confirmer: &'a dyn Confirmer) -> Self {
        Self {
            api,
            confirmer,
            merger: Box::new(LineMerger),
            tool_version: tool_version(),
        }
    }

    /// Use another merge collaborator for direct-scheme components.
    pub fn with_merger(mut self, merger: impl CodeMerger + 'a) -> Self {
        self.merger = Box::new(merger);
        self
    }

    /// Pretend to be another tool version.
    pub fn with_tool_version(mut self, version: Version) -> Self {
        self.tool_version = version;
        self
    }

    /// Run a sync.
    ///
    /// # Errors
    ///
    /// Any error aborts the run before the transaction is flushed, leaving
    /// the source tree untouched. Post-sync command failures are reported
    /// after the files were written.
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let store = locate(options)?;
        info!(config = %store.config_path(), "starting sync");

        let config = store.load_config(&self.tool_version)?;
        let lock = store.load_lock()?;
        let mut report = SyncReport::default();
        if !options.skip_upgrade_check {
            packages::ensure_required_packages(self.api, store.root(), &self.tool_version, &mut report)?;
        }

        let tx = if options.skip_buffering {
            FsTransaction::unbuffered()
        } else {
            FsTransaction::new()
        };
        let mut ctx = SyncContext {
            root: store.root().clone(),
            src_dir: store.src_dir(&config),
            config,
            lock,
            tx,
            options,
            confirmer: self.confirmer,
            report,
            paths_changed: false,
        };

        // Extension renames change basenames, so they go first
        let renamed = paths::fix_file_extensions(&mut ctx.config, &mut ctx.tx, &ctx.src_dir, &mut ctx.report);
        paths::assert_paths_in_root(&ctx.config, &ctx.root, &ctx.src_dir)?;
        let moved = paths::repair_paths(&mut ctx.config, &ctx.tx, &ctx.src_dir, &mut ctx.report)?;
        ctx.paths_changed = renamed || moved;

        let targets = resolve::sync_targets(&options.projects, &ctx.config)?;
        let resolver = VersionResolver::new(
            &ctx.config,
            &ctx.lock,
            self.confirmer,
            ResolveOptions {
                force: options.force,
                recursive: options.recursive,
                component_filter: (!options.components.is_empty()).then(|| options.components.clone()),
            },
        );
        let projects = resolver.resolve(self.api, &targets, &mut ctx.report)?;

        if projects.is_empty() {
            ctx.report.up_to_date = true;
            ctx.report
                .action("Your projects are up-to-date with the Plasmic app. Nothing to sync.");
            if ctx.paths_changed {
                store.write_config(&mut ctx.tx, &ctx.config)?;
                let warnings = fixup::fix_all_import_statements(&ctx.config, &mut ctx.tx, &ctx.src_dir, None)?;
                warnings.into_iter().for_each(|w| ctx.report.warn(w));
            }
            return commit(ctx);
        }

        let mut summary = UpdateSummary::new();
        let mut pending = Vec::new();
        let mut npm_packages = BTreeSet::new();
        for meta in &projects {
            let used = project::sync_project(&mut ctx, self.api, meta, &mut summary, &mut pending)?;
            npm_packages.extend(used);
        }

        materialize_schemes(&mut ctx.config);
        project::sync_style_config(&mut ctx, self.api)?;
        record_requested_versions(&mut ctx.config, &targets);
        let version = self.tool_version.to_string();
        ctx.config.cli_version = Some(version.clone());
        ctx.lock.cli_version = Some(version);
        store.write_config(&mut ctx.tx, &ctx.config)?;
        store.write_lock(&mut ctx.tx, &ctx.lock)?;

        let metadata = ApiMetadataProvider::new(self.api);
        merge::resolve_pending_merges(&mut ctx, self.merger.as_ref(), &metadata, pending)?;

        // Moved files can be imported from anywhere, so every file is checked
        let summary = (!ctx.paths_changed).then_some(&summary);
        let warnings = fixup::fix_all_import_statements(&ctx.config, &mut ctx.tx, &ctx.src_dir, summary)?;
        warnings.into_iter().for_each(|w| ctx.report.warn(w));

        let missing = packages::missing_packages(&ctx.root, npm_packages.iter().map(String::as_str));
        if !missing.is_empty() {
            ctx.report.warn(format!(
                "The synced code uses packages that are not installed: {}. Please install them.",
                missing.join(", ")
            ));
        }

        let commands = ctx.config.post_sync_commands.clone();
        let root = ctx.root.clone();
        let mut report = commit(ctx)?;

        if !options.ignore_post_sync && !commands.is_empty() {
            let ids: Vec<&str> = report.synced.iter().map(|p| p.project_id.as_str()).collect();
            report.hooks = hooks::run_post_sync(&commands, &HookContext::for_sync(&ids), &root)?;
        }
        Ok(report)
    }
}

/// Find the state documents for this run.
fn locate(options: &SyncOptions) -> Result<StateStore> {
    let store = match &options.config_path {
        Some(path) => StateStore::new(path.clone()),
        None => StateStore::discover(&options.base_dir).unwrap_or_else(|| StateStore::at(&options.base_dir)),
    };
    // Without a config only an explicit project list says what to do
    if !store.config_exists() && options.projects.is_empty() {
        return Err(Error::ConfigNotFound {
            path: options.base_dir.to_native(),
        });
    }
    Ok(store)
}

fn commit(ctx: SyncContext<'_>) -> Result<SyncReport> {
    let SyncContext { tx, mut report, .. } = ctx;
    report.changes = tx.commit()?;
    info!(
        written = report.files_written(),
        deleted = report.files_deleted(),
        "sync finished"
    );
    Ok(report)
}

/// Record the effective scheme on every component that has none.
fn materialize_schemes(config: &mut Config) {
    let default = config.code.scheme;
    for component in config.projects.iter_mut().flat_map(|p| p.components.iter_mut()) {
        component.scheme.get_or_insert(default);
    }
}

/// Remember the ranges named on the command line for the next sync.
fn record_requested_versions(config: &mut Config, targets: &[SyncTarget]) {
    for target in targets.iter().filter(|t| t.explicit) {
        if let Some(project) = config.project_mut(&target.project_id) {
            project.version = target.version_range.clone();
            project.indirect = false;
            if target.project_api_token.is_some() {
                project.project_api_token = target.project_api_token.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentConfig, ComponentKind, ComponentType, ImportSpec, ProjectConfig};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn report_counts_changes() {
        let mut report = SyncReport::default().with_action("started");
        report.changes = vec![
            FileChange {
                path: NormalizedPath::new("a.tsx"),
                kind: FileChangeKind::Written,
            },
            FileChange {
                path: NormalizedPath::new("b.tsx"),
                kind: FileChangeKind::Deleted,
            },
        ];
        report.warn("careful");

        assert_eq!(report.files_written(), 1);
        assert_eq!(report.files_deleted(), 1);
        assert_eq!(report.actions, vec!["started"]);
        assert_eq!(report.warnings, vec!["careful"]);
    }

    #[test]
    fn options_default_to_recursive() {
        let options = SyncOptions::new("/tmp/app");
        assert!(options.recursive);
        assert!(!options.force);
        assert_eq!(options.base_dir.as_str(), "/tmp/app");
    }

    #[test]
    fn missing_config_without_projects_is_an_error() {
        let dir = TempDir::new().unwrap();
        let options = SyncOptions::new(dir.path());
        assert!(matches!(locate(&options), Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn missing_config_with_projects_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let mut options = SyncOptions::new(dir.path());
        options.projects = vec![ProjectSpec::parse("p1").unwrap()];

        let store = locate(&options).unwrap();
        assert_eq!(store.root(), &NormalizedPath::new(dir.path()));
    }

    #[test]
    fn schemes_are_filled_from_the_default() {
        let mut config = Config::default();
        config.code.scheme = ComponentScheme::Direct;
        let mut project = ProjectConfig::new("p1", "Site");
        project.components.push(ComponentConfig {
            id: "c1".into(),
            name: "Button".into(),
            kind: ComponentKind::Managed,
            project_id: "p1".into(),
            render_module_file_path: String::new(),
            css_file_path: String::new(),
            import_spec: ImportSpec {
                module_path: "Button.tsx".into(),
                export_name: None,
            },
            scheme: None,
            component_type: ComponentType::Component,
            path: None,
            plume_type: None,
        });
        config.projects.push(project);

        materialize_schemes(&mut config);

        assert_eq!(config.projects[0].components[0].scheme, Some(ComponentScheme::Direct));
    }

    #[test]
    fn explicit_ranges_are_recorded() {
        let mut config = Config::default();
        let mut project = ProjectConfig::new("p1", "Site");
        project.indirect = true;
        config.projects.push(project);
        let targets = vec![SyncTarget {
            project_id: "p1".into(),
            branch_name: "main".into(),
            version_range: "^1.2.0".into(),
            project_api_token: Some("tok".into()),
            explicit: true,
        }];

        record_requested_versions(&mut config, &targets);

        let project = &config.projects[0];
        assert_eq!(project.version, "^1.2.0");
        assert!(!project.indirect);
        assert_eq!(project.project_api_token.as_deref(), Some("tok"));
    }
}
