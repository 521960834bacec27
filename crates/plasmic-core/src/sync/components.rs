//! Component files
//!
//! Decides per component whether it is new, changed, renamed or deleted,
//! and which of its files may be overwritten.

use std::collections::{BTreeMap, HashSet};

use plasmic_code::find_managed_jsx_revision;
use plasmic_fs::NormalizedPath;
use tracing::{debug, info};

use crate::api::{ChecksumKind, ComponentBundle, ProjectBundle, ProjectVersionMeta};
use crate::config::{
    ComponentConfig, ComponentKind, ComponentScheme, ComponentType, FileLockKind, ImportSpec,
};
use crate::error::{Error, Result};
use crate::paths::{default_page_path, default_resource_path, eq_page_path, is_local_module_path};

use super::context::SyncContext;
use super::merge::PendingMerge;
use super::project::locked_checksum;

/// Which components a sync touched, and whether their skeleton changed.
///
/// Import fixup only rewrites skeletons flagged here; an unmodified
/// skeleton belongs to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    components: BTreeMap<String, bool>,
}

impl UpdateSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a processed component. Once modified, it stays modified.
    pub fn record(&mut self, component_id: &str, skeleton_modified: bool) {
        *self.components.entry(component_id.to_string()).or_default() |= skeleton_modified;
    }

    /// `None` when the component was not part of this sync.
    pub fn skeleton_modified(&self, component_id: &str) -> Option<bool> {
        self.components.get(component_id).copied()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

pub(crate) fn sync_components(
    ctx: &mut SyncContext<'_>,
    meta: &ProjectVersionMeta,
    bundle: &ProjectBundle,
    summary: &mut UpdateSummary,
    pending: &mut Vec<PendingMerge>,
) -> Result<()> {
    // A filtered bundle leaves out components on purpose
    if ctx.options.components.is_empty() {
        remove_deleted_components(ctx, meta, bundle)?;
    }

    let project_name = bundle.project_config.project_name.as_str();
    for component in &bundle.components {
        debug!(component = %component.component_name, id = %component.id, "syncing component");
        let index = ctx.project_index(&meta.project_id)?;
        let existing = ctx.config.projects[index]
            .components
            .iter()
            .position(|c| c.id == component.id);

        let modified = match existing {
            None => add_component(ctx, index, project_name, component)?,
            Some(position) => update_component(ctx, meta, index, position, project_name, component, pending)?,
        };
        summary.record(&component.id, modified);

        let lock = ctx.project_lock(&meta.project_id, &meta.branch_name);
        lock.upsert_file_lock(
            FileLockKind::RenderModule,
            &component.id,
            locked_checksum(&bundle.checksums, ChecksumKind::RenderModule, &component.id, &component.render_module),
        );
        lock.upsert_file_lock(
            FileLockKind::CssRules,
            &component.id,
            locked_checksum(&bundle.checksums, ChecksumKind::CssRules, &component.id, &component.css_rules),
        );
    }
    Ok(())
}

/// Components recorded locally that the server no longer has.
///
/// Ids the server lists in its checksums are unchanged rather than gone.
fn deleted_components(ctx: &SyncContext<'_>, project_id: &str, bundle: &ProjectBundle) -> Vec<ComponentConfig> {
    let Some(project) = ctx.config.project(project_id) else {
        return Vec::new();
    };
    let present: HashSet<&str> = bundle
        .components
        .iter()
        .map(|c| c.id.as_str())
        .chain(bundle.checksums.render_module_checksums.iter().map(|(id, _)| id.as_str()))
        .chain(bundle.checksums.css_rules_checksums.iter().map(|(id, _)| id.as_str()))
        .collect();
    project
        .components
        .iter()
        .filter(|c| !present.contains(c.id.as_str()))
        .cloned()
        .collect()
}

fn remove_deleted_components(ctx: &mut SyncContext<'_>, meta: &ProjectVersionMeta, bundle: &ProjectBundle) -> Result<()> {
    for component in deleted_components(ctx, &meta.project_id, bundle) {
        info!(component = %component.name, id = %component.id, "component was deleted");
        if component.kind == ComponentKind::Managed {
            for path in [&component.render_module_file_path, &component.css_file_path] {
                if !path.is_empty() && ctx.exists(path) {
                    ctx.delete(path)?;
                }
            }
            let skeleton = &component.import_spec.module_path;
            if is_local_module_path(skeleton) && ctx.exists(skeleton) {
                let remove = ctx.confirmer.confirm(
                    &format!(
                        "Component {} was deleted from the project. Do you want to delete {skeleton} too?",
                        component.name
                    ),
                    false,
                )?;
                if remove {
                    ctx.delete(skeleton)?;
                }
            }
        }

        let index = ctx.project_index(&meta.project_id)?;
        ctx.config.projects[index].components.retain(|c| c.id != component.id);
        ctx.project_lock(&meta.project_id, &meta.branch_name)
            .remove_file_locks(&component.id, &[FileLockKind::RenderModule, FileLockKind::CssRules]);
        ctx.report
            .action(format!("Removed deleted component {} ({})", component.name, component.id));
    }
    Ok(())
}

fn skeleton_path(ctx: &SyncContext<'_>, component: &ComponentBundle) -> String {
    if component.is_page {
        default_page_path(&ctx.config, &component.skeleton_module_file_name)
    } else {
        component.skeleton_module_file_name.clone()
    }
}

/// `file_name` in the directory of `recorded`, or the default location
/// when nothing is recorded yet.
fn sibling_path(recorded: &str, file_name: &str, default: String) -> String {
    if recorded.is_empty() {
        return default;
    }
    match NormalizedPath::new(recorded).parent() {
        Some(dir) if dir.as_str() != "." => dir.join(file_name).as_str().to_string(),
        _ => file_name.to_string(),
    }
}

/// First sync of a component: every file is created.
fn add_component(
    ctx: &mut SyncContext<'_>,
    index: usize,
    project_name: &str,
    component: &ComponentBundle,
) -> Result<bool> {
    let skeleton = skeleton_path(ctx, component);
    let config = ComponentConfig {
        id: component.id.clone(),
        name: component.component_name.clone(),
        kind: ComponentKind::Managed,
        project_id: ctx.config.projects[index].project_id.clone(),
        render_module_file_path: default_resource_path(&ctx.config, project_name, &component.render_module_file_name),
        css_file_path: default_resource_path(&ctx.config, project_name, &component.css_file_name),
        import_spec: ImportSpec {
            module_path: skeleton.clone(),
            export_name: None,
        },
        scheme: Some(component.scheme),
        component_type: component_type(component),
        path: component.path.clone(),
        plume_type: component.plume_type.clone(),
    };

    // Something the user put there must not be clobbered silently
    ctx.write(&skeleton, component.skeleton_module.as_str(), false)?;
    ctx.write(&config.render_module_file_path, component.render_module.as_str(), true)?;
    ctx.write(&config.css_file_path, component.css_rules.as_str(), true)?;

    ctx.report
        .action(format!("Added component {} at {skeleton}", component.component_name));
    ctx.config.projects[index].components.push(config);
    Ok(true)
}

fn component_type(component: &ComponentBundle) -> ComponentType {
    if component.is_page {
        ComponentType::Page
    } else {
        ComponentType::Component
    }
}

/// Refresh a component synced before. Returns whether its skeleton changed.
fn update_component(
    ctx: &mut SyncContext<'_>,
    meta: &ProjectVersionMeta,
    index: usize,
    position: usize,
    project_name: &str,
    component: &ComponentBundle,
    pending: &mut Vec<PendingMerge>,
) -> Result<bool> {
    let mut config = ctx.config.projects[index].components[position].clone();
    config.component_type = component_type(component);
    config.path = component.path.clone();
    config.plume_type = component.plume_type.clone();

    if config.kind == ComponentKind::Mapped {
        config.name = component.component_name.clone();
        ctx.config.projects[index].components[position] = config;
        return Ok(false);
    }

    let modified = relocate_component(ctx, &mut config, project_name, component)?;
    ctx.write(&config.render_module_file_path, component.render_module.as_str(), true)?;
    ctx.write(&config.css_file_path, component.css_rules.as_str(), true)?;

    let skeleton = config.import_spec.module_path.clone();
    let scheme = ctx.config.effective_scheme(&config);
    ctx.config.projects[index].components[position] = config;

    if !is_local_module_path(&skeleton) {
        return Ok(modified);
    }
    if !ctx.exists(&skeleton) {
        return Err(Error::MissingComponentFile {
            component: component.component_name.clone(),
            path: skeleton,
        });
    }
    let edited = ctx.read(&skeleton)?;

    match scheme {
        ComponentScheme::Direct => {
            pending.push(PendingMerge {
                component_id: component.id.clone(),
                project_id: meta.project_id.clone(),
                branch_name: meta.branch_name.clone(),
                path: skeleton,
                edited,
                new: component.skeleton_module.clone(),
            });
            Ok(true)
        }
        ComponentScheme::Blackbox if find_managed_jsx_revision(&edited).is_some() => {
            if ctx.options.force_overwrite {
                ctx.write(&skeleton, component.skeleton_module.as_str(), true)?;
                ctx.report
                    .warn(format!("Overwrote {skeleton}, switching it from \"direct\" to \"blackbox\" scheme"));
                Ok(true)
            } else {
                ctx.report.warn(format!(
                    "{skeleton} is likely in \"direct\" scheme. If you intend to switch the code scheme from direct \
                     to blackbox, use --force-overwrite option to force the switch."
                ));
                Ok(modified)
            }
        }
        ComponentScheme::Blackbox => Ok(modified),
    }
}

/// Follow server-side renames of a component's files.
///
/// Returns whether the skeleton moved.
fn relocate_component(
    ctx: &mut SyncContext<'_>,
    config: &mut ComponentConfig,
    project_name: &str,
    component: &ComponentBundle,
) -> Result<bool> {
    let render = sibling_path(
        &config.render_module_file_path,
        &component.render_module_file_name,
        default_resource_path(&ctx.config, project_name, &component.render_module_file_name),
    );
    ctx.relocate(&mut config.render_module_file_path, render)?;
    let css = sibling_path(
        &config.css_file_path,
        &component.css_file_name,
        default_resource_path(&ctx.config, project_name, &component.css_file_name),
    );
    ctx.relocate(&mut config.css_file_path, css)?;

    let mut moved = false;
    let skeleton = config.import_spec.module_path.clone();
    if config.name != component.component_name {
        // Only a file still named after the component follows the rename
        let named_after_component = NormalizedPath::new(&skeleton)
            .strip_extension(false)
            .file_name()
            .is_some_and(|stem| stem == config.name);
        if !component.is_page && is_local_module_path(&skeleton) && named_after_component {
            let target = sibling_path(&skeleton, &component.skeleton_module_file_name, skeleton.clone());
            ctx.relocate(&mut config.import_spec.module_path, target)?;
            moved = true;
        }
        ctx.report.action(format!(
            "Component {} was renamed to {}",
            config.name, component.component_name
        ));
        config.name = component.component_name.clone();
    }

    if component.is_page && ctx.config.platform.is_page_aware() {
        let expected = skeleton_path(ctx, component);
        if !eq_page_path(&expected, &config.import_spec.module_path) {
            ctx.relocate(&mut config.import_spec.module_path, expected)?;
            moved = true;
        }
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn summary_keeps_the_modified_flag() {
        let mut summary = UpdateSummary::new();
        summary.record("c1", true);
        summary.record("c1", false);
        summary.record("c2", false);

        assert_eq!(summary.skeleton_modified("c1"), Some(true));
        assert_eq!(summary.skeleton_modified("c2"), Some(false));
        assert_eq!(summary.skeleton_modified("c3"), None);
        assert_eq!(summary.len(), 2);
    }

    #[rstest]
    #[case("plasmic/site/PlasmicButton.tsx", "PlasmicBtn.tsx", "plasmic/site/PlasmicBtn.tsx")]
    #[case("PlasmicButton.tsx", "PlasmicBtn.tsx", "PlasmicBtn.tsx")]
    #[case("", "PlasmicBtn.tsx", "default/PlasmicBtn.tsx")]
    fn siblings_stay_in_the_recorded_directory(#[case] recorded: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(sibling_path(recorded, name, "default/PlasmicBtn.tsx".to_string()), expected);
    }
}
