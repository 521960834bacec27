//! Import fixup
//!
//! Once every destination path of a sync is final, marker imports in the
//! managed files are repointed at the current location of what they
//! reference. The lookup table is built fresh from the finished config.

use std::collections::HashMap;

use plasmic_code::{ImportDecl, ImportKind, ImportMarker, rewrite_marked_imports};
use plasmic_fs::{FsTransaction, NormalizedPath};
use tracing::{debug, error, info};

use crate::config::{ComponentConfig, ComponentKind, Config, GlobalVariantGroupConfig, IconConfig, ImageConfig, ProjectConfig};
use crate::error::{Error, Result};
use crate::paths::{is_local_module_path, make_import_path};
use crate::sync::UpdateSummary;

/// Everything a marker import can point at, keyed by id.
pub struct ImportTargets<'a> {
    config: &'a Config,
    components: HashMap<&'a str, &'a ComponentConfig>,
    global_variants: HashMap<&'a str, &'a GlobalVariantGroupConfig>,
    icons: HashMap<&'a str, &'a IconConfig>,
    images: HashMap<&'a str, &'a ImageConfig>,
    projects: HashMap<&'a str, &'a ProjectConfig>,
}

impl<'a> ImportTargets<'a> {
    pub fn new(config: &'a Config) -> Self {
        let mut targets = Self {
            config,
            components: HashMap::new(),
            global_variants: HashMap::new(),
            icons: HashMap::new(),
            images: HashMap::new(),
            projects: HashMap::new(),
        };
        for project in &config.projects {
            targets.projects.insert(&project.project_id, project);
            for component in &project.components {
                targets.components.insert(&component.id, component);
            }
            for icon in &project.icons {
                targets.icons.insert(&icon.id, icon);
            }
            for image in &project.images {
                targets.images.insert(&image.id, image);
            }
        }
        for group in &config.global_variants.variant_groups {
            targets.global_variants.insert(&group.id, group);
        }
        targets
    }

    fn lookup<T: Copy>(table: &HashMap<&str, T>, id: &str, kind: &str, file: &str) -> Result<T> {
        table.get(id).copied().ok_or_else(|| Error::MissingReference {
            file: file.to_string(),
            kind: kind.to_string(),
            id: id.to_string(),
            hint: "Try running `plasmic sync` with the --recursive flag, or sync the project that owns it."
                .to_string(),
        })
    }
}

/// Rewrite the marker imports of one module.
///
/// `file_path` is relative to `src_dir`. With `strip` the marker comments
/// are removed too. Returns `None` when nothing changed.
pub fn fix_imports_in_source(
    targets: &ImportTargets<'_>,
    src_dir: &NormalizedPath,
    file_path: &str,
    source: &str,
    strip: bool,
) -> Result<Option<String>> {
    rewrite_marked_imports::<Error, _>(file_path, source, strip, |marker, decl| {
        fix_import(targets, src_dir, file_path, marker, decl)
    })
}

fn fix_import(
    targets: &ImportTargets<'_>,
    src_dir: &NormalizedPath,
    file_path: &str,
    marker: &ImportMarker,
    decl: &mut ImportDecl,
) -> Result<()> {
    let Some(kind) = marker.kind else {
        return Ok(());
    };
    let id = marker.id.as_str();
    let import_path = |to: &str, strip_ext: bool| make_import_path(src_dir, file_path, to, strip_ext);

    match kind {
        ImportKind::Component => {
            let component = ImportTargets::lookup(&targets.components, id, "component", file_path)?;
            let spec = &component.import_spec;
            if let Some(export) = &spec.export_name {
                decl.ensure_specifier_with_alias(export, &component.name);
            }
            decl.source = import_path(&spec.module_path, true);
        }
        ImportKind::Render => {
            let component = ImportTargets::lookup(&targets.components, id, "component", file_path)?;
            decl.source = import_path(&component.render_module_file_path, true);
        }
        ImportKind::Css => {
            let component = ImportTargets::lookup(&targets.components, id, "component", file_path)?;
            decl.source = import_path(&component.css_file_path, false);
        }
        ImportKind::GlobalVariant => {
            let group = ImportTargets::lookup(&targets.global_variants, id, "global variant", file_path)?;
            decl.source = import_path(&group.context_file_path, true);
        }
        ImportKind::Icon => {
            let icon = ImportTargets::lookup(&targets.icons, id, "icon", file_path)?;
            decl.source = import_path(&icon.module_file_path, true);
        }
        ImportKind::Picture => {
            let image = ImportTargets::lookup(&targets.images, id, "image", file_path)?;
            decl.source = import_path(&image.file_path, false);
        }
        ImportKind::ProjectCss => {
            let project = ImportTargets::lookup(&targets.projects, id, "project", file_path)?;
            decl.source = import_path(&project.css_file_path, false);
        }
        ImportKind::DefaultCss => {
            decl.source = import_path(&targets.config.style.default_style_css_file_path, false);
        }
        ImportKind::GlobalContext => {
            let project = ImportTargets::lookup(&targets.projects, id, "project", file_path)?;
            decl.source = import_path(&project.global_contexts_file_path, true);
        }
        // Registered by the user's own code; nothing recorded to point at
        ImportKind::JsBundle | ImportKind::CodeComponent => {}
    }
    Ok(())
}

/// Fix one file in the transaction. Missing files are reported, not fatal.
fn fix_file(
    targets: &ImportTargets<'_>,
    tx: &mut FsTransaction,
    src_dir: &NormalizedPath,
    file_path: &str,
    warnings: &mut Vec<String>,
) -> Result<()> {
    let path = src_dir.join(file_path);
    if !tx.exists(&path) {
        warnings.push(format!(
            "Cannot fix imports in non-existing file {file_path}. Check your plasmic.json file for invalid entries."
        ));
        return Ok(());
    }
    let source = tx.read_text(&path)?;
    if let Some(fixed) = fix_imports_in_source(targets, src_dir, file_path, &source, false)? {
        debug!(file = file_path, "rewrote imports");
        tx.write(&path, fixed)?;
    }
    Ok(())
}

/// Fix marker imports across every managed file.
///
/// With a `summary`, only components touched by this sync are visited, and
/// their skeletons only when the summary flags them as modified. Without
/// one, every managed file is visited.
///
/// Every file is attempted; the last failure is returned after the rest
/// were processed. On success the returned list holds warnings.
pub fn fix_all_import_statements(
    config: &Config,
    tx: &mut FsTransaction,
    src_dir: &NormalizedPath,
    summary: Option<&UpdateSummary>,
) -> Result<Vec<String>> {
    info!("fixing import statements");
    let targets = ImportTargets::new(config);
    let mut warnings = Vec::new();
    let mut last_error = None;

    for project in &config.projects {
        for component in &project.components {
            let fix_skeleton = match summary {
                Some(summary) => match summary.skeleton_modified(&component.id) {
                    Some(modified) => modified,
                    None => continue,
                },
                None => true,
            };

            let mut files = Vec::new();
            if component.kind != ComponentKind::Mapped
                && fix_skeleton
                && is_local_module_path(&component.import_spec.module_path)
            {
                files.push(component.import_spec.module_path.as_str());
            }
            if component.kind != ComponentKind::Mapped {
                files.push(component.render_module_file_path.as_str());
            }

            for file in files {
                if let Err(e) = fix_file(&targets, tx, src_dir, file, &mut warnings) {
                    error!(component = %component.name, error = %e, "failed to fix imports");
                    last_error = Some(e);
                }
            }
        }

        if !project.global_contexts_file_path.is_empty()
            && let Err(e) = fix_file(&targets, tx, src_dir, &project.global_contexts_file_path, &mut warnings)
        {
            error!(project = %project.project_name, error = %e, "failed to fix global context imports");
            last_error = Some(e);
        }
    }

    match last_error {
        Some(e) => Err(e),
        None => Ok(warnings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentScheme, ComponentType, ImportSpec};
    use pretty_assertions::assert_eq;

    fn component(id: &str, name: &str, module_path: &str) -> ComponentConfig {
        ComponentConfig {
            id: id.to_string(),
            name: name.to_string(),
            kind: ComponentKind::Managed,
            project_id: "p1".to_string(),
            render_module_file_path: format!("plasmic/site/Plasmic{name}.tsx"),
            css_file_path: format!("plasmic/site/Plasmic{name}.module.css"),
            import_spec: ImportSpec {
                module_path: module_path.to_string(),
                export_name: None,
            },
            scheme: Some(ComponentScheme::Blackbox),
            component_type: ComponentType::Component,
            path: None,
            plume_type: None,
        }
    }

    fn config() -> Config {
        let mut project = ProjectConfig::new("p1", "Site");
        project.css_file_path = "plasmic/site/plasmic_site.module.css".to_string();
        project.components.push(component("btn", "Button", "Button.tsx"));
        project.components.push(component("card", "Card", "cards/Card.tsx"));
        let mut config = Config::default();
        config.projects.push(project);
        config
    }

    #[test]
    fn component_imports_follow_recorded_paths() {
        let config = config();
        let targets = ImportTargets::new(&config);
        let src = NormalizedPath::new("/proj/src");
        let source = concat!(
            "import Button from \"./Button\"; // plasmic-import: btn/component\n",
            "import sty from \"./old.module.css\"; // plasmic-import: card/css\n",
            "import React from \"react\";\n",
        );

        let fixed = fix_imports_in_source(&targets, &src, "plasmic/site/PlasmicCard.tsx", source, false)
            .unwrap()
            .unwrap();

        assert_eq!(
            fixed,
            concat!(
                "import Button from \"../../Button\"; // plasmic-import: btn/component\n",
                "import sty from \"./PlasmicCard.module.css\"; // plasmic-import: card/css\n",
                "import React from \"react\";\n",
            )
        );
    }

    #[test]
    fn unknown_component_asks_for_recursive_sync() {
        let config = config();
        let targets = ImportTargets::new(&config);
        let source = "import Nav from \"./Nav\"; // plasmic-import: missing/component\n";

        let err = fix_imports_in_source(&targets, &NormalizedPath::new("/p"), "Button.tsx", source, false)
            .unwrap_err();

        match err {
            Error::MissingReference { kind, id, hint, .. } => {
                assert_eq!(kind, "component");
                assert_eq!(id, "missing");
                assert!(hint.contains("--recursive"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mapped_export_name_becomes_an_alias() {
        let mut config = config();
        let mapped = &mut config.projects[0].components[0];
        mapped.kind = ComponentKind::Mapped;
        mapped.import_spec = ImportSpec {
            module_path: "antd".to_string(),
            export_name: Some("Button".to_string()),
        };
        let targets = ImportTargets::new(&config);
        let source = "import Button from \"./Button\"; // plasmic-import: btn/component\n";

        let fixed = fix_imports_in_source(&targets, &NormalizedPath::new("/p"), "Card.tsx", source, false)
            .unwrap()
            .unwrap();

        assert_eq!(fixed, "import { Button } from \"antd\"; // plasmic-import: btn/component\n");
    }

    #[test]
    fn strip_removes_markers() {
        let config = config();
        let targets = ImportTargets::new(&config);
        let source = "import Button from \"./Button\"; // plasmic-import: btn/component\n";

        let fixed = fix_imports_in_source(&targets, &NormalizedPath::new("/p"), "Card.tsx", source, true)
            .unwrap()
            .unwrap();

        assert_eq!(fixed, "import Button from \"./Button\";\n");
    }
}
