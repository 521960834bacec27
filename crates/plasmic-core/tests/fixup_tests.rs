//! Tests for import fixup across a source tree

use std::fs;

use plasmic_core::config::{ComponentConfig, ComponentKind, ComponentScheme, ComponentType, Config, ImportSpec, ProjectConfig};
use plasmic_core::fixup::fix_all_import_statements;
use plasmic_core::{Error, UpdateSummary};
use plasmic_fs::{FsTransaction, NormalizedPath};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn component(id: &str, name: &str, skeleton: &str) -> ComponentConfig {
    ComponentConfig {
        id: id.to_string(),
        name: name.to_string(),
        kind: ComponentKind::Managed,
        project_id: "p1".to_string(),
        render_module_file_path: format!("plasmic/site/Plasmic{name}.tsx"),
        css_file_path: format!("plasmic/site/Plasmic{name}.module.css"),
        import_spec: ImportSpec {
            module_path: skeleton.to_string(),
            export_name: None,
        },
        scheme: Some(ComponentScheme::Blackbox),
        component_type: ComponentType::Component,
        path: None,
        plume_type: None,
    }
}

fn config(components: Vec<ComponentConfig>) -> Config {
    let mut project = ProjectConfig::new("p1", "Site");
    project.css_file_path = "plasmic/site/plasmic_site.module.css".to_string();
    project.components = components;
    let mut config = Config::default();
    config.projects.push(project);
    config
}

fn skeleton(name: &str, id: &str) -> String {
    format!("import {{ Plasmic{name} }} from \"./stale/Plasmic{name}\"; // plasmic-import: {id}/render\n")
}

fn render(name: &str, id: &str) -> String {
    format!(
        concat!(
            "import \"./stale.css\"; // plasmic-import: p1/projectcss\n",
            "import sty from \"./stale.module.css\"; // plasmic-import: {id}/css\n",
            "export const Plasmic{name} = {{}};\n",
        ),
        name = name,
        id = id
    )
}

struct Tree {
    _dir: TempDir,
    src: NormalizedPath,
}

impl Tree {
    fn new(files: &[(&str, String)]) -> Self {
        let dir = TempDir::new().unwrap();
        let src = NormalizedPath::new(dir.path()).join("src");
        for (rel, content) in files {
            let path = src.join(rel).to_native();
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Self { _dir: dir, src }
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.src.join(rel).to_native()).unwrap()
    }
}

#[test]
fn test_full_fixup_rewrites_every_managed_file() {
    let tree = Tree::new(&[
        ("widgets/Button.tsx", skeleton("Button", "btn")),
        ("plasmic/site/PlasmicButton.tsx", render("Button", "btn")),
    ]);
    let config = config(vec![component("btn", "Button", "widgets/Button.tsx")]);
    let mut tx = FsTransaction::new();

    let warnings = fix_all_import_statements(&config, &mut tx, &tree.src, None).unwrap();
    tx.commit().unwrap();

    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(
        tree.read("widgets/Button.tsx"),
        "import { PlasmicButton } from \"../plasmic/site/PlasmicButton\"; // plasmic-import: btn/render\n"
    );
    assert_eq!(
        tree.read("plasmic/site/PlasmicButton.tsx"),
        concat!(
            "import \"./plasmic_site.module.css\"; // plasmic-import: p1/projectcss\n",
            "import sty from \"./PlasmicButton.module.css\"; // plasmic-import: btn/css\n",
            "export const PlasmicButton = {};\n",
        )
    );
}

#[test]
fn test_summary_limits_which_files_are_touched() {
    let tree = Tree::new(&[
        ("Button.tsx", skeleton("Button", "btn")),
        ("plasmic/site/PlasmicButton.tsx", render("Button", "btn")),
        ("Card.tsx", skeleton("Card", "card")),
        ("plasmic/site/PlasmicCard.tsx", render("Card", "card")),
    ]);
    let config = config(vec![
        component("btn", "Button", "Button.tsx"),
        component("card", "Card", "Card.tsx"),
    ]);
    let mut summary = UpdateSummary::new();
    summary.record("btn", false);
    let mut tx = FsTransaction::new();

    fix_all_import_statements(&config, &mut tx, &tree.src, Some(&summary)).unwrap();
    tx.commit().unwrap();

    // Unmodified skeleton and unsynced component stay as they were
    assert_eq!(tree.read("Button.tsx"), skeleton("Button", "btn"));
    assert_eq!(tree.read("Card.tsx"), skeleton("Card", "card"));
    assert_eq!(tree.read("plasmic/site/PlasmicCard.tsx"), render("Card", "card"));
    assert!(
        tree.read("plasmic/site/PlasmicButton.tsx")
            .contains("from \"./PlasmicButton.module.css\"")
    );
}

#[test]
fn test_missing_files_are_warnings() {
    let tree = Tree::new(&[("plasmic/site/PlasmicButton.tsx", render("Button", "btn"))]);
    let config = config(vec![component("btn", "Button", "Button.tsx")]);
    let mut tx = FsTransaction::new();

    let warnings = fix_all_import_statements(&config, &mut tx, &tree.src, None).unwrap();

    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("non-existing file Button.tsx"));
}

#[test]
fn test_unknown_reference_fails_after_fixing_the_rest() {
    let tree = Tree::new(&[
        ("Button.tsx", skeleton("Button", "ghost")),
        ("plasmic/site/PlasmicButton.tsx", render("Button", "btn")),
    ]);
    let config = config(vec![component("btn", "Button", "Button.tsx")]);
    let mut tx = FsTransaction::new();

    let err = fix_all_import_statements(&config, &mut tx, &tree.src, None).unwrap_err();

    assert!(matches!(err, Error::MissingReference { ref id, .. } if id == "ghost"), "got {err:?}");
    let render = tx.read_text(&tree.src.join("plasmic/site/PlasmicButton.tsx")).unwrap();
    assert!(render.contains("from \"./PlasmicButton.module.css\""));
}

#[test]
fn test_mapped_components_are_skipped() {
    let mut mapped = component("btn", "Button", "antd");
    mapped.kind = ComponentKind::Mapped;
    let tree = Tree::new(&[]);
    let config = config(vec![mapped]);
    let mut tx = FsTransaction::new();

    let warnings = fix_all_import_statements(&config, &mut tx, &tree.src, None).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(tx.pending_count(), 0);
}
