//! Forward-only schema migrations for `plasmic.json`
//!
//! Each step is a pure transform over the raw JSON document. Steps only
//! fill in or reshape fields that are missing or in an older shape, so
//! running one twice leaves the document unchanged.

use semver::Version;
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::version::parse_version;

/// Inputs a migration may need besides the document.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    /// Absolute source directory of the project.
    pub src_dir: String,
}

pub type MigrationFn = fn(Value, &MigrationContext) -> Result<Value>;

/// A schema change introduced by a tool release.
#[derive(Clone)]
pub struct Migration {
    pub version: Version,
    pub transform: MigrationFn,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Every registered migration, sorted by version.
pub fn registry() -> Vec<Migration> {
    let mut steps = vec![
        step(0, 1, 42, images_settings),
        step(0, 1, 27, import_spec),
        step(0, 1, 64, runtime_and_default_css),
        step(0, 1, 31, global_variants),
        step(0, 1, 57, indirect_and_themes),
    ];
    steps.sort_by(|a, b| a.version.cmp(&b.version));
    steps
}

/// Migrations newer than `from` and no newer than `to`, in order.
///
/// A document without a recorded version is treated as `0.0.0`.
pub fn pending(from: Option<&str>, to: &Version) -> Result<Vec<Migration>> {
    let from = match from {
        Some(v) if !v.is_empty() => parse_version(v)?,
        _ => Version::new(0, 0, 0),
    };
    Ok(registry()
        .into_iter()
        .filter(|m| m.version > from && &m.version <= to)
        .collect())
}

fn step(major: u64, minor: u64, patch: u64, transform: MigrationFn) -> Migration {
    Migration {
        version: Version::new(major, minor, patch),
        transform,
    }
}

fn projects_mut(doc: &mut Value) -> impl Iterator<Item = &mut Map<String, Value>> {
    doc.get_mut("projects")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn set_missing(object: &mut Map<String, Value>, key: &str, value: Value) {
    if !object.contains_key(key) {
        object.insert(key.to_string(), value);
    }
}

/// Components used to record a bare `importPath`; it became `importSpec`.
/// Absolute paths inside the source directory become relative to it.
fn import_spec(mut doc: Value, ctx: &MigrationContext) -> Result<Value> {
    let prefix = format!("{}/", ctx.src_dir.trim_end_matches('/'));
    for project in projects_mut(&mut doc) {
        let Some(components) = project.get_mut("components").and_then(Value::as_array_mut) else {
            continue;
        };
        for component in components.iter_mut().filter_map(Value::as_object_mut) {
            let Some(Value::String(import_path)) = component.remove("importPath") else {
                continue;
            };
            let module_path = import_path
                .strip_prefix(&prefix)
                .map(str::to_string)
                .unwrap_or(import_path);
            set_missing(component, "importSpec", json!({ "modulePath": module_path }));
        }
    }
    Ok(doc)
}

fn global_variants(mut doc: Value, _ctx: &MigrationContext) -> Result<Value> {
    if let Some(root) = doc.as_object_mut() {
        set_missing(root, "globalVariants", json!({ "variantGroups": [] }));
    }
    Ok(doc)
}

fn images_settings(mut doc: Value, _ctx: &MigrationContext) -> Result<Value> {
    if let Some(root) = doc.as_object_mut() {
        set_missing(root, "images", json!({ "scheme": "inlined" }));
    }
    for project in projects_mut(&mut doc) {
        set_missing(project, "images", json!([]));
    }
    Ok(doc)
}

fn indirect_and_themes(mut doc: Value, _ctx: &MigrationContext) -> Result<Value> {
    for project in projects_mut(&mut doc) {
        set_missing(project, "indirect", json!(false));
        set_missing(project, "jsBundleThemes", json!([]));
    }
    Ok(doc)
}

fn runtime_and_default_css(mut doc: Value, _ctx: &MigrationContext) -> Result<Value> {
    let Some(root) = doc.as_object_mut() else {
        return Ok(doc);
    };
    if let Some(code) = root.get_mut("code").and_then(Value::as_object_mut) {
        set_missing(code, "reactRuntime", json!("classic"));
    }
    if let Some(style) = root.get_mut("style").and_then(Value::as_object_mut) {
        set_missing(style, "defaultStyleCssFilePath", json!(""));
    }
    Ok(doc)
}
