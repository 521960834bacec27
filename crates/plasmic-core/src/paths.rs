//! Locations of synced files
//!
//! Every path recorded in plasmic.json is relative to `srcDir`. This module
//! derives default locations for new files, keeps recorded paths pointing
//! at files the user moved, and checks that nothing escapes the project
//! root.

use plasmic_fs::{
    BaseNameIndex, FsTransaction, NormalizedPath, SourceFilter, relative_import_path, relative_path,
    strip_extension,
};
use tracing::{debug, info};

use crate::config::{Config, Lang, StyleScheme};
use crate::error::{Error, Result};
use crate::sync::SyncReport;

/// Extensions considered when looking for moved files.
const TRACKED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "css", "json"];

/// lodash-style `snake_case`: `"My Site 2"` becomes `"my_site_2"`.
pub fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_uppercase() && c.is_uppercase() && next_is_lower)
                || (prev.is_alphabetic() != c.is_alphabetic());
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Default location of a managed file: `<defaultPlasmicDir>/<project>/<file>`.
pub fn default_resource_path(config: &Config, project_name: &str, file_name: &str) -> String {
    NormalizedPath::new(&config.default_plasmic_dir)
        .join(&snake_case(project_name))
        .join(file_name)
        .as_str()
        .to_string()
}

/// Default location of a page's skeleton: inside the platform's pages
/// directory when it has one.
pub fn default_page_path(config: &Config, file_name: &str) -> String {
    match config.pages_dir() {
        Some(dir) if config.platform.is_page_aware() => {
            NormalizedPath::new(dir).join(file_name).as_str().to_string()
        }
        _ => file_name.to_string(),
    }
}

/// Whether two page files serve the same route.
///
/// `about.tsx` and `about.js` do, as do `about` and `about/index`; `index`
/// and `index/index` do not.
pub fn eq_page_path(a: &str, b: &str) -> bool {
    let a = strip_extension(a, false);
    let b = strip_extension(b, false);
    let (short, long) = if a.len() > b.len() { (b, a) } else { (a, b) };
    if short == long {
        return true;
    }
    !short.ends_with("/index") && short != "index" && format!("{short}/index") == long
}

/// A module path pointing into the source tree, as opposed to a package.
pub fn is_local_module_path(module_path: &str) -> bool {
    let has_extension = module_path
        .rsplit('/')
        .next()
        .is_some_and(|name| name.rfind('.').is_some_and(|i| i > 0));
    has_extension && !module_path.starts_with('@')
}

/// Module specifier that `from_path` should use to import `to_path`.
///
/// Both are relative to `src_dir`. Package specifiers pass through.
pub fn make_import_path(src_dir: &NormalizedPath, from_path: &str, to_path: &str, strip_ext: bool) -> String {
    let mut result = to_path.to_string();
    if is_local_module_path(to_path) {
        let from_dir = src_dir
            .join(from_path)
            .parent()
            .unwrap_or_else(|| src_dir.clone());
        result = relative_import_path(&from_dir, &src_dir.join(to_path));
    }
    if strip_ext {
        result = strip_extension(&result, false);
    }
    result
}

pub fn css_extension(config: &Config) -> &'static str {
    match config.style.scheme {
        StyleScheme::CssModules => ".module.css",
        StyleScheme::Css => ".css",
    }
}

pub fn script_extension(config: &Config) -> &'static str {
    match config.code.lang {
        Lang::Ts => ".tsx",
        Lang::Js => ".jsx",
    }
}

/// Bring css and script extensions in line with the style scheme and
/// language, renaming files on disk to match.
///
/// Renames that fail are reported and skipped. Returns whether any recorded
/// path changed.
pub fn fix_file_extensions(
    config: &mut Config,
    tx: &mut FsTransaction,
    src_dir: &NormalizedPath,
    report: &mut SyncReport,
) -> bool {
    let css_ext = css_extension(config);
    let script_ext = script_extension(config);
    let mut changed = false;

    let mut fix = |path: &mut String, ext: &str, composed: bool| {
        if path.is_empty() {
            return;
        }
        let correct = format!("{}{ext}", strip_extension(path, composed));
        if *path == correct {
            return;
        }
        let from = src_dir.join(path);
        if tx.exists(&from)
            && let Err(e) = tx.rename(&from, &src_dir.join(&correct))
        {
            report.warn(format!("Could not rename {path} to {correct}: {e}"));
        }
        debug!(from = %path, to = %correct, "fixed file extension");
        *path = correct;
        changed = true;
    };

    fix(&mut config.style.default_style_css_file_path, css_ext, true);
    for project in &mut config.projects {
        fix(&mut project.css_file_path, css_ext, true);
        for component in &mut project.components {
            fix(&mut component.css_file_path, css_ext, true);
            if is_script(&component.render_module_file_path) {
                fix(&mut component.render_module_file_path, script_ext, false);
            }
            if is_local_module_path(&component.import_spec.module_path)
                && is_script(&component.import_spec.module_path)
            {
                fix(&mut component.import_spec.module_path, script_ext, false);
            }
        }
    }
    changed
}

fn is_script(path: &str) -> bool {
    path.ends_with(".tsx") || path.ends_with(".jsx")
}

/// Resolve `expected` (relative to `src_dir`) to where the file lives now.
///
/// Returns `None` when the file is where it should be or cannot be found
/// at all, and the new relative path when exactly one file elsewhere in
/// the tree has the same name.
pub fn find_src_dir_path(
    tx: &FsTransaction,
    src_dir: &NormalizedPath,
    expected: &str,
    index: &BaseNameIndex,
) -> Result<Option<String>> {
    let absolute = src_dir.join(expected);
    if tx.exists(&absolute) {
        return Ok(None);
    }
    let Some(file_name) = absolute.file_name() else {
        return Ok(None);
    };
    match index.candidates(file_name) {
        [] => Ok(None),
        [found] => Ok(Some(relative_path(src_dir, found))),
        many => Err(Error::AmbiguousFileMove {
            path: expected.to_string(),
            candidates: many.iter().map(|p| relative_path(src_dir, p)).collect(),
        }),
    }
}

/// Point every recorded file path at the file's current location.
///
/// Returns whether any path changed.
pub fn repair_paths(
    config: &mut Config,
    tx: &FsTransaction,
    src_dir: &NormalizedPath,
    report: &mut SyncReport,
) -> Result<bool> {
    let index = BaseNameIndex::build(tx, src_dir, &SourceFilter::new(TRACKED_EXTENSIONS))?;
    let mut changed = false;
    for path in tracked_files_mut(config) {
        if path.is_empty() {
            continue;
        }
        if let Some(found) = find_src_dir_path(tx, src_dir, path, &index)? {
            info!(from = %path, to = %found, "detected moved file");
            report.action(format!("Detected file moved from {path} to {found}"));
            *path = found;
            changed = true;
        }
    }
    Ok(changed)
}

/// Fail when `srcDir` or any recorded path resolves outside `root`.
pub fn assert_paths_in_root(config: &Config, root: &NormalizedPath, src_dir: &NormalizedPath) -> Result<()> {
    let outside = |path: &str| Error::PathOutsideRoot {
        path: path.to_string(),
        root: root.to_string(),
    };
    if !src_dir.starts_with(root) {
        return Err(outside(&config.src_dir));
    }

    let mut paths: Vec<&str> = tracked_files(config);
    paths.push(&config.default_plasmic_dir);
    paths.extend(config.images.public_dir.as_deref());
    paths.extend(config.pages_dir());

    for path in paths.into_iter().filter(|p| !p.is_empty()) {
        if !src_dir.join(path).starts_with(root) {
            return Err(outside(path));
        }
    }
    Ok(())
}

/// Every file path recorded in the config, for reading.
pub(crate) fn tracked_files(config: &Config) -> Vec<&str> {
    let mut paths = Vec::new();
    for project in &config.projects {
        paths.push(project.css_file_path.as_str());
        paths.push(project.global_contexts_file_path.as_str());
        for component in &project.components {
            paths.push(component.render_module_file_path.as_str());
            paths.push(component.css_file_path.as_str());
            if is_local_module_path(&component.import_spec.module_path) {
                paths.push(component.import_spec.module_path.as_str());
            }
        }
        paths.extend(project.icons.iter().map(|i| i.module_file_path.as_str()));
        paths.extend(project.images.iter().map(|i| i.file_path.as_str()));
        paths.extend(project.js_bundle_themes.iter().map(|t| t.theme_file_path.as_str()));
    }
    paths.extend(
        config
            .global_variants
            .variant_groups
            .iter()
            .map(|g| g.context_file_path.as_str()),
    );
    paths.push(config.tokens.tokens_file_path.as_str());
    paths.push(config.style.default_style_css_file_path.as_str());
    paths
}

/// Every file path recorded in the config, for updating.
fn tracked_files_mut(config: &mut Config) -> Vec<&mut String> {
    let mut paths = Vec::new();
    for project in &mut config.projects {
        paths.push(&mut project.css_file_path);
        paths.push(&mut project.global_contexts_file_path);
        for component in &mut project.components {
            paths.push(&mut component.render_module_file_path);
            paths.push(&mut component.css_file_path);
            if is_local_module_path(&component.import_spec.module_path) {
                paths.push(&mut component.import_spec.module_path);
            }
        }
        paths.extend(project.icons.iter_mut().map(|i| &mut i.module_file_path));
        paths.extend(project.images.iter_mut().map(|i| &mut i.file_path));
        paths.extend(project.js_bundle_themes.iter_mut().map(|t| &mut t.theme_file_path));
    }
    paths.extend(
        config
            .global_variants
            .variant_groups
            .iter_mut()
            .map(|g| &mut g.context_file_path),
    );
    paths.push(&mut config.tokens.tokens_file_path);
    paths.push(&mut config.style.default_style_css_file_path);
    paths
}
