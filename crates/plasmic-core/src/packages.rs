//! Companion npm packages
//!
//! Generated code depends on `@plasmicapp/react-web` and friends. The
//! server publishes the minimum versions it expects; installed versions are
//! read from `node_modules`.

use std::cmp::Ordering;

use plasmic_fs::{JsonStore, NormalizedPath};
use serde::Deserialize;
use tracing::debug;

use crate::api::{CLI_PACKAGE, PlasmicApi, REACT_WEB_PACKAGE};
use crate::error::{Error, Result};
use crate::sync::SyncReport;
use crate::version::compare;

#[derive(Debug, Deserialize)]
struct PackageManifest {
    version: Option<String>,
}

/// Version of `package` installed in the nearest `node_modules` at or
/// above `root`.
pub fn find_installed_version(root: &NormalizedPath, package: &str) -> Option<String> {
    let mut dir = Some(root.clone());
    while let Some(current) = dir {
        let manifest = current.join("node_modules").join(package).join("package.json");
        if manifest.is_file() {
            return JsonStore::new()
                .load::<PackageManifest>(&manifest)
                .ok()
                .and_then(|m| m.version);
        }
        dir = current.parent();
    }
    None
}

/// Check this tool and the runtime library against the server's minimums.
///
/// # Errors
///
/// Returns `Error::UpgradeRequired` when this tool is older than the server
/// accepts. An outdated runtime library is only reported.
pub fn ensure_required_packages(
    api: &dyn PlasmicApi,
    root: &NormalizedPath,
    tool_version: &semver::Version,
    report: &mut SyncReport,
) -> Result<()> {
    let required = api.required_packages()?;

    if let Some(min) = required.get(CLI_PACKAGE) {
        let current = tool_version.to_string();
        if compare(min, &current)? == Ordering::Greater {
            return Err(Error::UpgradeRequired {
                package: CLI_PACKAGE.to_string(),
                required: min.to_string(),
                current,
            });
        }
    }

    if let Some(min) = required.get(REACT_WEB_PACKAGE) {
        match find_installed_version(root, REACT_WEB_PACKAGE) {
            Some(installed) => {
                if compare(min, &installed)? == Ordering::Greater {
                    report.warn(format!(
                        "{REACT_WEB_PACKAGE} {installed} is installed but at least {min} is required. \
                         Please upgrade it."
                    ));
                }
            }
            None => debug!(package = REACT_WEB_PACKAGE, "package not installed"),
        }
    }
    Ok(())
}

/// Packages from `used` that are not installed under `root`.
pub fn missing_packages<'a>(root: &NormalizedPath, used: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut missing: Vec<String> = used
        .into_iter()
        .filter(|package| find_installed_version(root, package).is_none())
        .map(str::to_string)
        .collect();
    missing.sort();
    missing.dedup();
    missing
}
