//! Version resolution
//!
//! The server pins every requested project and its dependency closure to
//! exact versions. This module checks that answer for consistency and
//! decides, project by project, what actually gets synced given what the
//! lock says is already on disk.

pub mod graph;

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::api::{PlasmicApi, ProjectRequest, ProjectVersionMeta, ResolveSyncRequest, VersionResolution};
use crate::config::{Config, Lock};
use crate::confirm::Confirmer;
use crate::error::{Error, Result};
use crate::sync::SyncReport;
use crate::version::{self, LATEST, VersionRange};

pub use graph::ProjectGraph;

static PROJECT_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<id>[^:@\s]+)(?::(?P<token>[^@\s]+))?(?:@(?P<range>.+))?$")
        .expect("Invalid project spec regex")
});

/// A `--projects` entry: `id[:token][@range]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    pub project_id: String,
    pub project_api_token: Option<String>,
    pub version_range: Option<String>,
}

impl ProjectSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidProjectSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let caps = PROJECT_SPEC_RE
            .captures(spec.trim())
            .ok_or_else(|| invalid("expected <projectId>[:<token>][@<versionRange>]"))?;

        let version_range = caps.name("range").map(|m| m.as_str().to_string());
        if let Some(range) = &version_range {
            VersionRange::parse(range).map_err(|e| invalid(&e.to_string()))?;
        }

        Ok(Self {
            project_id: caps["id"].to_string(),
            project_api_token: caps.name("token").map(|m| m.as_str().to_string()),
            version_range,
        })
    }
}

impl FromStr for ProjectSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A project the user wants synced, with its range filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub project_id: String,
    pub branch_name: String,
    pub version_range: String,
    pub project_api_token: Option<String>,
    /// Named on the command line rather than taken from plasmic.json.
    pub explicit: bool,
}

/// Turn `--projects` entries into targets; without any, every project the
/// config tracks directly is a target.
pub fn sync_targets(specs: &[ProjectSpec], config: &Config) -> Result<Vec<SyncTarget>> {
    let targets: Vec<SyncTarget> = if specs.is_empty() {
        config
            .projects
            .iter()
            .filter(|p| !p.indirect)
            .map(|p| SyncTarget {
                project_id: p.project_id.clone(),
                branch_name: p.branch_name().to_string(),
                version_range: p.version.clone(),
                project_api_token: p.project_api_token.clone(),
                explicit: false,
            })
            .collect()
    } else {
        let mut seen = HashSet::new();
        specs
            .iter()
            .filter(|spec| seen.insert(spec.project_id.clone()))
            .map(|spec| {
                let tracked = config.project(&spec.project_id);
                SyncTarget {
                    project_id: spec.project_id.clone(),
                    branch_name: tracked.map_or("main", |p| p.branch_name()).to_string(),
                    version_range: spec
                        .version_range
                        .clone()
                        .or_else(|| tracked.map(|p| p.version.clone()))
                        .unwrap_or_else(|| LATEST.to_string()),
                    project_api_token: spec
                        .project_api_token
                        .clone()
                        .or_else(|| tracked.and_then(|p| p.project_api_token.clone())),
                    explicit: true,
                }
            })
            .collect()
    };

    if targets.is_empty() {
        return Err(Error::NothingToSync);
    }
    Ok(targets)
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub force: bool,
    /// Walk and sync dependencies of the targets too.
    pub recursive: bool,
    pub component_filter: Option<Vec<String>>,
}

/// Decides which project versions to sync.
pub struct VersionResolver<'a> {
    config: &'a Config,
    lock: &'a Lock,
    confirmer: &'a dyn Confirmer,
    options: ResolveOptions,
}

impl<'a> VersionResolver<'a> {
    pub fn new(config: &'a Config, lock: &'a Lock, confirmer: &'a dyn Confirmer, options: ResolveOptions) -> Self {
        Self {
            config,
            lock,
            confirmer,
            options,
        }
    }

    /// Ask the server to resolve `targets`, then pick what to sync, in
    /// dependency order.
    pub fn resolve(
        &self,
        api: &dyn PlasmicApi,
        targets: &[SyncTarget],
        report: &mut SyncReport,
    ) -> Result<Vec<ProjectVersionMeta>> {
        let request = ResolveSyncRequest {
            projects: targets
                .iter()
                .map(|t| ProjectRequest {
                    project_id: t.project_id.clone(),
                    branch_name: t.branch_name.clone(),
                    version_range: t.version_range.clone(),
                    component_id_or_names: self.options.component_filter.clone(),
                    project_api_token: t.project_api_token.clone(),
                })
                .collect(),
            recursive: self.options.recursive,
        };
        let resolution = api.resolve_sync(&request)?;
        self.select(targets, resolution, report)
    }

    /// Validate a server resolution and filter it against the lock.
    ///
    /// The returned list has dependencies before their dependents and at
    /// most one entry per project.
    pub fn select(
        &self,
        targets: &[SyncTarget],
        resolution: VersionResolution,
        report: &mut SyncReport,
    ) -> Result<Vec<ProjectVersionMeta>> {
        if !resolution.conflicts.is_empty() {
            let details: Vec<String> = resolution
                .conflicts
                .iter()
                .map(|c| format!("{}: {}", c.project_id, c.message))
                .collect();
            return Err(Error::resolution(details.join("; ")));
        }
        if resolution.projects.is_empty() {
            return Err(Error::resolution("the server returned no project versions"));
        }

        let mut roots: Vec<String> = Vec::new();
        for meta in &resolution.projects {
            if !roots.contains(&meta.project_id) {
                roots.push(meta.project_id.clone());
            }
        }
        let pool = version_pool(resolution)?;

        let mut graph = ProjectGraph::new();
        for meta in pool.values() {
            graph.add_node(&meta.project_id);
            if !self.options.recursive {
                continue;
            }
            for (dep_id, dep_version) in &meta.dependencies {
                let Some(dep) = pool.get(dep_id) else {
                    return Err(Error::UnresolvedDependency {
                        project_id: meta.project_id.clone(),
                        dependency: dep_id.clone(),
                    });
                };
                if &dep.version != dep_version {
                    return Err(Error::VersionConflict {
                        project_id: dep_id.clone(),
                        first: dep.version.clone(),
                        second: dep_version.clone(),
                    });
                }
                graph.add_edge(&meta.project_id, dep_id);
            }
        }
        graph.topological_sort()?;

        let order = if self.options.recursive {
            graph.dependency_order(roots.iter().map(String::as_str))
        } else {
            roots.clone()
        };

        let mut selected = Vec::new();
        for id in order {
            let Some(meta) = pool.get(&id) else { continue };
            let target = targets.iter().find(|t| t.project_id == id);
            let is_root = roots.contains(&id);
            let range = match target {
                Some(t) => t.version_range.clone(),
                None => self
                    .config
                    .project(&id)
                    .map(|p| p.version.clone())
                    .unwrap_or_else(|| meta.version.clone()),
            };
            let explicit = target.is_some_and(|t| t.explicit);

            if self.should_sync(meta, &range, is_root, explicit, report)? {
                let mut meta = meta.clone();
                meta.indirect = !is_root && self.config.project(&id).is_none_or(|p| p.indirect);
                selected.push(meta);
            }
        }
        Ok(selected)
    }

    fn should_sync(
        &self,
        meta: &ProjectVersionMeta,
        range: &str,
        is_root: bool,
        explicit: bool,
        report: &mut SyncReport,
    ) -> Result<bool> {
        let id = &meta.project_id;
        if explicit && self.options.force {
            return Ok(true);
        }
        // An unpublished head revision changes without a version bump
        if version::is_latest(&meta.version) {
            return Ok(true);
        }
        let Some(locked) = self.lock.version_of(id) else {
            // Never synced: a partial dependency graph would break imports
            return Ok(true);
        };

        match version::compare(&meta.version, locked)? {
            std::cmp::Ordering::Greater if !is_root => {
                report.warn(format!(
                    "{} ({id}) is a dependency at version {}, newer than the synced {locked}",
                    meta.project_name, meta.version
                ));
                let question = format!("Upgrade {} to {}?", meta.project_name, meta.version);
                if !self.confirmer.confirm(&question, false)? {
                    return Ok(false);
                }
            }
            std::cmp::Ordering::Greater => {}
            std::cmp::Ordering::Less => {
                report.warn(format!(
                    "Skipping {} ({id}): version {} is older than the synced {locked}",
                    meta.project_name, meta.version
                ));
                return Ok(false);
            }
            std::cmp::Ordering::Equal => {
                if !self.options.force {
                    debug!(project = %id, version = %locked, "already synced");
                    return Ok(false);
                }
            }
        }

        if !VersionRange::parse(range)?.satisfies(&meta.version) {
            report.warn(format!(
                "{} ({id}) version {} does not satisfy the range '{range}' in plasmic.json",
                meta.project_name, meta.version
            ));
            if self.options.force {
                return Ok(true);
            }
            let question = format!("Sync {} {} anyway?", meta.project_name, meta.version);
            return self.confirmer.confirm(&question, false);
        }
        Ok(true)
    }
}

/// Every resolved project by id, rejecting two versions of one project.
fn version_pool(resolution: VersionResolution) -> Result<BTreeMap<String, ProjectVersionMeta>> {
    let mut pool: BTreeMap<String, ProjectVersionMeta> = BTreeMap::new();
    for meta in resolution.projects.into_iter().chain(resolution.dependencies) {
        match pool.get(&meta.project_id) {
            Some(existing) if existing.version != meta.version => {
                return Err(Error::VersionConflict {
                    project_id: meta.project_id,
                    first: existing.version.clone(),
                    second: meta.version,
                });
            }
            Some(_) => {}
            None => {
                pool.insert(meta.project_id.clone(), meta);
            }
        }
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("p1", "p1", None, None)]
    #[case("p1:tok", "p1", Some("tok"), None)]
    #[case("p1@^1.2.0", "p1", None, Some("^1.2.0"))]
    #[case("p1:tok@>=1.0.0 <2.0.0", "p1", Some("tok"), Some(">=1.0.0 <2.0.0"))]
    #[case("p1@latest", "p1", None, Some("latest"))]
    fn parses_project_specs(
        #[case] spec: &str,
        #[case] id: &str,
        #[case] token: Option<&str>,
        #[case] range: Option<&str>,
    ) {
        let parsed = ProjectSpec::parse(spec).unwrap();
        assert_eq!(parsed.project_id, id);
        assert_eq!(parsed.project_api_token.as_deref(), token);
        assert_eq!(parsed.version_range.as_deref(), range);
    }

    #[rstest]
    #[case("")]
    #[case("p1@not a range")]
    #[case(":tok")]
    fn rejects_bad_specs(#[case] spec: &str) {
        assert!(matches!(ProjectSpec::parse(spec), Err(Error::InvalidProjectSpec { .. })));
    }

    #[test]
    fn targets_default_to_direct_projects() {
        let mut config = Config::default();
        let mut dep = ProjectConfig::new("dep", "Dep");
        dep.indirect = true;
        let mut site = ProjectConfig::new("site", "Site");
        site.version = "^2.0.0".into();
        config.projects = vec![site, dep];

        let targets = sync_targets(&[], &config).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].version_range, "^2.0.0");
        assert!(!targets[0].explicit);

        let spec = ProjectSpec::parse("site").unwrap();
        let targets = sync_targets(&[spec], &config).unwrap();
        assert_eq!(targets[0].version_range, "^2.0.0");
        assert!(targets[0].explicit);
    }

    #[test]
    fn repeated_project_is_targeted_once() {
        let specs = vec![
            ProjectSpec::parse("site@1.0.0").unwrap(),
            ProjectSpec::parse("site@2.0.0").unwrap(),
        ];
        let targets = sync_targets(&specs, &Config::default()).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].version_range, "1.0.0");
    }

    #[test]
    fn no_targets_is_nothing_to_sync() {
        let err = sync_targets(&[], &Config::default()).unwrap_err();
        assert!(matches!(err, Error::NothingToSync));
    }
}
