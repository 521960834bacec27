//! [`MockApi`]: an in-memory Plasmic server for sync scenarios.
//!
//! Projects are published as [`MockVersion`]s. Generated modules are
//! deterministic functions of the project, version and component, so tests
//! can predict file content with [`MockApi::render_module`] and
//! [`MockApi::skeleton_module`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use plasmic_core::api::{
    ChecksumBundle, ComponentBundle, IconBundle, ProjectBundle, ProjectComponentsRequest, ProjectMetaBundle,
    ProjectSyncMetadata, ProjectVersionMeta, RequiredPackages, ResolveSyncRequest, StyleConfigResponse,
    StyleTokensMap, VersionResolution,
};
use plasmic_core::config::{ComponentScheme, StyleConfig, StyleScheme};
use plasmic_core::paths::snake_case;
use plasmic_core::{Error, PlasmicApi, Result, VersionRange};
use plasmic_fs::checksum::compute_checksum;

/// A component as the design tool sees it.
#[derive(Debug, Clone)]
pub struct MockComponent {
    pub id: String,
    pub name: String,
    pub scheme: ComponentScheme,
    /// Route of a page component, e.g. `/about`.
    pub page_path: Option<String>,
    /// Text inside the generated markup; change it to simulate a design edit.
    pub body: String,
    /// Components (id, name) the render module imports, possibly from
    /// other projects.
    pub uses: Vec<(String, String)>,
}

impl MockComponent {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            scheme: ComponentScheme::Blackbox,
            page_path: None,
            body: format!("{name} content"),
            uses: Vec::new(),
        }
    }

    pub fn direct(mut self) -> Self {
        self.scheme = ComponentScheme::Direct;
        self
    }

    pub fn page(mut self, route: &str) -> Self {
        self.page_path = Some(route.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Make the render module import another component.
    pub fn uses(mut self, id: &str, name: &str) -> Self {
        self.uses.push((id.to_string(), name.to_string()));
        self
    }

    fn skeleton_file_name(&self) -> String {
        match &self.page_path {
            Some(route) => match route.trim_matches('/') {
                "" => "index.tsx".to_string(),
                route => format!("{route}.tsx"),
            },
            None => format!("{}.tsx", self.name),
        }
    }
}

/// One published version of a project.
#[derive(Debug, Clone)]
pub struct MockVersion {
    pub project_id: String,
    pub project_name: String,
    pub version: String,
    pub components: Vec<MockComponent>,
    /// Exact versions of the projects this one imports from.
    pub dependencies: BTreeMap<String, String>,
    /// Revision stamped into direct-scheme skeletons; assigned on publish
    /// when left at zero.
    pub revision: u64,
    pub icons: Vec<(String, String)>,
    pub npm_packages: Vec<String>,
}

impl MockVersion {
    pub fn new(project_id: &str, project_name: &str, version: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            version: version.to_string(),
            components: Vec::new(),
            dependencies: BTreeMap::new(),
            revision: 0,
            icons: Vec::new(),
            npm_packages: Vec::new(),
        }
    }

    pub fn component(mut self, component: MockComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn dependency(mut self, project_id: &str, version: &str) -> Self {
        self.dependencies.insert(project_id.to_string(), version.to_string());
        self
    }

    pub fn revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn icon(mut self, id: &str, name: &str) -> Self {
        self.icons.push((id.to_string(), name.to_string()));
        self
    }

    pub fn npm_package(mut self, package: &str) -> Self {
        self.npm_packages.push(package.to_string());
        self
    }
}

/// In-memory [`PlasmicApi`].
///
/// # Example
///
/// ```rust,no_run
/// use plasmic_test_utils::{MockApi, MockComponent, MockVersion};
///
/// let api = MockApi::new();
/// api.publish(MockVersion::new("p1", "Site", "1.0.0").component(MockComponent::new("c1", "Button")));
/// ```
pub struct MockApi {
    projects: RefCell<BTreeMap<String, Vec<MockVersion>>>,
    required: RefCell<BTreeMap<String, String>>,
    metadata_available: Cell<bool>,
    calls: RefCell<Vec<String>>,
    component_requests: RefCell<Vec<ProjectComponentsRequest>>,
    next_revision: Cell<u64>,
    /// Css extension of the last bundle, reused for merge bases.
    css_ext: Cell<&'static str>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            projects: RefCell::new(BTreeMap::new()),
            required: RefCell::new(BTreeMap::new()),
            metadata_available: Cell::new(true),
            calls: RefCell::new(Vec::new()),
            component_requests: RefCell::new(Vec::new()),
            next_revision: Cell::new(1),
            css_ext: Cell::new(".module.css"),
        }
    }

    /// Make a version available. Republishing a version replaces it.
    pub fn publish(&self, mut version: MockVersion) -> &Self {
        if version.revision == 0 {
            version.revision = self.next_revision.get();
        }
        self.next_revision.set(self.next_revision.get().max(version.revision) + 1);
        let mut projects = self.projects.borrow_mut();
        let versions = projects.entry(version.project_id.clone()).or_default();
        versions.retain(|v| v.version != version.version);
        versions.push(version);
        self
    }

    /// Minimum version the server demands of an npm package.
    pub fn require_package(&self, package: &str, version: &str) {
        self.required
            .borrow_mut()
            .insert(package.to_string(), version.to_string());
    }

    /// Pretend merge bases were garbage-collected on the server.
    pub fn drop_sync_metadata(&self) {
        self.metadata_available.set(false);
    }

    /// How often `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == method).count()
    }

    /// The checksum the server reports for a generated file. It is keyed on
    /// the asset id so it never equals a plain hash of the content.
    pub fn server_checksum(id: &str, content: &str) -> String {
        compute_checksum(format!("{id}\n{content}"))
    }

    pub fn component_requests(&self) -> Vec<ProjectComponentsRequest> {
        self.component_requests.borrow().clone()
    }

    fn record(&self, method: &str) {
        self.calls.borrow_mut().push(method.to_string());
    }

    fn find(&self, project_id: &str, range: &str) -> Result<MockVersion> {
        let projects = self.projects.borrow();
        let versions = projects
            .get(project_id)
            .ok_or_else(|| Error::app_server(404, format!("Project {project_id} not found")))?;
        let range = VersionRange::parse(range)?;
        let best = range
            .max_satisfying(versions.iter().map(|v| v.version.as_str()))
            .ok_or_else(|| Error::app_server(404, format!("No version of {project_id} satisfies {range}")))?;
        versions
            .iter()
            .find(|v| v.version == best)
            .cloned()
            .ok_or_else(|| Error::app_server(500, "version vanished"))
    }

    fn meta(version: &MockVersion, branch_name: &str, token: Option<String>, indirect: bool) -> ProjectVersionMeta {
        ProjectVersionMeta {
            project_id: version.project_id.clone(),
            branch_name: branch_name.to_string(),
            project_api_token: token,
            version: version.version.clone(),
            project_name: version.project_name.clone(),
            component_ids: version.components.iter().map(|c| c.id.clone()).collect(),
            dependencies: version.dependencies.clone(),
            indirect,
        }
    }

    fn css_extension(style: &StyleConfig) -> &'static str {
        match style.scheme {
            StyleScheme::CssModules => ".module.css",
            StyleScheme::Css => ".css",
        }
    }

    /// Render module generated for `component` at `version`.
    pub fn render_module(version: &MockVersion, component: &MockComponent, css_ext: &str) -> String {
        let MockComponent { id, name, body, uses, .. } = component;
        let project_id = &version.project_id;
        let snake = snake_case(&version.project_name);
        let imports: String = uses
            .iter()
            .map(|(dep_id, dep_name)| {
                format!("import {dep_name} from \"./{dep_name}\"; // plasmic-import: {dep_id}/component\n")
            })
            .collect();
        format!(
            "// @ts-nocheck\n\
             /* eslint-disable */\n\
             import * as React from \"react\";\n\
             {imports}\
             import projectcss from \"./plasmic_{snake}{css_ext}\"; // plasmic-import: {project_id}/projectcss\n\
             import sty from \"./Plasmic{name}{css_ext}\"; // plasmic-import: {id}/css\n\
             \n\
             export function Plasmic{name}() {{\n  \
               return <div className={{projectcss.root + \" \" + sty.root}}>{body}</div>;\n\
             }}\n\
             \n\
             export default Plasmic{name};\n\
             /* {project_id}@{} */\n",
            version.version
        )
    }

    /// Skeleton generated for `component` at `version`.
    pub fn skeleton_module(version: &MockVersion, component: &MockComponent, css_ext: &str) -> String {
        let MockComponent { id, name, body, .. } = component;
        let snake = snake_case(&version.project_name);
        match component.scheme {
            ComponentScheme::Blackbox => format!(
                "// This is a skeleton starter React component generated by Plasmic.\n\
                 // This file is owned by you, feel free to edit as you see fit.\n\
                 import * as React from \"react\";\n\
                 import {{ Plasmic{name} }} from \"./plasmic/{snake}/Plasmic{name}\"; // plasmic-import: {id}/render\n\
                 \n\
                 function {name}(props: any) {{\n  \
                   return <Plasmic{name} {{...props}} />;\n\
                 }}\n\
                 \n\
                 export default {name};\n"
            ),
            ComponentScheme::Direct => format!(
                "// plasmic-managed-jsx/{}\n\
                 import * as React from \"react\";\n\
                 import sty from \"./plasmic/{snake}/Plasmic{name}{css_ext}\"; // plasmic-import: {id}/css\n\
                 \n\
                 function {name}() {{\n  \
                   return (\n    \
                     <div className={{sty.root}}>\n      \
                       {body}\n    \
                     </div>\n  \
                   );\n\
                 }}\n\
                 \n\
                 export default {name};\n",
                version.revision
            ),
        }
    }

    fn component_bundle(version: &MockVersion, component: &MockComponent, css_ext: &str) -> ComponentBundle {
        ComponentBundle {
            id: component.id.clone(),
            component_name: component.name.clone(),
            render_module: Self::render_module(version, component, css_ext),
            skeleton_module: Self::skeleton_module(version, component, css_ext),
            css_rules: format!(".root {{ /* {} */ }}\n", component.body),
            render_module_file_name: format!("Plasmic{}.tsx", component.name),
            skeleton_module_file_name: component.skeleton_file_name(),
            css_file_name: format!("Plasmic{}{css_ext}", component.name),
            scheme: component.scheme,
            is_page: component.page_path.is_some(),
            path: component.page_path.clone(),
            plume_type: None,
        }
    }
}

impl PlasmicApi for MockApi {
    fn resolve_sync(&self, request: &ResolveSyncRequest) -> Result<VersionResolution> {
        self.record("resolve_sync");
        let mut resolution = VersionResolution::default();
        let mut seen = BTreeSet::new();
        let mut queue = Vec::new();

        for project in &request.projects {
            let version = self.find(&project.project_id, &project.version_range)?;
            seen.insert(version.project_id.clone());
            queue.extend(version.dependencies.clone());
            resolution.projects.push(Self::meta(
                &version,
                &project.branch_name,
                project.project_api_token.clone(),
                false,
            ));
        }

        while request.recursive
            && let Some((dep_id, dep_version)) = queue.pop()
        {
            if !seen.insert(dep_id.clone()) {
                continue;
            }
            let version = self.find(&dep_id, &dep_version)?;
            queue.extend(version.dependencies.clone());
            resolution.dependencies.push(Self::meta(&version, "main", None, true));
        }
        Ok(resolution)
    }

    fn project_components(&self, request: &ProjectComponentsRequest) -> Result<ProjectBundle> {
        self.record("project_components");
        self.component_requests.borrow_mut().push(request.clone());
        let version = self.find(&request.project_id, &request.version)?;
        let css_ext = Self::css_extension(&request.style);
        self.css_ext.set(css_ext);

        let wanted = |c: &MockComponent| match &request.component_id_or_names {
            Some(filter) => filter.iter().any(|f| *f == c.id || *f == c.name),
            None => true,
        };
        let all: Vec<ComponentBundle> = version
            .components
            .iter()
            .filter(|&c| wanted(c))
            .map(|c| Self::component_bundle(&version, c, css_ext))
            .collect();

        let known = |pairs: &[(String, String)], id: &str, content: &str| {
            pairs
                .iter()
                .any(|(known_id, checksum)| known_id == id && *checksum == Self::server_checksum(id, content))
        };
        let components = all
            .iter()
            .filter(|c| {
                !(known(&request.checksums.render_module_checksums, &c.id, &c.render_module)
                    && known(&request.checksums.css_rules_checksums, &c.id, &c.css_rules))
            })
            .cloned()
            .collect();

        let snake = snake_case(&version.project_name);
        Ok(ProjectBundle {
            components,
            project_config: ProjectMetaBundle {
                project_id: version.project_id.clone(),
                project_name: version.project_name.clone(),
                css_file_name: format!("plasmic_{snake}{css_ext}"),
                css_rules: format!(".root {{ /* {} */ }}\n", version.project_name),
                js_bundle_themes: Vec::new(),
                global_context_bundle: None,
            },
            global_variants: Vec::new(),
            used_tokens: StyleTokensMap::default(),
            icon_assets: version
                .icons
                .iter()
                .map(|(id, name)| IconBundle {
                    id: id.clone(),
                    name: name.clone(),
                    module: format!("export function {name}Icon() {{ return <svg />; }}\n"),
                    file_name: format!("PlasmicIcon__{name}.tsx"),
                })
                .collect(),
            image_assets: Vec::new(),
            checksums: ChecksumBundle {
                render_module_checksums: all
                    .iter()
                    .map(|c| (c.id.clone(), Self::server_checksum(&c.id, &c.render_module)))
                    .collect(),
                css_rules_checksums: all
                    .iter()
                    .map(|c| (c.id.clone(), Self::server_checksum(&c.id, &c.css_rules)))
                    .collect(),
                ..ChecksumBundle::default()
            },
            used_npm_packages: version.npm_packages.clone(),
        })
    }

    fn project_sync_metadata(&self, project_id: &str, _branch_name: &str, revision: u64) -> Result<ProjectSyncMetadata> {
        self.record("project_sync_metadata");
        if !self.metadata_available.get() {
            return Err(Error::app_server(404, "sync metadata not found"));
        }
        let projects = self.projects.borrow();
        let version = projects
            .get(project_id)
            .and_then(|versions| versions.iter().find(|v| v.revision == revision))
            .ok_or_else(|| Error::app_server(404, format!("revision {revision} of {project_id} not found")))?;
        Ok(ProjectSyncMetadata {
            project_id: project_id.to_string(),
            revision,
            components: version
                .components
                .iter()
                .map(|c| (c.id.clone(), Self::skeleton_module(version, c, self.css_ext.get())))
                .collect(),
        })
    }

    fn gen_style_config(&self, style: &StyleConfig) -> Result<StyleConfigResponse> {
        self.record("gen_style_config");
        Ok(StyleConfigResponse {
            default_style_css_file_name: format!("plasmic__default_style{}", Self::css_extension(style)),
            default_style_css_rules: ".plasmic_default__all { box-sizing: border-box; }\n".to_string(),
        })
    }

    fn required_packages(&self) -> Result<RequiredPackages> {
        self.record("required_packages");
        Ok(RequiredPackages(self.required.borrow().clone()))
    }
}
