//! The Plasmic server boundary
//!
//! [`PlasmicApi`] is everything the sync engine needs from the server.
//! Bundles are validated into typed records at this boundary; the engine
//! never looks at raw JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{CodeConfig, ComponentScheme, ImagesConfig, Platform, StyleConfig};
use crate::error::Result;

pub const CLI_PACKAGE: &str = "@plasmicapp/cli";
pub const REACT_WEB_PACKAGE: &str = "@plasmicapp/react-web";

/// One project to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub project_id: String,
    pub branch_name: String,
    pub version_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id_or_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_api_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSyncRequest {
    pub projects: Vec<ProjectRequest>,
    pub recursive: bool,
}

/// A project pinned to an exact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersionMeta {
    pub project_id: String,
    #[serde(default = "default_branch")]
    pub branch_name: String,
    #[serde(default)]
    pub project_api_token: Option<String>,
    pub version: String,
    pub project_name: String,
    #[serde(default)]
    pub component_ids: Vec<String>,
    /// Dependency project id to exact version.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub indirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionConflict {
    pub project_id: String,
    #[serde(default)]
    pub message: String,
}

/// Server answer to [`PlasmicApi::resolve_sync`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResolution {
    #[serde(default)]
    pub projects: Vec<ProjectVersionMeta>,
    /// Transitive dependencies of `projects`.
    #[serde(default)]
    pub dependencies: Vec<ProjectVersionMeta>,
    #[serde(default)]
    pub conflicts: Vec<VersionConflict>,
}

/// Checksums of what is on disk, so the server can skip unchanged files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksumBundle {
    #[serde(default)]
    pub render_module_checksums: Vec<(String, String)>,
    #[serde(default)]
    pub css_rules_checksums: Vec<(String, String)>,
    #[serde(default)]
    pub image_checksums: Vec<(String, String)>,
    #[serde(default)]
    pub icon_checksums: Vec<(String, String)>,
    #[serde(default)]
    pub global_variant_checksums: Vec<(String, String)>,
    #[serde(default)]
    pub project_css_checksum: String,
    #[serde(default)]
    pub global_contexts_checksum: String,
}

/// Which checksum list of a [`ChecksumBundle`] to look in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    RenderModule,
    CssRules,
    Image,
    Icon,
    GlobalVariant,
}

impl ChecksumBundle {
    /// The checksum the server recorded for `id`, if it sent one.
    pub fn get(&self, kind: ChecksumKind, id: &str) -> Option<&str> {
        let list = match kind {
            ChecksumKind::RenderModule => &self.render_module_checksums,
            ChecksumKind::CssRules => &self.css_rules_checksums,
            ChecksumKind::Image => &self.image_checksums,
            ChecksumKind::Icon => &self.icon_checksums,
            ChecksumKind::GlobalVariant => &self.global_variant_checksums,
        };
        list.iter().find(|(known, _)| known == id).map(|(_, checksum)| checksum.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectComponentsRequest {
    pub project_id: String,
    pub branch_name: String,
    pub version: String,
    pub platform: Platform,
    pub code: CodeConfig,
    pub style: StyleConfig,
    pub images: ImagesConfig,
    pub new_component_scheme: ComponentScheme,
    /// Scheme already recorded for each known component.
    pub existing_component_schemes: BTreeMap<String, ComponentScheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id_or_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_api_token: Option<String>,
    pub checksums: ChecksumBundle,
    pub indirect: bool,
    pub wrap_pages_with_global_contexts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBundle {
    pub id: String,
    pub component_name: String,
    pub render_module: String,
    pub skeleton_module: String,
    pub css_rules: String,
    pub render_module_file_name: String,
    pub skeleton_module_file_name: String,
    pub css_file_name: String,
    pub scheme: ComponentScheme,
    #[serde(default)]
    pub is_page: bool,
    /// Route of a page component.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub plume_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalVariantBundle {
    pub id: String,
    pub name: String,
    pub context_module: String,
    pub context_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsBundleTheme {
    pub theme_file_name: String,
    pub theme_module: String,
    pub bundle_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalContextBundle {
    pub id: String,
    pub context_module: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetaBundle {
    pub project_id: String,
    pub project_name: String,
    pub css_file_name: String,
    pub css_rules: String,
    #[serde(default)]
    pub js_bundle_themes: Vec<JsBundleTheme>,
    #[serde(default)]
    pub global_context_bundle: Option<GlobalContextBundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconBundle {
    pub id: String,
    pub name: String,
    pub module: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBundle {
    pub id: String,
    pub name: String,
    /// Base64 data url or plain base64 payload.
    pub blob: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMeta {
    pub project_id: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleToken {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
    pub meta: TokenMeta,
}

/// Design tokens in theo format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleTokensMap {
    #[serde(default)]
    pub props: Vec<StyleToken>,
    #[serde(default)]
    pub global: Value,
}

/// Server answer to [`PlasmicApi::project_components`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBundle {
    pub components: Vec<ComponentBundle>,
    pub project_config: ProjectMetaBundle,
    #[serde(default)]
    pub global_variants: Vec<GlobalVariantBundle>,
    #[serde(default)]
    pub used_tokens: StyleTokensMap,
    #[serde(default)]
    pub icon_assets: Vec<IconBundle>,
    #[serde(default)]
    pub image_assets: Vec<ImageBundle>,
    /// Checksums of what the server considers current; component ids listed
    /// here but absent from `components` are unchanged, not deleted.
    #[serde(default)]
    pub checksums: ChecksumBundle,
    /// Packages the generated code imports.
    #[serde(default)]
    pub used_npm_packages: Vec<String>,
}

/// Base code of a project's components at one revision, used as the
/// common ancestor of direct-scheme merges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSyncMetadata {
    pub project_id: String,
    pub revision: u64,
    /// Component id to the skeleton generated at `revision`.
    #[serde(default)]
    pub components: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfigResponse {
    pub default_style_css_file_name: String,
    pub default_style_css_rules: String,
}

/// Minimum versions of companion packages, keyed by package name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredPackages(pub BTreeMap<String, String>);

impl RequiredPackages {
    pub fn get(&self, package: &str) -> Option<&str> {
        self.0.get(package).map(String::as_str)
    }
}

/// Remote calls the sync engine makes.
pub trait PlasmicApi {
    /// Pin each requested project (and its dependencies) to exact versions.
    fn resolve_sync(&self, request: &ResolveSyncRequest) -> Result<VersionResolution>;

    /// Generated code for one project version.
    fn project_components(&self, request: &ProjectComponentsRequest) -> Result<ProjectBundle>;

    /// Merge base of a project at `revision`.
    fn project_sync_metadata(&self, project_id: &str, branch_name: &str, revision: u64)
    -> Result<ProjectSyncMetadata>;

    /// The shared default style sheet.
    fn gen_style_config(&self, style: &StyleConfig) -> Result<StyleConfigResponse>;

    fn required_packages(&self) -> Result<RequiredPackages>;
}

fn default_branch() -> String {
    "main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checksum_pairs_are_json_arrays() {
        let bundle = ChecksumBundle {
            render_module_checksums: vec![("c1".into(), "sha256:aa".into())],
            ..Default::default()
        };
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["renderModuleChecksums"], json!([["c1", "sha256:aa"]]));
    }

    #[test]
    fn checksum_lookup_by_kind() {
        let bundle = ChecksumBundle {
            render_module_checksums: vec![("c1".into(), "r1".into())],
            css_rules_checksums: vec![("c1".into(), "s1".into())],
            ..Default::default()
        };
        assert_eq!(bundle.get(ChecksumKind::RenderModule, "c1"), Some("r1"));
        assert_eq!(bundle.get(ChecksumKind::CssRules, "c1"), Some("s1"));
        assert_eq!(bundle.get(ChecksumKind::Icon, "c1"), None);
        assert_eq!(bundle.get(ChecksumKind::RenderModule, "c2"), None);
    }

    #[test]
    fn optional_bundle_fields_default() {
        let bundle: ProjectBundle = serde_json::from_value(json!({
            "components": [],
            "projectConfig": {
                "projectId": "p1",
                "projectName": "Site",
                "cssFileName": "plasmic__default_style.css",
                "cssRules": ""
            }
        }))
        .unwrap();
        assert!(bundle.icon_assets.is_empty());
        assert!(bundle.project_config.global_context_bundle.is_none());
    }

    #[test]
    fn required_packages_are_a_plain_map() {
        let packages: RequiredPackages =
            serde_json::from_value(json!({ "@plasmicapp/cli": "0.1.0" })).unwrap();
        assert_eq!(packages.get(CLI_PACKAGE), Some("0.1.0"));
        assert_eq!(packages.get(REACT_WEB_PACKAGE), None);
    }
}
