//! Typed model of `plasmic.json`
//!
//! Unknown keys are kept in `extra` maps so a round trip through this
//! model never drops settings written by newer tools or by hand.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::version::LATEST;

pub const CONFIG_FILE_NAME: &str = "plasmic.json";

/// Target framework of the generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    React,
    Nextjs,
    Gatsby,
    Tanstack,
}

impl Platform {
    /// Platforms whose pages live at routed file paths.
    pub fn is_page_aware(self) -> bool {
        matches!(self, Self::Nextjs | Self::Gatsby | Self::Tanstack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ts,
    Js,
}

/// How a component's edit surface is kept in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentScheme {
    /// The server owns the render module; the skeleton is written once.
    #[default]
    Blackbox,
    /// The skeleton is edited directly and three-way merged on every sync.
    Direct,
}

impl ComponentScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blackbox => "blackbox",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for ComponentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blackbox" => Ok(Self::Blackbox),
            "direct" => Ok(Self::Direct),
            other => Err(format!("unknown component scheme '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactRuntime {
    #[default]
    Classic,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleScheme {
    Css,
    #[default]
    CssModules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageScheme {
    #[default]
    Inlined,
    Files,
    PublicFiles,
    Cdn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokensScheme {
    #[default]
    Theo,
}

/// Whether plasmic generates the component or the user maps it to their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    #[default]
    Managed,
    Mapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Page,
    #[default]
    Component,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeConfig {
    #[serde(default)]
    pub lang: Lang,
    #[serde(default)]
    pub scheme: ComponentScheme,
    #[serde(default)]
    pub react_runtime: ReactRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    #[serde(default)]
    pub scheme: StyleScheme,
    /// Where the shared default style sheet goes; empty means next to the
    /// managed files.
    #[serde(default)]
    pub default_style_css_file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesConfig {
    #[serde(default)]
    pub scheme: ImageScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensConfig {
    #[serde(default)]
    pub scheme: TokensScheme,
    #[serde(default = "default_tokens_file_path")]
    pub tokens_file_path: String,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            scheme: TokensScheme::Theo,
            tokens_file_path: default_tokens_file_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalVariantsConfig {
    #[serde(default)]
    pub variant_groups: Vec<GlobalVariantGroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalVariantGroupConfig {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub context_file_path: String,
}

/// Root of `plasmic.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub platform: Platform,
    /// Source directory, relative to the config file.
    #[serde(default = "default_src_dir")]
    pub src_dir: String,
    /// Managed files directory, relative to `src_dir`.
    #[serde(default = "default_plasmic_dir")]
    pub default_plasmic_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextjs_config: Option<PagesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gatsby_config: Option<PagesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tanstack_config: Option<PagesConfig>,
    #[serde(default)]
    pub code: CodeConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub global_variants: GlobalVariantsConfig,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
    #[serde(default = "default_true")]
    pub wrap_pages_with_global_contexts: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_sync_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            src_dir: default_src_dir(),
            default_plasmic_dir: default_plasmic_dir(),
            nextjs_config: None,
            gatsby_config: None,
            tanstack_config: None,
            code: CodeConfig::default(),
            style: StyleConfig::default(),
            images: ImagesConfig::default(),
            tokens: TokensConfig::default(),
            global_variants: GlobalVariantsConfig::default(),
            projects: Vec::new(),
            wrap_pages_with_global_contexts: true,
            post_sync_commands: Vec::new(),
            cli_version: None,
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Pages directory of the configured platform, if it routes pages.
    pub fn pages_dir(&self) -> Option<&str> {
        let pages = match self.platform {
            Platform::Nextjs => self.nextjs_config.as_ref(),
            Platform::Gatsby => self.gatsby_config.as_ref(),
            Platform::Tanstack => self.tanstack_config.as_ref(),
            Platform::React => None,
        };
        pages.and_then(|p| p.pages_dir.as_deref())
    }

    pub fn project(&self, project_id: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.project_id == project_id)
    }

    pub fn project_mut(&mut self, project_id: &str) -> Option<&mut ProjectConfig> {
        self.projects.iter_mut().find(|p| p.project_id == project_id)
    }

    /// Look a component up by id across all projects.
    pub fn component(&self, component_id: &str) -> Option<&ComponentConfig> {
        self.projects
            .iter()
            .flat_map(|p| p.components.iter())
            .find(|c| c.id == component_id)
    }

    /// The scheme a component is synced with, falling back to the global
    /// default for entries that never recorded one.
    pub fn effective_scheme(&self, component: &ComponentConfig) -> ComponentScheme {
        component.scheme.unwrap_or(self.code.scheme)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsBundleThemeConfig {
    pub theme_file_path: String,
    pub bundle_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_branch_name: Option<String>,
    /// Desired version range, or `latest`.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub css_file_path: String,
    #[serde(default)]
    pub global_contexts_file_path: String,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub icons: Vec<IconConfig>,
    #[serde(default)]
    pub images: Vec<ImageConfig>,
    #[serde(default)]
    pub js_bundle_themes: Vec<JsBundleThemeConfig>,
    /// Synced only because another project depends on it.
    #[serde(default)]
    pub indirect: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectConfig {
    pub fn new(project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            project_api_token: None,
            project_branch_name: None,
            version: default_version(),
            css_file_path: String::new(),
            global_contexts_file_path: String::new(),
            components: Vec::new(),
            icons: Vec::new(),
            images: Vec::new(),
            js_bundle_themes: Vec::new(),
            indirect: false,
            extra: Map::new(),
        }
    }

    pub fn branch_name(&self) -> &str {
        self.project_branch_name.as_deref().unwrap_or("main")
    }

    pub fn component(&self, component_id: &str) -> Option<&ComponentConfig> {
        self.components.iter().find(|c| c.id == component_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSpec {
    /// Module the component is imported from: a path relative to `src_dir`
    /// or a package specifier.
    pub module_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Server-stable id; the only join key with bundles.
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ComponentKind,
    pub project_id: String,
    pub render_module_file_path: String,
    pub css_file_path: String,
    pub import_spec: ImportSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<ComponentScheme>,
    #[serde(default)]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plume_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconConfig {
    pub id: String,
    pub name: String,
    pub module_file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub id: String,
    pub name: String,
    pub file_path: String,
}

fn default_src_dir() -> String {
    "./src/components".to_string()
}

fn default_plasmic_dir() -> String {
    "./plasmic".to_string()
}

fn default_tokens_file_path() -> String {
    "plasmic-tokens.theo.json".to_string()
}

fn default_version() -> String {
    LATEST.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_document_gets_defaults() {
        let config: Config = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.style.scheme, StyleScheme::CssModules);
        assert!(config.wrap_pages_with_global_contexts);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "$schema": "https://unpkg.com/@plasmicapp/cli/dist/plasmic.schema.json",
            "platform": "nextjs",
            "nextjsConfig": { "pagesDir": "../pages" },
            "projects": [{
                "projectId": "p1",
                "projectName": "Site",
                "version": "^1.0.0",
                "cssFilePath": "plasmic/site/plasmic__default_style.css",
                "customFlag": 3,
                "components": [{
                    "id": "c1",
                    "name": "Button",
                    "type": "managed",
                    "projectId": "p1",
                    "renderModuleFilePath": "plasmic/site/PlasmicButton.tsx",
                    "cssFilePath": "plasmic/site/PlasmicButton.css",
                    "importSpec": { "modulePath": "Button.tsx" },
                    "scheme": "direct"
                }]
            }]
        });

        let config: Config = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(config.pages_dir(), Some("../pages"));
        assert_eq!(config.projects[0].extra["customFlag"], json!(3));
        assert_eq!(
            config.effective_scheme(&config.projects[0].components[0]),
            ComponentScheme::Direct
        );

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["$schema"], raw["$schema"]);
        assert_eq!(back["projects"][0]["customFlag"], json!(3));
        assert_eq!(back["projects"][0]["components"][0]["type"], json!("managed"));
    }

    #[test]
    fn scheme_parses_from_flag_value() {
        assert_eq!("direct".parse::<ComponentScheme>(), Ok(ComponentScheme::Direct));
        assert!("merged".parse::<ComponentScheme>().is_err());
    }

    #[test]
    fn enum_spellings() {
        let images: ImagesConfig = serde_json::from_value(json!({"scheme": "public-files"})).unwrap();
        assert_eq!(images.scheme, ImageScheme::PublicFiles);
        let style: StyleConfig = serde_json::from_value(json!({"scheme": "css"})).unwrap();
        assert_eq!(style.scheme, StyleScheme::Css);
    }
}
