//! Project-level files
//!
//! Everything a project bundle carries besides its components: global
//! variant contexts, the project css, js bundle themes, the global contexts
//! provider, design tokens, icons and images.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use plasmic_code::{maybe_convert_tsx_to_jsx, tsx_to_jsx};
use plasmic_fs::checksum::compute_checksum;
use plasmic_fs::{JsonStore, NormalizedPath};
use tracing::{debug, info};

use crate::api::{
    ChecksumBundle, ChecksumKind, ImageBundle, PlasmicApi, ProjectBundle, ProjectComponentsRequest, ProjectVersionMeta,
    StyleTokensMap,
};
use crate::config::{
    FileLockKind, GlobalVariantGroupConfig, IconConfig, ImageConfig, ImageScheme, JsBundleThemeConfig, Lang,
    ProjectConfig,
};
use crate::error::{Error, Result};
use crate::paths::{default_resource_path, script_extension};
use crate::version::LATEST;

use super::components::{self, UpdateSummary};
use super::context::SyncContext;
use super::engine::SyncedProject;
use super::merge::PendingMerge;

/// Range recorded for a project pulled in only as a dependency.
const INDIRECT_VERSION_RANGE: &str = ">0.0.0";

/// Checksum to lock for a written file: the server's own when it sent one,
/// so the next request can skip the file, else a hash of the content.
pub(super) fn locked_checksum(
    checksums: &ChecksumBundle,
    kind: ChecksumKind,
    id: &str,
    content: impl AsRef<[u8]>,
) -> String {
    checksums
        .get(kind, id)
        .map(str::to_string)
        .unwrap_or_else(|| compute_checksum(content))
}

fn single_checksum(server: &str, content: &str) -> String {
    if server.is_empty() {
        compute_checksum(content)
    } else {
        server.to_string()
    }
}

/// Fetch and write one resolved project.
///
/// Returns the npm packages its generated code imports.
pub(crate) fn sync_project(
    ctx: &mut SyncContext<'_>,
    api: &dyn PlasmicApi,
    meta: &ProjectVersionMeta,
    summary: &mut UpdateSummary,
    pending: &mut Vec<PendingMerge>,
) -> Result<Vec<String>> {
    let request = components_request(ctx, meta);
    let mut bundle = api.project_components(&request)?;
    info!(
        project = %meta.project_name,
        version = %meta.version,
        components = bundle.components.len(),
        "syncing project"
    );
    if ctx.config.code.lang == Lang::Js {
        convert_bundle_to_jsx(&mut bundle)?;
    }

    sync_global_variants(ctx, meta, &bundle)?;
    sync_project_config(ctx, meta, &bundle)?;
    components::sync_components(ctx, meta, &bundle, summary, pending)?;
    sync_style_tokens(ctx, &meta.project_id, &bundle.used_tokens)?;
    sync_icons(ctx, meta, &bundle)?;
    sync_images(ctx, meta, &bundle)?;

    let lang = ctx.config.code.lang;
    let lock = ctx.project_lock(&meta.project_id, &meta.branch_name);
    lock.version = meta.version.clone();
    lock.branch_name = meta.branch_name.clone();
    lock.dependencies = meta.dependencies.clone();
    lock.lang = lang;

    ctx.report.synced.push(SyncedProject {
        project_id: meta.project_id.clone(),
        project_name: bundle.project_config.project_name.clone(),
        version: meta.version.clone(),
    });
    ctx.report.action(format!(
        "Synced {} ({}) at version {}",
        bundle.project_config.project_name, meta.project_id, meta.version
    ));
    Ok(bundle.used_npm_packages)
}

fn components_request(ctx: &SyncContext<'_>, meta: &ProjectVersionMeta) -> ProjectComponentsRequest {
    let config = &ctx.config;
    let project = config.project(&meta.project_id);
    let existing_component_schemes = project
        .map(|p| {
            p.components
                .iter()
                .map(|c| (c.id.clone(), config.effective_scheme(c)))
                .collect()
        })
        .unwrap_or_default();

    ProjectComponentsRequest {
        project_id: meta.project_id.clone(),
        branch_name: meta.branch_name.clone(),
        version: meta.version.clone(),
        platform: config.platform,
        code: config.code.clone(),
        style: config.style.clone(),
        images: config.images.clone(),
        new_component_scheme: ctx.options.new_component_scheme.unwrap_or(config.code.scheme),
        existing_component_schemes,
        component_id_or_names: (!ctx.options.components.is_empty()).then(|| ctx.options.components.clone()),
        project_api_token: meta
            .project_api_token
            .clone()
            .or_else(|| project.and_then(|p| p.project_api_token.clone())),
        checksums: current_checksums(ctx, &meta.project_id),
        indirect: meta.indirect,
        wrap_pages_with_global_contexts: config.wrap_pages_with_global_contexts,
    }
}

/// Checksums of the files still on disk, so the server can leave them out.
fn current_checksums(ctx: &SyncContext<'_>, project_id: &str) -> ChecksumBundle {
    if ctx.options.force {
        return ChecksumBundle::default();
    }
    let (Some(lock), Some(project)) = (ctx.lock.project(project_id), ctx.config.project(project_id)) else {
        return ChecksumBundle::default();
    };
    let on_disk = |path: Option<&str>| path.is_some_and(|p| !p.is_empty() && ctx.exists(p));
    let keep = |kind: FileLockKind, exists: &dyn Fn(&str) -> bool| -> Vec<(String, String)> {
        lock.checksums(kind).into_iter().filter(|(id, _)| exists(id.as_str())).collect()
    };
    let single = |kind: FileLockKind, path: &str| -> String {
        match lock.checksum(kind, project_id) {
            Some(checksum) if on_disk(Some(path)) => checksum.to_string(),
            _ => String::new(),
        }
    };

    ChecksumBundle {
        render_module_checksums: keep(FileLockKind::RenderModule, &|id| {
            on_disk(project.component(id).map(|c| c.render_module_file_path.as_str()))
        }),
        css_rules_checksums: keep(FileLockKind::CssRules, &|id| {
            on_disk(project.component(id).map(|c| c.css_file_path.as_str()))
        }),
        image_checksums: keep(FileLockKind::Image, &|id| {
            on_disk(project.images.iter().find(|i| i.id == id).map(|i| i.file_path.as_str()))
        }),
        icon_checksums: keep(FileLockKind::Icon, &|id| {
            on_disk(project.icons.iter().find(|i| i.id == id).map(|i| i.module_file_path.as_str()))
        }),
        global_variant_checksums: keep(FileLockKind::GlobalVariant, &|id| {
            on_disk(
                ctx.config
                    .global_variants
                    .variant_groups
                    .iter()
                    .find(|g| g.id == id)
                    .map(|g| g.context_file_path.as_str()),
            )
        }),
        project_css_checksum: single(FileLockKind::ProjectCss, &project.css_file_path),
        global_contexts_checksum: single(FileLockKind::GlobalContexts, &project.global_contexts_file_path),
    }
}

/// Erase TypeScript from every module of a bundle.
fn convert_bundle_to_jsx(bundle: &mut ProjectBundle) -> Result<()> {
    for c in &mut bundle.components {
        (c.render_module_file_name, c.render_module) =
            maybe_convert_tsx_to_jsx(&c.render_module_file_name, &c.render_module)?;
        (c.skeleton_module_file_name, c.skeleton_module) =
            maybe_convert_tsx_to_jsx(&c.skeleton_module_file_name, &c.skeleton_module)?;
    }
    for v in &mut bundle.global_variants {
        (v.context_file_name, v.context_module) = maybe_convert_tsx_to_jsx(&v.context_file_name, &v.context_module)?;
    }
    for icon in &mut bundle.icon_assets {
        (icon.file_name, icon.module) = maybe_convert_tsx_to_jsx(&icon.file_name, &icon.module)?;
    }
    for theme in &mut bundle.project_config.js_bundle_themes {
        (theme.theme_file_name, theme.theme_module) =
            maybe_convert_tsx_to_jsx(&theme.theme_file_name, &theme.theme_module)?;
    }
    if let Some(contexts) = &mut bundle.project_config.global_context_bundle {
        contexts.context_module = tsx_to_jsx(&contexts.context_module)?;
    }
    Ok(())
}

fn sync_global_variants(ctx: &mut SyncContext<'_>, meta: &ProjectVersionMeta, bundle: &ProjectBundle) -> Result<()> {
    let project_name = &bundle.project_config.project_name;
    for variant in &bundle.global_variants {
        let groups = &mut ctx.config.global_variants.variant_groups;
        let path = match groups.iter_mut().find(|g| g.id == variant.id) {
            Some(group) => {
                group.name = variant.name.clone();
                group.context_file_path.clone()
            }
            None => {
                let path = default_resource_path(&ctx.config, project_name, &variant.context_file_name);
                ctx.config.global_variants.variant_groups.push(GlobalVariantGroupConfig {
                    id: variant.id.clone(),
                    name: variant.name.clone(),
                    project_id: meta.project_id.clone(),
                    context_file_path: path.clone(),
                });
                path
            }
        };
        debug!(variant = %variant.name, path = %path, "syncing global variant");
        ctx.write(&path, variant.context_module.as_str(), true)?;
        ctx.project_lock(&meta.project_id, &meta.branch_name).upsert_file_lock(
            FileLockKind::GlobalVariant,
            &variant.id,
            locked_checksum(&bundle.checksums, ChecksumKind::GlobalVariant, &variant.id, &variant.context_module),
        );
    }
    Ok(())
}

/// Create or refresh the project entry and write its shared files.
fn sync_project_config(ctx: &mut SyncContext<'_>, meta: &ProjectVersionMeta, bundle: &ProjectBundle) -> Result<()> {
    let project_meta = &bundle.project_config;
    let name = project_meta.project_name.as_str();
    let id = meta.project_id.as_str();

    let is_new = ctx.config.project(id).is_none();
    if is_new {
        let mut project = ProjectConfig::new(id, name);
        project.version = if meta.indirect {
            INDIRECT_VERSION_RANGE.to_string()
        } else {
            LATEST.to_string()
        };
        project.indirect = meta.indirect;
        project.project_api_token = meta.project_api_token.clone();
        project.project_branch_name = (meta.branch_name != "main").then(|| meta.branch_name.clone());
        ctx.config.projects.push(project);
        ctx.report.action(format!("Tracking new project {name} ({id})"));
    }

    let index = ctx.project_index(id)?;
    let mut project = ctx.config.projects[index].clone();
    project.project_name = name.to_string();
    if !meta.indirect {
        project.indirect = false;
    }

    if project.css_file_path.is_empty() {
        project.css_file_path = default_resource_path(&ctx.config, name, &project_meta.css_file_name);
    }
    ctx.write(&project.css_file_path, project_meta.css_rules.as_str(), !is_new)?;
    ctx.project_lock(id, &meta.branch_name)
        .upsert_file_lock(FileLockKind::ProjectCss, id, single_checksum(&bundle.checksums.project_css_checksum, &project_meta.css_rules));

    let mut themes = Vec::new();
    for theme in &project_meta.js_bundle_themes {
        let path = project
            .js_bundle_themes
            .iter()
            .find(|t| t.bundle_name == theme.bundle_name)
            .map(|t| t.theme_file_path.clone())
            .unwrap_or_else(|| default_resource_path(&ctx.config, name, &theme.theme_file_name));
        ctx.write(&path, theme.theme_module.as_str(), true)?;
        themes.push(JsBundleThemeConfig {
            theme_file_path: path,
            bundle_name: theme.bundle_name.clone(),
        });
    }
    project.js_bundle_themes = themes;

    if let Some(contexts) = &project_meta.global_context_bundle {
        if project.global_contexts_file_path.is_empty() {
            let file_name = format!("PlasmicGlobalContextsProvider{}", script_extension(&ctx.config));
            project.global_contexts_file_path = default_resource_path(&ctx.config, name, &file_name);
        }
        ctx.write(&project.global_contexts_file_path, contexts.context_module.as_str(), true)?;
        ctx.project_lock(id, &meta.branch_name).upsert_file_lock(
            FileLockKind::GlobalContexts,
            id,
            single_checksum(&bundle.checksums.global_contexts_checksum, &contexts.context_module),
        );
    }

    ctx.config.projects[index] = project;
    Ok(())
}

/// Replace this project's tokens in the shared theo file, keeping other
/// projects' tokens.
fn sync_style_tokens(ctx: &mut SyncContext<'_>, project_id: &str, tokens: &StyleTokensMap) -> Result<()> {
    let relative = ctx.config.tokens.tokens_file_path.clone();
    if relative.is_empty() {
        return Ok(());
    }
    let path = ctx.path(&relative);
    let mut current: StyleTokensMap = if ctx.exists(&relative) {
        JsonStore::parse(&path, &ctx.read(&relative)?)?
    } else {
        StyleTokensMap::default()
    };

    let had_project = current.props.iter().any(|t| t.meta.project_id == project_id);
    if tokens.props.is_empty() && !had_project {
        return Ok(());
    }
    current.props.retain(|t| t.meta.project_id != project_id);
    current.props.extend(tokens.props.iter().cloned());
    current.props.sort_by(|a, b| a.name.cmp(&b.name));
    if !tokens.global.is_null() {
        current.global = tokens.global.clone();
    }

    let content = JsonStore::render(&path, &current)?;
    ctx.write(&relative, content, true)
}

fn sync_icons(ctx: &mut SyncContext<'_>, meta: &ProjectVersionMeta, bundle: &ProjectBundle) -> Result<()> {
    let project_name = bundle.project_config.project_name.as_str();
    let index = ctx.project_index(&meta.project_id)?;
    for icon in &bundle.icon_assets {
        let path = match ctx.config.projects[index].icons.iter_mut().find(|i| i.id == icon.id) {
            Some(existing) => {
                existing.name = icon.name.clone();
                existing.module_file_path.clone()
            }
            None => {
                let path = default_resource_path(&ctx.config, project_name, &icon.file_name);
                ctx.config.projects[index].icons.push(IconConfig {
                    id: icon.id.clone(),
                    name: icon.name.clone(),
                    module_file_path: path.clone(),
                });
                path
            }
        };
        ctx.write(&path, icon.module.as_str(), true)?;
        ctx.project_lock(&meta.project_id, &meta.branch_name).upsert_file_lock(
            FileLockKind::Icon,
            &icon.id,
            locked_checksum(&bundle.checksums, ChecksumKind::Icon, &icon.id, &icon.module),
        );
    }
    Ok(())
}

/// Images are files on disk only under the `files` scheme; otherwise the
/// generated code embeds them.
fn sync_images(ctx: &mut SyncContext<'_>, meta: &ProjectVersionMeta, bundle: &ProjectBundle) -> Result<()> {
    if ctx.config.images.scheme != ImageScheme::Files {
        return Ok(());
    }
    let project_name = bundle.project_config.project_name.as_str();
    let index = ctx.project_index(&meta.project_id)?;
    for image in &bundle.image_assets {
        let bytes = decode_image(image)?;
        let path = match ctx.config.projects[index].images.iter_mut().find(|i| i.id == image.id) {
            Some(existing) => {
                existing.name = image.name.clone();
                existing.file_path.clone()
            }
            None => {
                let path = default_resource_path(&ctx.config, project_name, &image.file_name);
                ctx.config.projects[index].images.push(ImageConfig {
                    id: image.id.clone(),
                    name: image.name.clone(),
                    file_path: path.clone(),
                });
                path
            }
        };
        let checksum = locked_checksum(&bundle.checksums, ChecksumKind::Image, &image.id, &bytes);
        ctx.write(&path, bytes, true)?;
        ctx.project_lock(&meta.project_id, &meta.branch_name)
            .upsert_file_lock(FileLockKind::Image, &image.id, checksum);
    }
    Ok(())
}

/// Decode a base64 payload, with or without a `data:` url prefix.
fn decode_image(image: &ImageBundle) -> Result<Vec<u8>> {
    let payload = match image.blob.split_once(";base64,") {
        Some((_, data)) => data,
        None => image.blob.as_str(),
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::InvalidBundle {
            message: format!("image {} is not valid base64: {e}", image.name),
        })
}

/// Write the default style sheet shared by every project.
pub(crate) fn sync_style_config(ctx: &mut SyncContext<'_>, api: &dyn PlasmicApi) -> Result<()> {
    let response = api.gen_style_config(&ctx.config.style)?;
    if ctx.config.style.default_style_css_file_path.is_empty() {
        ctx.config.style.default_style_css_file_path = NormalizedPath::new(&ctx.config.default_plasmic_dir)
            .join(&response.default_style_css_file_name)
            .as_str()
            .to_string();
    }
    let path = ctx.config.style.default_style_css_file_path.clone();
    ctx.write(&path, response.default_style_css_rules.as_str(), true)
}
