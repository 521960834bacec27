//! Marker import parsing and rewriting
//!
//! Generated modules reference each other through import declarations
//! tagged with a trailing comment:
//!
//! ```text
//! import Button from "./Button";  // plasmic-import: aBc123/component
//! import sty from "./plasmic/PlasmicButton.module.css";  // plasmic-import: aBc123/css
//! ```
//!
//! The comment names the referenced entity by id, so the import can be
//! repointed whenever the entity's file moves. Everything here works on the
//! syntax tree: unrelated imports and the rest of the module are never
//! reformatted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use crate::edit::{Edit, apply_edits};
use crate::error::{Error, Result};
use crate::parser::SourceParser;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"plasmic-import:\s+([\w\-. ]+)(?:/(component|css|render|globalVariant|projectcss|defaultcss|icon|picture|jsBundle|codeComponent|globalContext))?",
    )
    .expect("Invalid marker regex")
});

static MANAGED_JSX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"plasmic-managed-jsx/(\d+)").expect("Invalid managed-jsx regex")
});

/// What a marker import points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// A component's skeleton module.
    Component,
    /// A component's generated render module.
    Render,
    /// A component's css module.
    Css,
    GlobalVariant,
    /// A project's shared css.
    ProjectCss,
    /// The default style sheet shared by all projects.
    DefaultCss,
    Icon,
    Picture,
    JsBundle,
    CodeComponent,
    GlobalContext,
}

impl ImportKind {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "component" => Self::Component,
            "render" => Self::Render,
            "css" => Self::Css,
            "globalVariant" => Self::GlobalVariant,
            "projectcss" => Self::ProjectCss,
            "defaultcss" => Self::DefaultCss,
            "icon" => Self::Icon,
            "picture" => Self::Picture,
            "jsBundle" => Self::JsBundle,
            "codeComponent" => Self::CodeComponent,
            "globalContext" => Self::GlobalContext,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Render => "render",
            Self::Css => "css",
            Self::GlobalVariant => "globalVariant",
            Self::ProjectCss => "projectcss",
            Self::DefaultCss => "defaultcss",
            Self::Icon => "icon",
            Self::Picture => "picture",
            Self::JsBundle => "jsBundle",
            Self::CodeComponent => "codeComponent",
            Self::GlobalContext => "globalContext",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The parsed `plasmic-import` comment of a marker import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMarker {
    /// Id of the referenced entity. For project-level kinds this is the
    /// project id.
    pub id: String,
    pub kind: Option<ImportKind>,
}

/// Parse a marker out of comment text.
pub fn parse_marker(comment: &str) -> Option<ImportMarker> {
    let caps = MARKER_RE.captures(comment)?;
    let id = caps.get(1)?.as_str().trim().to_string();
    if id.is_empty() {
        return None;
    }
    let kind = caps.get(2).and_then(|m| ImportKind::from_tag(m.as_str()));
    Some(ImportMarker { id, kind })
}

/// The revision recorded by a `plasmic-managed-jsx/<rev>` comment in a
/// direct-scheme module.
pub fn find_managed_jsx_revision(source: &str) -> Option<u64> {
    MANAGED_JSX_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// One `{ imported as local }` entry of an import clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
    pub type_only: bool,
}

impl ImportSpecifier {
    pub fn new(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            imported: imported.into(),
            local: local.into(),
            type_only: false,
        }
    }

    fn render(&self) -> String {
        let prefix = if self.type_only { "type " } else { "" };
        if self.imported == self.local {
            format!("{prefix}{}", self.local)
        } else {
            format!("{prefix}{} as {}", self.imported, self.local)
        }
    }
}

/// An import declaration reduced to the parts the fixup engine edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module path, without quotes.
    pub source: String,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<ImportSpecifier>,
    pub type_only: bool,
}

impl ImportDecl {
    /// Make `imported` available under the local name `alias`.
    ///
    /// An existing binding named `alias` is repointed at `imported`; a
    /// default binding with that name is replaced by a named one.
    pub fn ensure_specifier_with_alias(&mut self, imported: &str, alias: &str) {
        if self.default.as_deref() == Some(alias) {
            self.default = None;
        } else if let Some(existing) = self.named.iter_mut().find(|s| s.local == alias) {
            existing.imported = imported.to_string();
            return;
        }
        self.named.push(ImportSpecifier::new(imported, alias));
    }

    /// Render the declaration on one line.
    pub fn render(&self, quote: char, semicolon: bool) -> String {
        let mut clause = Vec::new();
        if let Some(default) = &self.default {
            clause.push(default.clone());
        }
        if let Some(namespace) = &self.namespace {
            clause.push(format!("* as {namespace}"));
        }
        if !self.named.is_empty() {
            let named: Vec<String> = self.named.iter().map(ImportSpecifier::render).collect();
            clause.push(format!("{{ {} }}", named.join(", ")));
        }

        let mut out = String::from("import ");
        if self.type_only {
            out.push_str("type ");
        }
        if !clause.is_empty() {
            out.push_str(&clause.join(", "));
            out.push_str(" from ");
        }
        out.push(quote);
        out.push_str(&self.source);
        out.push(quote);
        if semicolon {
            out.push(';');
        }
        out
    }
}

/// A marker import located in a parsed module.
struct MarkedImport {
    marker: ImportMarker,
    decl: ImportDecl,
    quote: char,
    semicolon: bool,
    statement: std::ops::Range<usize>,
    /// Trailing marker comment, including the whitespace before it.
    comment: std::ops::Range<usize>,
    /// Whitespace between the statement and its marker comment.
    gap: String,
    comment_text: String,
}

/// List every marker import in a module, in source order.
pub fn marked_imports(file_name: &str, source: &str) -> Result<Vec<(ImportMarker, ImportDecl)>> {
    Ok(collect_marked(file_name, source)?
        .into_iter()
        .map(|m| (m.marker, m.decl))
        .collect())
}

/// Rewrite every marker import through `resolve`.
///
/// `resolve` receives each marker and a mutable copy of its declaration;
/// declarations it changes are re-rendered in place. With `strip_markers`
/// the marker comments are removed as well.
///
/// Returns `None` when the module is unchanged.
pub fn rewrite_marked_imports<E, F>(
    file_name: &str,
    source: &str,
    strip_markers: bool,
    mut resolve: F,
) -> std::result::Result<Option<String>, E>
where
    E: From<Error>,
    F: FnMut(&ImportMarker, &mut ImportDecl) -> std::result::Result<(), E>,
{
    let imports = collect_marked(file_name, source)?;
    let mut edits = Vec::new();
    for import in imports {
        let mut decl = import.decl.clone();
        resolve(&import.marker, &mut decl)?;
        if decl != import.decl {
            edits.push(Edit::replace(
                import.statement,
                decl.render(import.quote, import.semicolon),
            ));
        }
        if strip_markers {
            edits.push(Edit::delete(import.comment));
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }
    let rewritten = apply_edits(source, edits)?;
    Ok((rewritten != source).then_some(rewritten))
}

/// Remove every marker comment, leaving the imports untouched.
pub fn strip_markers(file_name: &str, source: &str) -> Result<String> {
    let stripped = rewrite_marked_imports::<Error, _>(file_name, source, true, |_, _| Ok(()))?;
    Ok(stripped.unwrap_or_else(|| source.to_string()))
}

/// Re-attach marker comments that a merge dropped.
///
/// Imports in `merged` without a trailing comment get the marker that
/// `reference` carries for an import of the same module path.
pub fn restore_markers(file_name: &str, merged: &str, reference: &str) -> Result<String> {
    let markers: BTreeMap<String, String> = collect_marked(file_name, reference)?
        .into_iter()
        .map(|m| (m.decl.source, format!("{}{}", m.gap, m.comment_text)))
        .collect();
    if markers.is_empty() {
        return Ok(merged.to_string());
    }

    let mut parser = SourceParser::for_path(file_name)?;
    let tree = parser.parse(merged)?;
    let root = tree.root_node();
    let mut edits = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() != "import_statement" || trailing_comment(node).is_some() {
            continue;
        }
        let Some(decl) = read_import(node, merged) else {
            continue;
        };
        if let Some(comment) = markers.get(&decl.source) {
            edits.push(Edit::insert(node.end_byte(), comment.clone()));
        }
    }
    apply_edits(merged, edits)
}

fn collect_marked(file_name: &str, source: &str) -> Result<Vec<MarkedImport>> {
    let mut parser = SourceParser::for_path(file_name)?;
    let tree = parser.parse(source)?;
    let root = tree.root_node();

    let mut found = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() != "import_statement" || node.has_error() {
            continue;
        }
        let Some(comment) = trailing_comment(node) else {
            continue;
        };
        let comment_text = text(comment, source).to_string();
        let Some(marker) = parse_marker(&comment_text) else {
            continue;
        };
        let Some(decl) = read_import(node, source) else {
            continue;
        };
        let statement_text = text(node, source);
        let quote = node
            .child_by_field_name("source")
            .and_then(|s| text(s, source).chars().next())
            .unwrap_or('"');

        found.push(MarkedImport {
            marker,
            decl,
            quote,
            semicolon: statement_text.trim_end().ends_with(';'),
            statement: node.byte_range(),
            comment: node.end_byte()..comment.end_byte(),
            gap: source[node.end_byte()..comment.start_byte()].to_string(),
            comment_text,
        });
    }
    Ok(found)
}

/// A comment starting on the line where `node` ends.
fn trailing_comment(node: Node<'_>) -> Option<Node<'_>> {
    let next = node.next_sibling()?;
    (next.kind() == "comment" && next.start_position().row == node.end_position().row)
        .then_some(next)
}

fn read_import(node: Node<'_>, source: &str) -> Option<ImportDecl> {
    let source_node = node.child_by_field_name("source")?;
    let mut decl = ImportDecl {
        source: unquote(text(source_node, source)),
        default: None,
        namespace: None,
        named: Vec::new(),
        type_only: false,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type" if !child.is_named() => decl.type_only = true,
            "import_clause" => read_clause(child, source, &mut decl),
            "import_require_clause" => return None,
            _ => {}
        }
    }
    Some(decl)
}

fn read_clause(clause: Node<'_>, source: &str, decl: &mut ImportDecl) {
    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => decl.default = Some(text(child, source).to_string()),
            "namespace_import" => {
                let mut inner = child.walk();
                decl.namespace = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "identifier")
                    .map(|n| text(n, source).to_string());
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let imported = text(name, source).to_string();
                    let local = spec
                        .child_by_field_name("alias")
                        .map(|a| text(a, source).to_string())
                        .unwrap_or_else(|| imported.clone());
                    let mut spec_cursor = spec.walk();
                    let type_only = spec
                        .children(&mut spec_cursor)
                        .any(|c| !c.is_named() && c.kind() == "type");
                    decl.named.push(ImportSpecifier {
                        imported,
                        local,
                        type_only,
                    });
                }
            }
            _ => {}
        }
    }
}

fn text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn unquote(literal: &str) -> String {
    literal
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}
