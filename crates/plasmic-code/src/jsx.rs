//! TSX to JSX conversion
//!
//! Projects configured with `lang: js` receive TSX from the server. The
//! conversion erases TypeScript-only syntax in place and leaves everything
//! else byte-for-byte, so generated comments and formatting survive.

use tree_sitter::Node;

use crate::edit::{Edit, apply_edits};
use crate::error::{Error, Result};
use crate::parser::SourceParser;

/// Declarations that exist only at the type level.
const TYPE_DECLARATIONS: &[&str] = &[
    "interface_declaration",
    "type_alias_declaration",
    "ambient_declaration",
    "function_signature",
    "abstract_method_signature",
    "index_signature",
];

/// Type syntax attached to a value-level node.
const TYPE_ANNOTATIONS: &[&str] = &[
    "type_annotation",
    "asserts_annotation",
    "type_predicate_annotation",
    "type_arguments",
    "type_parameters",
    "accessibility_modifier",
    "override_modifier",
];

/// Erase TypeScript syntax from a TSX module.
pub fn tsx_to_jsx(source: &str) -> Result<String> {
    let mut parser = SourceParser::tsx()?;
    let tree = parser.parse(source)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::parse("tsx", "module contains syntax errors"));
    }

    let mut edits = Vec::new();
    erase(root, source, &mut edits);
    apply_edits(source, edits)
}

/// Convert a `.tsx` module to `.jsx`, returning the new file name and
/// content. Other files pass through unchanged.
pub fn maybe_convert_tsx_to_jsx(file_name: &str, content: &str) -> Result<(String, String)> {
    match file_name.strip_suffix(".tsx") {
        Some(stem) => Ok((format!("{stem}.jsx"), tsx_to_jsx(content)?)),
        None => Ok((file_name.to_string(), content.to_string())),
    }
}

fn erase(node: Node<'_>, source: &str, edits: &mut Vec<Edit>) {
    let kind = node.kind();

    if TYPE_DECLARATIONS.contains(&kind) || is_type_only_statement(node) {
        edits.push(Edit::delete(whole_lines(source, node.byte_range())));
        return;
    }
    if kind == "implements_clause" {
        edits.push(Edit::delete(with_leading_space(source, node.byte_range())));
        return;
    }
    if TYPE_ANNOTATIONS.contains(&kind) {
        edits.push(Edit::delete(with_trailing_space(source, node.byte_range())));
        return;
    }

    match kind {
        "as_expression" | "satisfies_expression" => {
            // Keep the expression, drop ` as T`
            if let Some(expr) = node.named_child(0) {
                edits.push(Edit::delete(expr.end_byte()..node.end_byte()));
                erase(expr, source, edits);
            }
            return;
        }
        "non_null_expression" => {
            if let Some(expr) = node.named_child(0) {
                edits.push(Edit::delete(expr.end_byte()..node.end_byte()));
                erase(expr, source, edits);
            }
            return;
        }
        "import_specifier" | "export_specifier" if has_type_keyword(node) => {
            edits.push(Edit::delete(with_list_separator(node)));
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if kind == "optional_parameter" && !child.is_named() && child.kind() == "?" {
            edits.push(Edit::delete(child.byte_range()));
            continue;
        }
        erase(child, source, edits);
    }
}

/// `import type ...`, `export type { ... }` and exported type declarations.
fn is_type_only_statement(node: Node<'_>) -> bool {
    match node.kind() {
        "import_statement" => has_type_keyword(node),
        "export_statement" => {
            if has_type_keyword(node) {
                return true;
            }
            node.child_by_field_name("declaration")
                .is_some_and(|decl| TYPE_DECLARATIONS.contains(&decl.kind()))
        }
        _ => false,
    }
}

/// Whether `node` has a direct `type` keyword child.
fn has_type_keyword(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == "type")
}

/// Extend a specifier's range over the comma that separates it from its
/// neighbour.
fn with_list_separator(node: Node<'_>) -> std::ops::Range<usize> {
    if let Some(next) = node.next_sibling()
        && next.kind() == ","
    {
        let end = next
            .next_sibling()
            .map(|n| n.start_byte())
            .unwrap_or(next.end_byte());
        return node.start_byte()..end;
    }
    if let Some(prev) = node.prev_sibling()
        && prev.kind() == ","
    {
        return prev.start_byte()..node.end_byte();
    }
    node.byte_range()
}

/// Grow a statement's range to cover its whole line(s) when nothing else
/// shares them.
fn whole_lines(source: &str, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let line_start = source[..range.start].rfind('\n').map_or(0, |i| i + 1);
    if !source[line_start..range.start].trim().is_empty() {
        return range;
    }
    let rest = &source[range.end..];
    match rest.find('\n') {
        Some(i) if rest[..i].trim().is_empty() => line_start..range.end + i + 1,
        None if rest.trim().is_empty() => line_start..source.len(),
        _ => range,
    }
}

/// Modifiers such as `private` are followed by a space that must go too.
fn with_trailing_space(source: &str, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let is_modifier = source[range.clone()]
        .chars()
        .all(|c| c.is_ascii_alphabetic());
    if is_modifier && source[range.end..].starts_with(' ') {
        range.start..range.end + 1
    } else {
        range
    }
}

fn with_leading_space(source: &str, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let trimmed = source[..range.start].trim_end_matches(' ').len();
    trimmed..range.end
}
