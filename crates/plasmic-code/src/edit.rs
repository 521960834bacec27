//! Byte-range edits over source text.

use std::ops::Range;

use crate::error::{Error, Result};

/// The kind of edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Replace,
    Delete,
}

/// An edit to a source string, addressed by byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub range: Range<usize>,
    /// New content (for Insert and Replace).
    pub new_content: Option<String>,
}

impl Edit {
    pub fn insert(at: usize, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Insert,
            range: at..at,
            new_content: Some(content.into()),
        }
    }

    pub fn replace(range: Range<usize>, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Replace,
            range,
            new_content: Some(content.into()),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            kind: EditKind::Delete,
            range,
            new_content: None,
        }
    }
}

/// Apply non-overlapping edits to `source`.
///
/// Edits may be given in any order. Two inserts at the same offset are
/// applied in the order given.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> Result<String> {
    // Stable sort keeps same-offset inserts in caller order
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.end > source.len() || edit.range.start > edit.range.end {
            return Err(Error::EditOutOfBounds {
                range: edit.range,
                len: source.len(),
            });
        }
        if edit.range.start < cursor {
            return Err(Error::OverlappingEdits(edit.range));
        }
        out.push_str(&source[cursor..edit.range.start]);
        if let Some(content) = &edit.new_content {
            out.push_str(content);
        }
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}
