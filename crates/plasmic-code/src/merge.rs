//! Line-based three-way merge
//!
//! Given a common base, a locally edited version and a newly generated
//! version, produce a file carrying both sides' changes. Hunks that change
//! the same base lines differently are conflicts; the edited side wins and
//! the conflict is counted so callers can warn about it.

use std::ops::Range;

use similar::{Algorithm, DiffTag, capture_diff_slices};
use tracing::debug;

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: String,
    /// Number of regions where both sides changed the base differently.
    pub conflicts: usize,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts == 0
    }
}

/// A replaced region of the base, expressed against one side.
#[derive(Debug, Clone)]
struct Hunk {
    base: Range<usize>,
    side: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Edited,
    New,
}

/// Merge `edited` and `new`, both derived from `base`.
pub fn three_way_merge(base: &str, edited: &str, new: &str) -> MergeOutcome {
    let base_lines: Vec<&str> = base.split_inclusive('\n').collect();
    let edited_lines: Vec<&str> = edited.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

    let mut hunks: Vec<(Side, Hunk)> = changed_hunks(&base_lines, &edited_lines)
        .into_iter()
        .map(|h| (Side::Edited, h))
        .chain(
            changed_hunks(&base_lines, &new_lines)
                .into_iter()
                .map(|h| (Side::New, h)),
        )
        .collect();
    hunks.sort_by_key(|(side, h)| (h.base.start, h.base.end, *side == Side::New));

    let mut merged = String::with_capacity(edited.len().max(new.len()));
    let mut conflicts = 0;
    let mut base_pos = 0;
    let mut i = 0;

    while i < hunks.len() {
        // Group every hunk touching the same base region
        let group_start = hunks[i].1.base.start;
        let mut group_end = hunks[i].1.base.end;
        let mut j = i + 1;
        while j < hunks.len() {
            let bs = hunks[j].1.base.start;
            if bs < group_end || bs == group_start {
                group_end = group_end.max(hunks[j].1.base.end);
                j += 1;
            } else {
                break;
            }
        }
        let group = &hunks[i..j];

        push_lines(&mut merged, &base_lines[base_pos..group_start]);

        let has_edited = group.iter().any(|(s, _)| *s == Side::Edited);
        let has_new = group.iter().any(|(s, _)| *s == Side::New);
        let region = group_start..group_end;

        if has_edited && !has_new {
            merged.push_str(&side_text(&base_lines, &edited_lines, group, Side::Edited, &region));
        } else if has_new && !has_edited {
            merged.push_str(&side_text(&base_lines, &new_lines, group, Side::New, &region));
        } else {
            let ours = side_text(&base_lines, &edited_lines, group, Side::Edited, &region);
            let theirs = side_text(&base_lines, &new_lines, group, Side::New, &region);
            let original: String = base_lines[region.clone()].concat();
            if ours == theirs || theirs == original {
                merged.push_str(&ours);
            } else if ours == original {
                merged.push_str(&theirs);
            } else {
                debug!(base_lines = ?region, "both sides changed the same lines; keeping the edited side");
                conflicts += 1;
                merged.push_str(&ours);
            }
        }

        base_pos = group_end;
        i = j;
    }
    push_lines(&mut merged, &base_lines[base_pos..]);

    MergeOutcome { merged, conflicts }
}

fn changed_hunks(base: &[&str], side: &[&str]) -> Vec<Hunk> {
    capture_diff_slices(Algorithm::Myers, base, side)
        .iter()
        .filter_map(|op| {
            let (tag, base_range, side_range) = op.as_tag_tuple();
            (tag != DiffTag::Equal).then_some(Hunk {
                base: base_range,
                side: side_range,
            })
        })
        .collect()
}

/// Text of one side over the base `region`: the side's replacements for
/// its hunks and base lines everywhere else.
fn side_text(
    base: &[&str],
    lines: &[&str],
    group: &[(Side, Hunk)],
    side: Side,
    region: &Range<usize>,
) -> String {
    let mut out = String::new();
    let mut pos = region.start;
    for (_, hunk) in group.iter().filter(|(s, _)| *s == side) {
        push_lines(&mut out, &base[pos..hunk.base.start]);
        push_lines(&mut out, &lines[hunk.side.clone()]);
        pos = hunk.base.end;
    }
    push_lines(&mut out, &base[pos..region.end]);
    out
}

fn push_lines(out: &mut String, lines: &[&str]) {
    for line in lines {
        out.push_str(line);
    }
}
