//! Version ranges as written in plasmic.json and on the command line.
//!
//! Ranges follow npm syntax, which differs from the `semver` crate in a
//! few places: a bare version means an exact match rather than a caret
//! range, comparators are separated by spaces instead of commas, `||`
//! separates alternatives and `a - b` is an inclusive range. The sentinel
//! `latest` (like `*` and the empty string) matches every version.
//!
//! ```
//! use plasmic_core::version::VersionRange;
//!
//! let range = VersionRange::parse(">=1.2.0 <2.0.0 || 3.0.0").unwrap();
//! assert!(range.satisfies("1.9.3"));
//! assert!(range.satisfies("3.0.0"));
//! assert!(!range.satisfies("2.1.0"));
//! ```

use std::cmp::Ordering;

use semver::{Version, VersionReq};

use crate::error::{Error, Result};

/// Sentinel range that always resolves to the newest published version.
pub const LATEST: &str = "latest";

/// A parsed npm-style version range.
#[derive(Debug, Clone)]
pub struct VersionRange {
    /// Any alternative matching is enough; empty means "matches anything".
    alternatives: Vec<VersionReq>,
    raw: String,
}

impl VersionRange {
    /// Parse a range string.
    pub fn parse(range: &str) -> Result<Self> {
        let raw = range.to_string();
        if is_latest(range) {
            return Ok(Self {
                alternatives: Vec::new(),
                raw,
            });
        }

        let mut alternatives = Vec::new();
        for part in range.split("||") {
            let translated = translate(part.trim()).map_err(|reason| Error::InvalidVersion {
                version: raw.clone(),
                reason,
            })?;
            let req = VersionReq::parse(&translated).map_err(|e| Error::InvalidVersion {
                version: raw.clone(),
                reason: e.to_string(),
            })?;
            alternatives.push(req);
        }

        Ok(Self { alternatives, raw })
    }

    /// Whether this is the `latest` sentinel (or an equivalent wildcard).
    pub fn is_latest(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Check a version string; unparseable versions never match.
    pub fn satisfies(&self, version: &str) -> bool {
        match parse_version(version) {
            Ok(v) => self.satisfies_version(&v),
            Err(_) => false,
        }
    }

    pub fn satisfies_version(&self, version: &Version) -> bool {
        self.is_latest() || self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Highest of `versions` inside the range.
    pub fn max_satisfying<'a>(&self, versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
        versions
            .into_iter()
            .filter_map(|raw| parse_version(raw).ok().map(|v| (v, raw)))
            .filter(|(v, _)| self.satisfies_version(v))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, raw)| raw)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Whether `range` is the `latest` sentinel or a match-everything wildcard.
pub fn is_latest(range: &str) -> bool {
    matches!(range.trim(), "" | "*" | "x" | "X" | LATEST)
}

/// Parse an exact version, accepting a leading `v` and missing components
/// (`1.2` is `1.2.0`).
pub fn parse_version(version: &str) -> Result<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Ok(v) = Version::parse(trimmed) {
        return Ok(v);
    }
    let padded = match trimmed.matches('.').count() {
        0 => format!("{trimmed}.0.0"),
        1 => format!("{trimmed}.0"),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|e| Error::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Compare two exact versions. The `latest` head sorts after every
/// published version.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    match (is_latest(a), is_latest(b)) {
        (true, true) => Ok(Ordering::Equal),
        (true, false) => Ok(Ordering::Greater),
        (false, true) => Ok(Ordering::Less),
        (false, false) => Ok(parse_version(a)?.cmp(&parse_version(b)?)),
    }
}

/// Translate one npm alternative into `semver` crate syntax.
fn translate(alternative: &str) -> std::result::Result<String, String> {
    if alternative.is_empty() || is_latest(alternative) {
        return Ok("*".to_string());
    }

    // Hyphen range `1.0.0 - 2.0.0`
    if let Some((low, high)) = alternative.split_once(" - ") {
        return Ok(format!(">={}, <={}", low.trim(), high.trim()));
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in alternative.split_whitespace() {
        if token.chars().all(|c| "<>=~^".contains(c)) {
            if pending_op.is_some() {
                return Err(format!("dangling operator before '{token}'"));
            }
            pending_op = Some(token);
            continue;
        }
        let token = token.trim_start_matches('v');
        let comparator = match pending_op.take() {
            Some(op) => format!("{op}{token}"),
            None => bare_comparator(token),
        };
        comparators.push(comparator);
    }
    if let Some(op) = pending_op {
        return Err(format!("operator '{op}' has no version"));
    }

    Ok(comparators.join(", "))
}

/// A comparator without an operator is an exact match in npm.
fn bare_comparator(token: &str) -> String {
    let starts_with_op = token.starts_with(['<', '>', '=', '~', '^']);
    let is_wildcard = token.contains(['x', 'X', '*']);
    if starts_with_op || is_wildcard {
        token.to_string()
    } else {
        format!("={token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("latest", "0.0.1", true)]
    #[case("", "9.9.9", true)]
    #[case("*", "1.0.0", true)]
    #[case("1.2.3", "1.2.3", true)]
    #[case("1.2.3", "1.2.4", false)]
    #[case("^1.2.0", "1.9.0", true)]
    #[case("^1.2.0", "2.0.0", false)]
    #[case("~1.2.0", "1.2.9", true)]
    #[case("~1.2.0", "1.3.0", false)]
    #[case(">=1.0.0 <2.0.0", "1.5.0", true)]
    #[case(">= 1.0.0 < 2.0.0", "2.0.0", false)]
    #[case("1.0.0 - 1.4.0", "1.4.0", true)]
    #[case("1.0.0 - 1.4.0", "1.4.1", false)]
    #[case("1.x", "1.7.2", true)]
    #[case("1.2", "1.2.7", true)]
    #[case("1.0.0 || 2.0.0", "2.0.0", true)]
    #[case(">0.0.0", "0.0.1", true)]
    fn test_satisfies(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
        let parsed = VersionRange::parse(range).unwrap();
        assert_eq!(parsed.satisfies(version), expected, "{range} vs {version}");
    }

    #[test]
    fn test_invalid_range() {
        assert!(matches!(
            VersionRange::parse(">= "),
            Err(Error::InvalidVersion { .. })
        ));
        assert!(VersionRange::parse("not-a-version").is_err());
    }

    #[test]
    fn test_max_satisfying() {
        let range = VersionRange::parse("^1.0.0").unwrap();
        let versions = ["0.9.0", "1.0.0", "1.4.2", "1.10.0", "2.0.0"];
        assert_eq!(range.max_satisfying(versions), Some("1.10.0"));

        let none = VersionRange::parse(">=3.0.0").unwrap();
        assert_eq!(none.max_satisfying(versions), None);
    }

    #[test]
    fn test_unparseable_version_never_matches() {
        let range = VersionRange::parse("latest").unwrap();
        assert!(!range.satisfies("banana"));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare("1.2.3", "2.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare("v2.0", "2.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.10.0", "1.9.0").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_compare_latest_head() {
        assert_eq!(compare("latest", "99.0.0").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.0.0", "latest").unwrap(), Ordering::Less);
        assert_eq!(compare("latest", "latest").unwrap(), Ordering::Equal);
    }
}
