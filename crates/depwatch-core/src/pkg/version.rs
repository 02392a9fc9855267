//! npm version ranges and per-dependency version analysis.
//!
//! npm range syntax is translated into `semver::VersionReq` alternatives.
//! The translation follows npm where it differs from Cargo: a bare `1.2.3`
//! is exact, a bare `1.2` is `1.2.x`, and whitespace joins comparators.

use super::error::{ErrorInfo, PkgError};
use super::registry::Packument;
use semver::{Version, VersionReq};
use serde::Serialize;

/// A parsed npm range: satisfied when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Parse an npm range, including `||` alternatives.
///
/// Empty text and `*` match every release.
///
/// # Errors
/// Returns `PKG_RANGE_INVALID` if no alternative can be parsed.
pub fn parse_range(range: &str) -> Result<NpmRange, PkgError> {
    let mut alternatives = Vec::new();
    let mut last_err = None;

    for alt in range.split("||").map(str::trim) {
        match parse_alternative(alt) {
            Ok(req) => alternatives.push(req),
            Err(e) => last_err = Some(e),
        }
    }

    if alternatives.is_empty() {
        return Err(last_err.unwrap_or_else(|| PkgError::range_invalid(range, "empty range")));
    }
    Ok(NpmRange { alternatives })
}

fn parse_alternative(alt: &str) -> Result<VersionReq, PkgError> {
    if alt.is_empty() {
        return Ok(VersionReq::STAR);
    }

    // Hyphen range: "1.0.0 - 2.0.0"
    if let Some((start, end)) = alt.split_once(" - ") {
        let converted = format!(">={}, <={}", start.trim(), end.trim());
        return VersionReq::parse(&converted).map_err(|e| PkgError::range_invalid(alt, e));
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in alt.split_whitespace() {
        // ">= 1.2.3" splits the operator from its version.
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_op.push_str(token);
            continue;
        }
        let joined = format!("{pending_op}{token}");
        pending_op.clear();
        if let Some(comparator) = normalize_comparator(&joined)? {
            comparators.push(comparator);
        }
    }

    if !pending_op.is_empty() {
        return Err(PkgError::range_invalid(alt, "dangling operator"));
    }
    if comparators.is_empty() {
        return Ok(VersionReq::STAR);
    }

    VersionReq::parse(&comparators.join(", ")).map_err(|e| PkgError::range_invalid(alt, e))
}

fn split_operator(token: &str) -> (&str, &str) {
    let end = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    (&token[..end], &token[end..])
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

/// Rewrite one npm comparator into `semver` syntax.
///
/// Returns `None` for comparators that match everything.
fn normalize_comparator(token: &str) -> Result<Option<String>, PkgError> {
    let (op, version) = split_operator(token);
    let version = version.strip_prefix('v').unwrap_or(version);

    // Wildcard components truncate the version: "1.x.x" -> "1".
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let parts: Vec<&str> = version[..core_end].split('.').collect();
    let concrete: Vec<&str> = parts.iter().take_while(|p| !is_wildcard(p)).copied().collect();

    if concrete.is_empty() || concrete == [""] {
        return Ok(None);
    }

    let partial = concrete.len() < 3;
    let version = if partial {
        concrete.join(".")
    } else {
        version.to_string()
    };

    let comparator = match op {
        "" | "=" if partial => {
            let nums = concrete
                .iter()
                .map(|p| p.parse::<u64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| PkgError::range_invalid(token, e))?;
            let overflow = || PkgError::range_invalid(token, "version component too large");
            match nums.as_slice() {
                [major] => {
                    let next = major.checked_add(1).ok_or_else(overflow)?;
                    format!(">={major}.0.0, <{next}.0.0")
                }
                [major, minor] => {
                    let next = minor.checked_add(1).ok_or_else(overflow)?;
                    format!(">={major}.{minor}.0, <{major}.{next}.0")
                }
                _ => format!("={version}"),
            }
        }
        "" | "=" => format!("={version}"),
        _ => format!("{op}{version}"),
    };
    Ok(Some(comparator))
}

/// The concrete version a range is written against.
///
/// `^1.2.3`, `~1.2.3`, `>=1.2.3 <2`, `v1.2.3` and `1.2.3 - 2.0.0` all yield
/// `1.2.3`. Ranges without a complete version (`*`, `1.x`, tags, URLs,
/// `workspace:` protocols) yield `None`.
#[must_use]
pub fn base_version(range: &str) -> Option<Version> {
    let first = range.split("||").next()?.trim();
    let first = first.split(" - ").next()?.trim();

    let mut tokens = first.split_whitespace();
    let mut token = tokens.next()?.to_string();
    if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
        token.push_str(tokens.next()?);
    }

    let (_, version) = split_operator(&token);
    let version = version.strip_prefix('v').unwrap_or(version);
    Version::parse(version).ok()
}

/// Published versions that parse as semver, highest first.
fn sorted_versions(packument: &Packument) -> Vec<Version> {
    let mut parsed: Vec<Version> = packument
        .versions
        .keys()
        .filter_map(|v| Version::parse(v).ok())
        .collect();
    parsed.sort_by(|a, b| b.cmp(a));
    parsed
}

/// Resolve a range against a packument.
///
/// # Rules
/// - `None` resolves to `dist-tags.latest`
/// - a dist-tag name resolves to the tagged version
/// - an exact published version resolves to itself
/// - otherwise the highest version satisfying the range wins
///
/// # Errors
/// Returns an error if nothing satisfies the range or the range is invalid.
pub fn resolve_version(packument: &Packument, range: Option<&str>) -> Result<String, PkgError> {
    let name = packument.name.as_str();

    let Some(range) = range else {
        return packument.latest().map(String::from).ok_or_else(|| {
            PkgError::version_not_found(name, "latest (no dist-tags.latest found)")
        });
    };

    if let Some(tagged) = packument.dist_tags.get(range) {
        return Ok(tagged.clone());
    }

    if packument.has_version(range) {
        return Ok(range.to_string());
    }

    let req = parse_range(range)?;
    sorted_versions(packument)
        .into_iter()
        .find(|v| req.matches(v))
        .map(|v| v.to_string())
        .ok_or_else(|| PkgError::version_not_found(name, range))
}

/// Version status of one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionReport {
    pub name: String,
    /// Range as declared in package.json.
    pub range: String,
    /// Published version the range is written against.
    pub current: Option<String>,
    /// Highest version satisfying the range.
    pub wanted: Option<String>,
    /// Newest patch release on the same major.minor line as `current`.
    pub latest_patch: Option<String>,
    /// `dist-tags.latest`.
    pub latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl VersionReport {
    /// Report for a dependency whose packument could not be obtained.
    #[must_use]
    pub fn failed(name: &str, range: &str, error: &PkgError) -> Self {
        Self {
            name: name.to_string(),
            range: range.to_string(),
            current: None,
            wanted: None,
            latest_patch: None,
            latest: None,
            error: Some(error.into()),
        }
    }

    /// True when the registry's latest differs from the version in use.
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        match (&self.current, &self.latest) {
            (Some(current), Some(latest)) => current != latest,
            (None, Some(_)) => self.error.is_none(),
            _ => false,
        }
    }
}

/// Compare a declared range with what the registry publishes.
#[must_use]
pub fn analyze(packument: &Packument, name: &str, range: &str) -> VersionReport {
    let latest = packument.latest().map(String::from);
    let published = sorted_versions(packument);

    let wanted = resolve_version(packument, Some(range));
    let current = base_version(range)
        .filter(|v| published.contains(v))
        .or_else(|| {
            wanted
                .as_ref()
                .ok()
                .and_then(|w| Version::parse(w).ok())
        });

    let latest_patch = current.as_ref().and_then(|cur| {
        published
            .iter()
            .find(|v| {
                v.pre.is_empty()
                    && v.major == cur.major
                    && v.minor == cur.minor
                    && v.patch > cur.patch
            })
            .map(ToString::to_string)
    });

    let error = match (&current, &wanted) {
        (None, Err(e)) => Some(ErrorInfo::from(e)),
        _ => None,
    };

    VersionReport {
        name: name.to_string(),
        range: range.to_string(),
        current: current.map(|v| v.to_string()),
        wanted: wanted.ok(),
        latest_patch,
        latest,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::error::codes;
    use std::collections::BTreeMap;

    fn make_packument(versions: &[&str], latest: &str) -> Packument {
        Packument {
            name: "test-pkg".to_string(),
            dist_tags: BTreeMap::from([("latest".to_string(), latest.to_string())]),
            versions: versions
                .iter()
                .map(|v| {
                    (
                        (*v).to_string(),
                        serde_json::json!({ "name": "test-pkg", "version": v }),
                    )
                })
                .collect(),
            time: BTreeMap::new(),
        }
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_latest() {
        let p = make_packument(&["1.0.0", "2.0.0", "3.0.0"], "3.0.0");
        assert_eq!(resolve_version(&p, None).unwrap(), "3.0.0");
    }

    #[test]
    fn test_resolve_dist_tag() {
        let mut p = make_packument(&["1.0.0", "2.0.0-rc.1"], "1.0.0");
        p.dist_tags.insert("next".to_string(), "2.0.0-rc.1".to_string());
        assert_eq!(resolve_version(&p, Some("next")).unwrap(), "2.0.0-rc.1");
    }

    #[test]
    fn test_resolve_exact_is_exact() {
        let p = make_packument(&["1.0.0", "1.5.0"], "1.5.0");
        assert_eq!(resolve_version(&p, Some("1.0.0")).unwrap(), "1.0.0");
        // npm: "=1.0.0" is exact too, not a caret range.
        assert_eq!(resolve_version(&p, Some("=1.0.0")).unwrap(), "1.0.0");
    }

    #[test]
    fn test_resolve_caret_and_tilde() {
        let p = make_packument(&["1.0.0", "1.0.5", "1.1.0", "2.0.0"], "2.0.0");
        assert_eq!(resolve_version(&p, Some("^1.0.0")).unwrap(), "1.1.0");
        assert_eq!(resolve_version(&p, Some("~1.0.0")).unwrap(), "1.0.5");
    }

    #[test]
    fn test_resolve_partial_versions() {
        let p = make_packument(&["1.2.0", "1.2.9", "1.3.0", "2.0.0"], "2.0.0");
        assert_eq!(resolve_version(&p, Some("1")).unwrap(), "1.3.0");
        assert_eq!(resolve_version(&p, Some("1.2")).unwrap(), "1.2.9");
        assert_eq!(resolve_version(&p, Some("1.2.x")).unwrap(), "1.2.9");
        assert_eq!(resolve_version(&p, Some("1.x")).unwrap(), "1.3.0");
    }

    #[test]
    fn test_resolve_star_and_empty() {
        let p = make_packument(&["1.0.0", "2.0.0"], "2.0.0");
        assert_eq!(resolve_version(&p, Some("*")).unwrap(), "2.0.0");
        assert_eq!(resolve_version(&p, Some("")).unwrap(), "2.0.0");
    }

    #[test]
    fn test_resolve_or_range_picks_highest() {
        let p = make_packument(&["1.5.0", "2.5.0", "3.0.0"], "3.0.0");
        assert_eq!(
            resolve_version(&p, Some("^1.0.0 || ^2.0.0")).unwrap(),
            "2.5.0"
        );
        assert_eq!(resolve_version(&p, Some("^1.0.0||^2.0.0")).unwrap(), "2.5.0");
    }

    #[test]
    fn test_resolve_hyphen_range() {
        let p = make_packument(&["1.0.0", "1.5.0", "2.0.0", "3.0.0"], "3.0.0");
        assert_eq!(resolve_version(&p, Some("1.0.0 - 2.0.0")).unwrap(), "2.0.0");
    }

    #[test]
    fn test_resolve_space_separated_comparators() {
        let p = make_packument(&["2.0.0", "2.1.2", "2.5.0", "3.0.0"], "3.0.0");
        assert_eq!(resolve_version(&p, Some(">= 2.1.2 < 3.0.0")).unwrap(), "2.5.0");
        assert_eq!(resolve_version(&p, Some(">=2.1.2 <3.0.0")).unwrap(), "2.5.0");
    }

    #[test]
    fn test_resolve_skips_prereleases() {
        let p = make_packument(&["1.0.0", "2.0.0-alpha.1", "2.0.0"], "2.0.0");
        assert_eq!(resolve_version(&p, Some("^2.0.0")).unwrap(), "2.0.0");
    }

    #[test]
    fn test_resolve_not_found() {
        let p = make_packument(&["1.0.0", "2.0.0"], "2.0.0");
        let err = resolve_version(&p, Some("^3.0.0")).unwrap_err();
        assert_eq!(err.code(), codes::PKG_VERSION_NOT_FOUND);
    }

    #[test]
    fn test_invalid_range() {
        let err = parse_range("not-a-range!!!").unwrap_err();
        assert_eq!(err.code(), codes::PKG_RANGE_INVALID);
        assert!(parse_range(">=").is_err());
    }

    #[test]
    fn test_partial_range_rejects_non_numeric() {
        for bad in ["1.foo", "=1.foo", "foo"] {
            let err = parse_range(bad).unwrap_err();
            assert_eq!(err.code(), codes::PKG_RANGE_INVALID, "{bad}");
        }
    }

    #[test]
    fn test_partial_range_at_u64_max() {
        let err = parse_range("18446744073709551615").unwrap_err();
        assert_eq!(err.code(), codes::PKG_RANGE_INVALID);
        assert!(err.message().contains("too large"));

        assert!(parse_range("1.18446744073709551615").is_err());
        // The largest major that still has a successor is fine.
        let range = parse_range("18446744073709551614").unwrap();
        assert!(range.matches(&Version::new(18_446_744_073_709_551_614, 3, 0)));
    }

    #[test]
    fn test_base_version() {
        assert_eq!(base_version("^1.2.3"), Some(v("1.2.3")));
        assert_eq!(base_version("~1.2.3"), Some(v("1.2.3")));
        assert_eq!(base_version("1.2.3"), Some(v("1.2.3")));
        assert_eq!(base_version("v1.2.3"), Some(v("1.2.3")));
        assert_eq!(base_version(">= 1.2.3 < 2"), Some(v("1.2.3")));
        assert_eq!(base_version("1.2.3 - 2.0.0"), Some(v("1.2.3")));
        assert_eq!(base_version("^1.2.3 || ^2.0.0"), Some(v("1.2.3")));
        assert_eq!(base_version("^2.0.0-beta.1"), Some(v("2.0.0-beta.1")));
    }

    #[test]
    fn test_base_version_none() {
        for range in ["*", "", "1.x", "^1", "latest", "workspace:^1.0.0", "github:a/b"] {
            assert_eq!(base_version(range), None, "{range}");
        }
    }

    #[test]
    fn test_analyze_latest_patch_same_line() {
        let p = make_packument(
            &["4.17.0", "4.17.5", "4.17.21", "4.18.0", "5.0.0"],
            "5.0.0",
        );
        let report = analyze(&p, "lodash", "^4.17.0");
        assert_eq!(report.current.as_deref(), Some("4.17.0"));
        assert_eq!(report.wanted.as_deref(), Some("4.18.0"));
        assert_eq!(report.latest_patch.as_deref(), Some("4.17.21"));
        assert_eq!(report.latest.as_deref(), Some("5.0.0"));
        assert!(report.error.is_none());
        assert!(report.is_outdated());
    }

    #[test]
    fn test_analyze_no_newer_patch() {
        let p = make_packument(&["1.0.3", "1.1.0", "1.1.0-beta.0"], "1.1.0");
        let report = analyze(&p, "x", "~1.1.0");
        assert_eq!(report.current.as_deref(), Some("1.1.0"));
        assert_eq!(report.latest_patch, None);
        assert!(!report.is_outdated());
    }

    #[test]
    fn test_analyze_unpublished_base_falls_back_to_wanted() {
        let p = make_packument(&["2.1.0", "2.1.4"], "2.1.4");
        let report = analyze(&p, "x", "^2.0.0");
        assert_eq!(report.current.as_deref(), Some("2.1.4"));
        assert_eq!(report.latest_patch, None);
    }

    #[test]
    fn test_analyze_unsatisfiable() {
        let p = make_packument(&["1.0.0"], "1.0.0");
        let report = analyze(&p, "x", "^9.0.0");
        assert_eq!(report.current, None);
        assert_eq!(report.latest.as_deref(), Some("1.0.0"));
        assert_eq!(
            report.error.as_ref().map(|e| e.code.as_str()),
            Some(codes::PKG_VERSION_NOT_FOUND)
        );
        assert!(!report.is_outdated());
    }

    #[test]
    fn test_failed_report() {
        let report = VersionReport::failed("ghost", "^1", &PkgError::not_found("ghost"));
        assert_eq!(report.error.unwrap().code, codes::PKG_NOT_FOUND);
        assert!(report.latest.is_none());
    }
}
