//! Version resolution using semver.
//!
//! Without a lockfile the only way two runs agree is to always pick the
//! same version, so ranges resolve to the *minimum* published version
//! that satisfies them rather than the newest.

use super::error::PkgError;
use super::registry::Packument;
use semver::{Version, VersionReq};

/// Resolve a version specifier against a packument.
///
/// # Rules
/// - `latest` resolves to `dist-tags.latest`
/// - a bare `MAJOR.MINOR` pair gains a zero patch first (`1.7` becomes `1.7.0`)
/// - an exact version is returned as-is if published
/// - anything else is parsed as a semver range and resolves to the
///   **minimum** published version satisfying it
/// - OR ranges (`^1.0.0 || ^2.0.0`) take the minimum across alternatives
///
/// # Errors
/// `PKG_SPEC_INVALID` for an unparseable specifier, `PKG_VERSION_NOT_FOUND`
/// when nothing published satisfies it.
pub fn resolve_version(packument: &Packument, specifier: &str) -> Result<String, PkgError> {
    let name = packument.name();

    if specifier.trim() == "latest" {
        return packument.latest().map(String::from).ok_or_else(|| {
            PkgError::version_not_found(name, "latest (no dist-tags.latest found)")
        });
    }

    let specifier = normalize_partial_version(specifier);
    let specifier = specifier.as_ref();

    // Exact version published under that name? Done. Otherwise fall
    // through and treat it as a range.
    if Version::parse(specifier).is_ok() && packument.has_version(specifier) {
        return Ok(specifier.to_string());
    }

    let reqs = parse_specifier(specifier)?;

    let mut published: Vec<Version> = packument
        .versions()
        .iter()
        .filter_map(|v| Version::parse(v).ok())
        .collect();
    published.sort();

    // Ascending scan: the first hit is the minimum satisfying version.
    for version in &published {
        if reqs.iter().any(|req| req.matches(version)) {
            return Ok(version.to_string());
        }
    }

    Err(PkgError::version_not_found(name, specifier))
}

/// Check whether an exact installed version satisfies a specifier.
///
/// An exact specifier means equality (npm semantics; rust semver would
/// give a bare version caret semantics). Unparseable input never
/// satisfies.
#[must_use]
pub fn version_satisfies(version: &str, specifier: &str) -> bool {
    let Ok(version) = Version::parse(version) else {
        return false;
    };

    let specifier = normalize_partial_version(specifier.trim());
    let specifier = specifier.as_ref();

    if let Ok(exact) = Version::parse(specifier) {
        return version == exact;
    }

    parse_specifier(specifier)
        .map(|reqs| reqs.iter().any(|req| req.matches(&version)))
        .unwrap_or(false)
}

/// Extend a bare `MAJOR.MINOR` pair with a zero patch: `1.7` becomes `1.7.0`.
///
/// Anything else passes through untouched.
#[must_use]
pub fn normalize_partial_version(specifier: &str) -> std::borrow::Cow<'_, str> {
    let is_partial = match specifier.split_once('.') {
        Some((major, minor)) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    };

    if is_partial {
        format!("{specifier}.0").into()
    } else {
        specifier.into()
    }
}

/// Parse a specifier into its requirement alternatives.
///
/// A plain range yields one requirement; an OR range (`a || b`) yields
/// one per valid alternative.
fn parse_specifier(specifier: &str) -> Result<Vec<VersionReq>, PkgError> {
    if !specifier.contains("||") {
        return Ok(vec![parse_range(specifier)?]);
    }

    let mut reqs = Vec::new();
    for alt in specifier.split("||").map(str::trim) {
        if alt.is_empty() {
            continue;
        }
        // Invalid alternatives are skipped as long as one parses.
        if let Ok(req) = parse_range(alt) {
            reqs.push(req);
        }
    }

    if reqs.is_empty() {
        return Err(PkgError::spec_invalid(format!(
            "Invalid version specifier '{specifier}': no valid alternatives"
        )));
    }
    Ok(reqs)
}

/// Parse a single version range, handling npm-specific syntax.
///
/// Handles standard semver ranges (`^1.0.0`, `~1.0.0`, `>=1.0.0`),
/// hyphen ranges (`1.0.0 - 2.0.0`), x-ranges (`1.x`, `1.0.x`, `*`), and
/// space-separated AND comparators (`>= 2.1.2 < 3.0.0`).
fn parse_range(range: &str) -> Result<VersionReq, PkgError> {
    let range = range.trim();

    let converted = if let Some((start, end)) = split_hyphen_range(range) {
        format!(">={start}, <={end}")
    } else if range.contains(['x', 'X']) || range == "*" {
        convert_x_range(range)
    } else {
        join_comparators(range)
    };

    VersionReq::parse(&converted)
        .map_err(|e| PkgError::spec_invalid(format!("Invalid version specifier '{range}': {e}")))
}

/// Split a hyphen range like `1.0.0 - 2.0.0` into its endpoints.
fn split_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

/// Convert an x-range to an explicit bound pair.
fn convert_x_range(range: &str) -> String {
    let range = range.trim();

    if matches!(range, "*" | "x" | "X") {
        return ">=0.0.0".to_string();
    }

    let parts: Vec<&str> = range.split('.').collect();
    match parts.as_slice() {
        [major, "x" | "X" | "*"] => {
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, "x" | "X" | "*"] => {
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    // Fallback: substitute zeros and let the semver parser judge.
    range.replace(['x', 'X'], "0")
}

/// Join space-separated comparators with commas.
///
/// npm reads `>= 2.1.2 < 3.0.0` as an AND of two comparators; rust
/// semver wants `>=2.1.2, <3.0.0`. An operator token with no digits is
/// glued to the version token that follows it.
fn join_comparators(range: &str) -> String {
    let mut out = String::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        if token.bytes().any(|b| b.is_ascii_digit()) {
            if !out.is_empty() && pending_op.is_empty() {
                out.push_str(", ");
            }
            out.push_str(&pending_op);
            out.push_str(token);
            pending_op.clear();
        } else {
            if !out.is_empty() {
                out.push_str(", ");
            }
            pending_op.push_str(token);
        }
    }
    out.push_str(&pending_op);

    if out.is_empty() {
        range.to_string()
    } else {
        out
    }
}
