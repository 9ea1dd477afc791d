//! Toolchain version comparison.
//!
//! Toolchain versions come from `rustc --version` and may carry a channel
//! suffix (`1.77.0-nightly`). Requirements are compared against the numeric
//! core only, so a nightly of 1.77 satisfies `>=1.23.0` just like the stable
//! release does.

use semver::{Version, VersionReq};

/// Marker used when the toolchain version could not be determined.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Whether `version` satisfies the requirement expression `requirement`.
///
/// Unparseable versions (including [`UNKNOWN_VERSION`]) and unparseable
/// requirements never satisfy anything.
///
/// ```rust
/// use savecheck_utils::version::satisfies;
///
/// assert!(satisfies("1.23.0", ">=1.23.0"));
/// assert!(satisfies("1.80.1-nightly", ">=1.23.0"));
/// assert!(!satisfies("1.22.1", ">=1.23.0"));
/// assert!(!satisfies("unknown", ">=1.23.0"));
/// ```
#[must_use]
pub fn satisfies(version: &str, requirement: &str) -> bool {
    let Some(version) = parse_lenient(version) else {
        tracing::debug!(version, "unparseable toolchain version");
        return false;
    };
    match VersionReq::parse(requirement) {
        Ok(req) => req.matches(&version),
        Err(e) => {
            tracing::warn!(requirement, error = %e, "invalid version requirement");
            false
        }
    }
}

/// Parse `major[.minor[.patch]]` with any pre-release or build suffix dropped.
#[must_use]
pub fn parse_lenient(version: &str) -> Option<Version> {
    let core = version
        .trim()
        .split(['-', '+'])
        .next()
        .filter(|s| !s.is_empty())?;

    let mut parts = core.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    if parts.next().is_some() {
        return None;
    }
    Some(Version::new(major, minor, patch))
}

/// Extract the version from `rustc --version` output.
///
/// ```rust
/// use savecheck_utils::version::parse_rustc_version;
///
/// assert_eq!(
///     parse_rustc_version("rustc 1.75.0 (82e1608df 2023-12-21)"),
///     Some("1.75.0".to_string())
/// );
/// ```
#[must_use]
pub fn parse_rustc_version(output: &str) -> Option<String> {
    let line = output.lines().find(|l| l.trim_start().starts_with("rustc "))?;
    line.split_whitespace()
        .nth(1)
        .filter(|v| parse_lenient(v).is_some())
        .map(str::to_string)
}
