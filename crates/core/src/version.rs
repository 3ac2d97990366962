//! Version negotiation for builder-tool capability gates
//!
//! Command-line flags of the builder tool appeared in specific releases, so the
//! orchestrator asks "does the installed version satisfy this range" before
//! emitting them. A version that cannot be confirmed (unparsable output, or a
//! development build reporting `0.0.0+unknown`) satisfies no range at all.
//!
//! ```rust
//! use rigger_core::version::{ToolVersion, DRIVER_OPTS};
//!
//! let version = ToolVersion::parse("github.com/docker/buildx v0.9.1 ed00243a0ce2a0aee75311b06e32d33b44729689");
//! assert!(version.satisfies(DRIVER_OPTS));
//!
//! let dev = ToolVersion::parse("github.com/docker/buildx v0.0.0+unknown");
//! assert!(!dev.satisfies(">=0.0.0"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;

/// Minimum release accepting `--driver-opt` and `--buildkitd-flags` on `create`
pub const DRIVER_OPTS: &str = ">=0.3.0";

/// Minimum release accepting `--builder` on `inspect --bootstrap`
pub const BOOTSTRAP_BUILDER: &str = ">=0.4.0";

static VERSION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bv?(\d+\.\d+(?:\.\d+)?(?:[-+][0-9A-Za-z.+-]*)?)").expect("valid regex"));

/// A builder-tool version as reported by the installed binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolVersion {
    /// A released semantic version
    Release(Version),
    /// Built from source or otherwise unrecognisable; carries the raw text
    Unknown(String),
}

impl ToolVersion {
    /// Parse either a bare version (`0.9.1`, `v0.9.1`) or the full output of
    /// the tool's `version` sub-command.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let token = VERSION_TOKEN
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        match token.and_then(parse_version) {
            Some(version) if !is_pseudo_version(&version) => Self::Release(version),
            _ => Self::Unknown(trimmed.to_string()),
        }
    }

    /// Whether this version satisfies a range expression such as `>=0.3.0`.
    ///
    /// Unknown versions and unparsable ranges satisfy nothing. Pre-release
    /// builds are judged by their release triple, so `0.10.0-rc1` satisfies
    /// `>=0.3.0`.
    pub fn satisfies(&self, range: &str) -> bool {
        let Self::Release(version) = self else {
            return false;
        };
        let Ok(req) = VersionReq::parse(range) else {
            tracing::debug!("Ignoring unparsable version range '{}'", range);
            return false;
        };
        req.matches(&Version::new(version.major, version.minor, version.patch))
    }

    /// The parsed semantic version, if known
    pub fn as_version(&self) -> Option<&Version> {
        match self {
            Self::Release(v) => Some(v),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release(v) => write!(f, "{}", v),
            Self::Unknown(raw) if raw.is_empty() => write!(f, "unknown"),
            Self::Unknown(raw) => write!(f, "unknown ({})", raw),
        }
    }
}

/// Free-function form of [`ToolVersion::satisfies`]
pub fn satisfies(version: &ToolVersion, range: &str) -> bool {
    version.satisfies(range)
}

/// Parse a semantic version from a tag string
///
/// Handles tags like "v1.2.3", "1.2.3", "1.2", "1"
pub fn parse_version(tag: &str) -> Option<Version> {
    let version_str = tag.strip_prefix('v').unwrap_or(tag);

    if let Ok(version) = Version::parse(version_str) {
        return Some(version);
    }

    if let Ok(version) = Version::parse(&format!("{}.0", version_str)) {
        return Some(version);
    }

    if let Ok(version) = Version::parse(&format!("{}.0.0", version_str)) {
        return Some(version);
    }

    None
}

/// `0.0.0` and `+unknown` build metadata mark untagged source builds
fn is_pseudo_version(version: &Version) -> bool {
    (version.major == 0 && version.minor == 0 && version.patch == 0)
        || version.build.as_str() == "unknown"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_standard() {
        assert_eq!(parse_version("1.2.3").unwrap().to_string(), "1.2.3");
        assert_eq!(parse_version("v1.2.3").unwrap().to_string(), "1.2.3");
        assert_eq!(parse_version("1.2").unwrap().to_string(), "1.2.0");
        assert!(parse_version("invalid").is_none());
        assert!(parse_version("").is_none());
    }

    #[test]
    fn test_parse_tool_output() {
        let version =
            ToolVersion::parse("github.com/docker/buildx v0.9.1 ed00243a0ce2a0aee75311b06e32d33b44729689\n");
        assert_eq!(version, ToolVersion::Release(Version::new(0, 9, 1)));

        let version = ToolVersion::parse("github.com/docker/buildx 0.4.2 fb7b670b764764dc4716df3eba07ffdae4cc47b2");
        assert_eq!(version.as_version().unwrap().to_string(), "0.4.2");
    }

    #[test]
    fn test_pseudo_versions_are_unknown() {
        assert!(matches!(
            ToolVersion::parse("github.com/docker/buildx v0.0.0+unknown"),
            ToolVersion::Unknown(_)
        ));
        assert!(matches!(
            ToolVersion::parse("github.com/docker/buildx 1.2.3+unknown"),
            ToolVersion::Unknown(_)
        ));
        assert!(matches!(ToolVersion::parse("garbage"), ToolVersion::Unknown(_)));
        assert!(matches!(ToolVersion::parse(""), ToolVersion::Unknown(_)));
    }

    #[test]
    fn test_satisfies_thresholds() {
        let below = ToolVersion::parse("0.2.9");
        let at = ToolVersion::parse("0.3.0");
        let above = ToolVersion::parse("v0.10.4");

        assert!(!below.satisfies(DRIVER_OPTS));
        assert!(at.satisfies(DRIVER_OPTS));
        assert!(!at.satisfies(BOOTSTRAP_BUILDER));
        assert!(above.satisfies(DRIVER_OPTS));
        assert!(above.satisfies(BOOTSTRAP_BUILDER));
    }

    #[test]
    fn test_pre_release_uses_release_triple() {
        let rc = ToolVersion::parse("github.com/docker/buildx v0.10.0-rc1 abcdef");
        assert!(rc.satisfies(BOOTSTRAP_BUILDER));

        let described = ToolVersion::parse("v0.9.1-12-g0123abc");
        assert!(described.satisfies(DRIVER_OPTS));
    }

    #[test]
    fn test_unknown_satisfies_nothing() {
        let unknown = ToolVersion::Unknown("dev".to_string());
        assert!(!unknown.satisfies(">=0.0.0"));
        assert!(!unknown.satisfies("*"));
        assert!(!satisfies(&unknown, DRIVER_OPTS));
    }

    #[test]
    fn test_invalid_range_satisfies_nothing() {
        let version = ToolVersion::parse("1.0.0");
        assert!(!version.satisfies("not a range"));
    }
}
