//! Host version coordinates.

use serde::{Deserialize, Serialize};

/// Exact identifier of a host release.
///
/// Totally ordered by `(major, minor, patch)`, but the resolver only ever
/// compares coordinates for equality.
///
/// ```
/// use spellcore::resolver::VersionCoordinate;
///
/// assert_eq!(
///     VersionCoordinate::parse("1.21.1-R0.1-SNAPSHOT"),
///     Some(VersionCoordinate::new(1, 21, 1))
/// );
/// assert_eq!(
///     VersionCoordinate::parse("git-Paper-196 (MC: 1.21)"),
///     Some(VersionCoordinate::new(1, 21, 0))
/// );
/// assert_eq!(VersionCoordinate::parse("banana"), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionCoordinate {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl VersionCoordinate {
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Normalize a host-reported version string.
    ///
    /// Accepts the bare `1.21.1` form, the API form with a build suffix
    /// (`1.21.1-R0.1-SNAPSHOT`), and the server banner form with an
    /// `(MC: 1.21.1)` marker. A missing patch component means `0`.
    /// Any other suffix (`-pre2`, `-rc1`) names a different release and
    /// is rejected.
    #[must_use]
    pub fn parse(reported: &str) -> Option<Self> {
        let reported = reported.trim();
        let core = match reported.find("(MC:") {
            Some(start) => {
                let rest = &reported[start + 4..];
                let end = rest.find(')')?;
                rest[..end].trim()
            }
            None => match reported.split_once('-') {
                Some((core, suffix)) if is_api_build_suffix(suffix) => core,
                Some(_) => return None,
                None => reported,
            },
        };

        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

/// `R0.1-SNAPSHOT` and friends: `R`, dotted digits, `-SNAPSHOT`.
fn is_api_build_suffix(suffix: &str) -> bool {
    suffix
        .strip_prefix('R')
        .and_then(|s| s.strip_suffix("-SNAPSHOT"))
        .is_some_and(|build| {
            build
                .split('.')
                .all(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        })
}

impl std::fmt::Display for VersionCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for VersionCoordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a version coordinate: {s:?}"))
    }
}
