use serde::Deserialize;
use std::fmt;

/// Three-component numeric release version. Missing components are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModVersion(pub u64, pub u64, pub u64);

impl ModVersion {
    /// Lenient parse: each dot-separated component contributes its leading
    /// digits, anything unparsable counts as zero, extra components are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.trim().split('.').map(leading_number);
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        let patch = parts.next().unwrap_or(0);
        Self(major, minor, patch)
    }
}

fn leading_number(component: &str) -> u64 {
    let digits: String = component
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

impl<'de> Deserialize<'de> for ModVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A single downloadable release as advertised by the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModRelease {
    pub version: ModVersion,
    pub engine_version: String,
    pub download_path: String,
    pub file_name: String,
}

/// Pick the newest release built for exactly `engine_version`.
///
/// Engine versions are compared as plain strings. Among matches the greatest
/// version wins; on a tie the earliest candidate in input order is kept.
pub fn resolve<'a>(releases: &'a [ModRelease], engine_version: &str) -> Option<&'a ModRelease> {
    let mut best: Option<&ModRelease> = None;
    for release in releases.iter().filter(|r| r.engine_version == engine_version) {
        let newer = match best {
            Some(current) => release.version > current.version,
            None => true,
        };
        if newer {
            best = Some(release);
        }
    }
    best
}
