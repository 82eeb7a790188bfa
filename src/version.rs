//! Registry version tag

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic version of a resolved registry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryVersion(Version);

impl RegistryVersion {
    /// Parse `1.2.3` or `v1.2.3`
    pub fn parse(raw: &str) -> Result<Self, semver::Error> {
        let raw = raw.trim();
        Version::parse(raw.strip_prefix('v').unwrap_or(raw)).map(Self)
    }

    pub fn semver(&self) -> &Version {
        &self.0
    }
}

/// Registries that declare no version are tagged `0.0.0`
impl Default for RegistryVersion {
    fn default() -> Self {
        Self(Version::new(0, 0, 0))
    }
}

impl fmt::Display for RegistryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
