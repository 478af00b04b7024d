//! Build targets and the default target registry

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between a target's family and its tag
pub const TARGET_SEPARATOR: char = ':';

/// Targets built when none are given, in build order
pub const DEFAULT_TARGETS: &[&str] = &[
    "debian:bullseye",
    "debian:bookworm",
    "debian:trixie",
    "ubuntu:focal",
    "ubuntu:jammy",
    "ubuntu:noble",
];

/// A build target of the form `family:tag`, e.g. `debian:bookworm`
///
/// The string is not validated; a malformed target surfaces later as a
/// failure of the external image build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    /// Create a target from its identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short tag used to name the environment image and the container.
    ///
    /// Everything after the first separator; the whole identifier when there
    /// is no separator.
    pub fn tag(&self) -> &str {
        self.0.split_once(TARGET_SEPARATOR).map_or(self.0.as_str(), |(_, tag)| tag)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The built-in registry, in declared order
pub fn default_targets() -> Vec<Target> {
    DEFAULT_TARGETS.iter().map(|id| Target::from(*id)).collect()
}

/// Targets to build: the user-supplied list if non-empty, otherwise the
/// default registry.
pub fn resolve_targets<I, S>(user_supplied: I) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let targets: Vec<Target> = user_supplied.into_iter().map(Target::new).collect();
    if targets.is_empty() {
        default_targets()
    } else {
        targets
    }
}
