//! The closed set of migration graphs shipped with `ob`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the two graphs `ob` ships in its `migration/` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphName {
    /// Decides whether the ambient tool hands control to the project's copy
    Handoff,
    /// Lists manual steps between pinned versions
    Upgrade,
}

impl GraphName {
    pub const ALL: [GraphName; 2] = [GraphName::Handoff, GraphName::Upgrade];

    /// Name used on disk and in hash procedure file names
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handoff => "obelisk-handoff",
            Self::Upgrade => "obelisk-upgrade",
        }
    }

    /// File holding the graph, relative to the `migration/` directory
    pub fn graph_file_name(self) -> String {
        format!("{}.toml", self.as_str())
    }

    /// Hash procedure for this graph, relative to the `migration/` directory
    pub fn hash_script_name(self) -> String {
        format!("{}.hash.sh", self.as_str())
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown migration graph {0:?} (expected obelisk-handoff or obelisk-upgrade)")]
pub struct UnknownGraphName(pub String);

impl FromStr for GraphName {
    type Err = UnknownGraphName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownGraphName(s.to_string()))
    }
}
