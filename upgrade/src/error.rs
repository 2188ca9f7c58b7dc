//! Upgrade error taxonomy
//!
//! Nothing here is retried. The handoff decision recovers from an unknown
//! project version or a missing path by handing off; every other error ends
//! the command.

use ob_migration::{GraphError, GraphName, HashError, MigrationError, VersionHash, VertexRole};
use std::path::PathBuf;
use thiserror::Error;

/// Upgrade result type alias
pub type Result<T> = std::result::Result<T, UpgradeError>;

/// Error category for structured logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Project or configuration is not in a state the command can work on
    Precondition,
    /// Graph missing, malformed, or lacking the vertices or paths needed
    Graph,
    /// A subprocess, the filesystem or the process handoff failed
    Infrastructure,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precondition => "PRECONDITION_ERROR",
            Self::Graph => "GRAPH_ERROR",
            Self::Infrastructure => "INFRASTRUCTURE_ERROR",
        }
    }

    /// Process exit code used by the `ob` binary
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Graph => 1,
            Self::Precondition => 2,
            Self::Infrastructure => 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("working tree at {path} has {changes} uncommitted change(s); commit or stash them first")]
    DirtyWorkingTree { path: PathBuf, changes: usize },

    #[error("`{command}` failed ({status}): {stderr}")]
    ExternalToolFailure {
        command: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    HashProcedure(#[from] HashError),

    #[error(transparent)]
    GraphLoad(#[from] MigrationError),

    #[error("no {graph} graph found at {location}")]
    MissingGraph { graph: GraphName, location: PathBuf },

    #[error("{graph} graph is malformed: {source}")]
    GraphStructure {
        graph: GraphName,
        #[source]
        source: GraphError,
    },

    #[error("{graph} graph does not designate a {role} vertex")]
    MissingDesignatedVertex { graph: GraphName, role: VertexRole },

    #[error("ambient {graph} graph does not contain its own last vertex {hash}; the ob installation is inconsistent")]
    AmbientHashNotInOwnGraph { graph: GraphName, hash: VersionHash },

    #[error("{which} hash {hash} is not a vertex of the {graph} graph ({edge_count} edges)")]
    VertexNotFound {
        graph: GraphName,
        hash: VersionHash,
        which: &'static str,
        edge_count: usize,
    },

    #[error("no migration path from {from} to {to} in the {graph} graph ({edge_count} edges)")]
    NoPathFound {
        graph: GraphName,
        from: VersionHash,
        to: VersionHash,
        edge_count: usize,
    },

    #[error("edge {from} -> {to} of the {graph} graph has undecodable action {action:?}")]
    ActionDecode {
        graph: GraphName,
        from: VersionHash,
        to: VersionHash,
        action: String,
    },

    #[error("hash {hash} of {dir} is not the last vertex {last} of its {graph} graph; register it before releasing")]
    UnregisteredRelease {
        graph: GraphName,
        dir: PathBuf,
        hash: VersionHash,
        last: VersionHash,
    },

    #[error("no pinned copy of ob found at {path}")]
    PinnedCopyNotFound { path: PathBuf },

    #[error("project {project} has no pinned ob executable at {expected}")]
    ExecutableNotFound { project: PathBuf, expected: PathBuf },

    #[error("failed to hand off to {executable}: {source}")]
    HandoffFailed {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpgradeError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DirtyWorkingTree { .. }
            | Self::PinnedCopyNotFound { .. }
            | Self::ExecutableNotFound { .. }
            | Self::Config { .. } => ErrorCategory::Precondition,

            Self::MissingGraph { .. }
            | Self::GraphStructure { .. }
            | Self::MissingDesignatedVertex { .. }
            | Self::AmbientHashNotInOwnGraph { .. }
            | Self::VertexNotFound { .. }
            | Self::NoPathFound { .. }
            | Self::ActionDecode { .. }
            | Self::UnregisteredRelease { .. }
            | Self::GraphLoad(_) => ErrorCategory::Graph,

            Self::ExternalToolFailure { .. }
            | Self::HashProcedure(_)
            | Self::HandoffFailed { .. }
            | Self::Io { .. } => ErrorCategory::Infrastructure,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn structure(graph: GraphName, source: GraphError) -> Self {
        Self::GraphStructure { graph, source }
    }
}
