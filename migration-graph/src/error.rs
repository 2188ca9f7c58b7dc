//! Error types for graph loading, graph queries and hash procedures

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::hash::VersionHash;
use crate::name::GraphName;

/// Which designated vertex of a graph is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexRole {
    First,
    Last,
}

impl fmt::Display for VertexRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Last => f.write_str("last"),
        }
    }
}

/// A structural defect that makes every path query over the graph untrustworthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("vertex {0} is declared more than once")]
    DuplicateVertex(VersionHash),

    #[error("edge {from} -> {to} references undeclared vertex {missing}")]
    DanglingEdge {
        from: VersionHash,
        to: VersionHash,
        missing: VersionHash,
    },

    #[error("more than one edge connects {a} and {b}")]
    AmbiguousEdge { a: VersionHash, b: VersionHash },

    #[error("graph contains a directed cycle through {0}")]
    Cycle(VersionHash),

    #[error("designated {role} vertex {hash} is not a vertex of the graph")]
    UndeclaredDesignatedVertex { role: VertexRole, hash: VersionHash },
}

/// Failure reading a graph's backing store
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read {graph} graph at {path}: {source}")]
    GraphRead {
        graph: GraphName,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {graph} graph at {path}: {source}")]
    GraphParse {
        graph: GraphName,
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure running a hash procedure. Captured output is kept verbatim.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to run hash procedure {script}: {source}")]
    Spawn {
        script: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hash procedure {script} failed on {target} ({status}): {stderr}")]
    NonZeroExit {
        script: PathBuf,
        target: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("hash procedure {script} printed no hash for {target}: {stderr}")]
    EmptyOutput {
        script: PathBuf,
        target: PathBuf,
        stderr: String,
    },

    #[error("hash procedure {script} printed {lines} lines for {target}, expected one: {stdout}")]
    UnexpectedOutput {
        script: PathBuf,
        target: PathBuf,
        lines: usize,
        stdout: String,
    },
}
