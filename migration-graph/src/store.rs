//! Graph backing store
//!
//! Each graph is a TOML file `<graph>.toml` in a `migration/` directory:
//!
//! ```toml
//! first = "0a1b"
//! last = "9f8e"
//! vertices = ["0a1b", "9f8e"]
//!
//! [[edges]]
//! from = "0a1b"
//! to = "9f8e"
//! action = "Rename `config/route` to `config/common/route`"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::MigrationError;
use crate::graph::{Edge, MigrationGraph};
use crate::hash::VersionHash;
use crate::name::GraphName;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphFile {
    #[serde(default)]
    first: Option<VersionHash>,
    #[serde(default)]
    last: Option<VersionHash>,
    #[serde(default)]
    vertices: Vec<VersionHash>,
    #[serde(default)]
    edges: Vec<EdgeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeEntry {
    from: VersionHash,
    to: VersionHash,
    action: String,
}

pub fn graph_path(graph: GraphName, migration_dir: &Path) -> PathBuf {
    migration_dir.join(graph.graph_file_name())
}

/// Load a graph from `migration_dir`.
///
/// `Ok(None)` means the directory has no backing store for this graph, which
/// callers treat as "no migration metadata available".
pub fn load_graph(
    graph: GraphName,
    migration_dir: &Path,
) -> Result<Option<MigrationGraph>, MigrationError> {
    let path = graph_path(graph, migration_dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(graph = %graph, path = %path.display(), "No migration graph found");
            return Ok(None);
        }
        Err(source) => {
            return Err(MigrationError::GraphRead {
                graph,
                path,
                source,
            });
        }
    };

    let loaded = parse_graph(graph, &contents).map_err(|source| MigrationError::GraphParse {
        graph,
        path: path.clone(),
        source,
    })?;

    tracing::debug!(
        graph = %graph,
        path = %path.display(),
        vertices = loaded.vertex_count(),
        edges = loaded.edge_count(),
        "Loaded migration graph"
    );
    Ok(Some(loaded))
}

/// Parse the TOML representation of a graph.
pub fn parse_graph(graph: GraphName, contents: &str) -> Result<MigrationGraph, toml::de::Error> {
    let file: GraphFile = toml::from_str(contents)?;
    let edges = file
        .edges
        .into_iter()
        .map(|entry| Edge {
            from: entry.from,
            to: entry.to,
            action: entry.action,
        });

    Ok(MigrationGraph::new(
        graph,
        file.vertices,
        edges,
        file.first,
        file.last,
    ))
}
