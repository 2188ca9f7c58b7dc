//! Release consistency checks for an ob checkout
//!
//! A release is consistent when each graph in its `migration/` directory is
//! well formed, designates both ends, and ends at the checkout's own hash.

use ob_migration::{GraphName, HashOracle, VersionHash, VertexRole, load_graph};
use std::path::Path;

use crate::config::MIGRATION_SUBDIR;
use crate::error::{Result, UpgradeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphReport {
    pub graph: GraphName,
    pub vertices: usize,
    pub edges: usize,
    pub head: VersionHash,
}

/// Check one graph of the ob checkout at `dir`.
pub fn verify_graph(graph: GraphName, dir: &Path, oracle: &dyn HashOracle) -> Result<GraphReport> {
    let migration_dir = dir.join(MIGRATION_SUBDIR);
    let loaded = load_graph(graph, &migration_dir)?.ok_or_else(|| UpgradeError::MissingGraph {
        graph,
        location: migration_dir.clone(),
    })?;
    loaded
        .validate()
        .map_err(|source| UpgradeError::structure(graph, source))?;

    if loaded.first_vertex().is_none() {
        return Err(UpgradeError::MissingDesignatedVertex {
            graph,
            role: VertexRole::First,
        });
    }
    let last = loaded
        .last_vertex()
        .cloned()
        .ok_or(UpgradeError::MissingDesignatedVertex {
            graph,
            role: VertexRole::Last,
        })?;

    let hash = oracle.compute_hash(graph, dir)?;
    if hash != last {
        return Err(UpgradeError::UnregisteredRelease {
            graph,
            dir: dir.to_path_buf(),
            hash,
            last,
        });
    }

    tracing::debug!(graph = %graph, hash = %last, "Graph verified");
    Ok(GraphReport {
        graph,
        vertices: loaded.vertex_count(),
        edges: loaded.edge_count(),
        head: last,
    })
}

/// Check every graph of the ob checkout at `dir`, stopping at the first failure.
pub fn verify_all(dir: &Path, oracle: &dyn HashOracle) -> Result<Vec<GraphReport>> {
    GraphName::ALL
        .into_iter()
        .map(|graph| verify_graph(graph, dir, oracle))
        .collect()
}
