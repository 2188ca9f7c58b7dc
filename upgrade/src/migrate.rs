//! Forward migration planning over the upgrade graph

use ob_migration::{MigrationGraph, MigrationStep, VersionHash};

use crate::error::{Result, UpgradeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrateOutcome {
    UpToDate {
        hash: VersionHash,
    },
    Required {
        from: VersionHash,
        to: VersionHash,
        steps: Vec<MigrationStep>,
    },
}

impl MigrateOutcome {
    pub fn steps(&self) -> &[MigrationStep] {
        match self {
            Self::UpToDate { .. } => &[],
            Self::Required { steps, .. } => steps,
        }
    }
}

/// Plan the manual steps that take a project from `from` to `to`.
pub fn plan(
    graph: &MigrationGraph,
    from: &VersionHash,
    to: &VersionHash,
) -> Result<MigrateOutcome> {
    let name = graph.name();
    graph
        .validate()
        .map_err(|source| UpgradeError::structure(name, source))?;

    let not_found = |hash: &VersionHash, which: &'static str| UpgradeError::VertexNotFound {
        graph: name,
        hash: hash.clone(),
        which,
        edge_count: graph.edge_count(),
    };
    if !graph.has_vertex(from) {
        return Err(not_found(from, "starting"));
    }
    if !graph.has_vertex(to) {
        tracing::error!(
            graph = %name,
            hash = %to,
            "Pinned ob was released without registering its version in the upgrade graph"
        );
        return Err(not_found(to, "target"));
    }

    if from == to {
        tracing::info!(graph = %name, hash = %to, "No migration necessary");
        return Ok(MigrateOutcome::UpToDate { hash: to.clone() });
    }

    let steps = graph
        .run_forward_migration(from, to)
        .map_err(|source| UpgradeError::structure(name, source))?
        .ok_or_else(|| UpgradeError::NoPathFound {
            graph: name,
            from: from.clone(),
            to: to.clone(),
            edge_count: graph.edge_count(),
        })?;

    tracing::info!(graph = %name, from = %from, to = %to, steps = steps.len(), "Planned migration");
    Ok(MigrateOutcome::Required {
        from: from.clone(),
        to: to.clone(),
        steps,
    })
}
