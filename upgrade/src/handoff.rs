//! Handoff decision
//!
//! The ambient `ob` hands control to the project's pinned copy unless the
//! equivalence path between the two versions crosses a blocking edge.
//! Unknown project versions and disconnected versions fall back to handing
//! off, with a warning.

use ob_migration::{Edge, GraphName, MigrationGraph, VersionHash};
use thiserror::Error;

use crate::error::{Result, UpgradeError};

const BLOCKING: &str = "True";
const NON_BLOCKING: &str = "False";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected \"True\" or \"False\", got {action:?}")]
pub struct ActionDecodeError {
    pub action: String,
}

/// Decode a handoff-graph action: `Ok(true)` when crossing the edge requires
/// the ambient tool to keep control.
pub fn classify_handoff_action(action: &str) -> std::result::Result<bool, ActionDecodeError> {
    match action.trim() {
        BLOCKING => Ok(true),
        NON_BLOCKING => Ok(false),
        _ => Err(ActionDecodeError {
            action: action.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffReason {
    /// The project's version is not a vertex of the ambient graph
    UnknownProjectVersion,
    /// No undirected path joins the two versions
    NoEquivalencePath,
    /// A path exists and none of its edges block
    Compatible { edges: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffDecision {
    Perform(HandoffReason),
    Retain { blocking_edges: Vec<Edge> },
}

impl HandoffDecision {
    pub fn should_hand_off(&self) -> bool {
        matches!(self, Self::Perform(_))
    }
}

/// Decide whether the ambient tool at `ambient` hands off to a project pinned
/// at `project`, using the ambient tool's own handoff graph.
pub fn decide<F>(
    graph: &MigrationGraph,
    project: &VersionHash,
    ambient: &VersionHash,
    classify: F,
) -> Result<HandoffDecision>
where
    F: Fn(&str) -> std::result::Result<bool, ActionDecodeError>,
{
    let name = graph.name();
    if !graph.has_vertex(project) {
        // Structure errors still win over the fallback.
        graph
            .validate()
            .map_err(|source| UpgradeError::structure(name, source))?;
        tracing::warn!(
            graph = %name,
            hash = %project,
            "Project's ob version is unknown to this ob; handing off"
        );
        return Ok(HandoffDecision::Perform(HandoffReason::UnknownProjectVersion));
    }

    let path = graph
        .find_equivalence_path(project, ambient)
        .map_err(|source| UpgradeError::structure(name, source))?;
    let Some(path) = path else {
        tracing::warn!(
            graph = %name,
            from = %project,
            to = %ambient,
            edge_count = graph.edge_count(),
            "No equivalence path between project and ambient ob; handing off"
        );
        return Ok(HandoffDecision::Perform(HandoffReason::NoEquivalencePath));
    };

    let mut blocking_edges = Vec::new();
    for edge in &path {
        let blocking = classify(&edge.action).map_err(|err| decode_failure(name, edge, err))?;
        if blocking {
            blocking_edges.push(edge.clone());
        }
    }

    if blocking_edges.is_empty() {
        tracing::info!(
            graph = %name,
            from = %project,
            to = %ambient,
            edges = path.len(),
            "Handing off"
        );
        Ok(HandoffDecision::Perform(HandoffReason::Compatible {
            edges: path.len(),
        }))
    } else {
        tracing::info!(
            graph = %name,
            from = %project,
            to = %ambient,
            blocking = blocking_edges.len(),
            "Retaining control"
        );
        Ok(HandoffDecision::Retain { blocking_edges })
    }
}

fn decode_failure(graph: GraphName, edge: &Edge, err: ActionDecodeError) -> UpgradeError {
    UpgradeError::ActionDecode {
        graph,
        from: edge.from.clone(),
        to: edge.to.clone(),
        action: err.action,
    }
}
