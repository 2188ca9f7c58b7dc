//! Hash-addressed migration graph
//!
//! One immutable representation serves two queries:
//!
//! | Query | Direction | Used by |
//! |-------|-----------|---------|
//! | [`MigrationGraph::find_equivalence_path`] | ignored | handoff decision |
//! | [`MigrationGraph::run_forward_migration`] | respected | `ob migrate` |
//!
//! Both return the shortest path. Among equally short paths the one whose
//! vertex sequence is lexicographically smallest wins, so answers never
//! depend on file order or hashing seeds.
//!
//! Structural defects are recorded while the graph is built and reported by
//! every query afterwards, whichever vertices are asked about.

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, Neighbors, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::error::{GraphError, VertexRole};
use crate::hash::VersionHash;
use crate::name::GraphName;

/// Directed edge with its free-text action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: VersionHash,
    pub to: VersionHash,
    pub action: String,
}

impl Edge {
    pub fn new(
        from: impl Into<VersionHash>,
        to: impl Into<VersionHash>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            action: action.into(),
        }
    }
}

/// One step of a forward migration: the vertex reached and the action of the
/// edge taken to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub hash: VersionHash,
    pub action: String,
}

#[derive(Debug, Clone, Copy)]
enum Traversal {
    Forward,
    Undirected,
}

#[derive(Debug, Clone)]
pub struct MigrationGraph {
    name: GraphName,
    graph: DiGraph<VersionHash, String>,
    index: BTreeMap<VersionHash, NodeIndex>,
    first: Option<VersionHash>,
    last: Option<VersionHash>,
    defect: Option<GraphError>,
}

impl MigrationGraph {
    /// Build a graph. Never fails: the first structural defect found is kept
    /// and returned by [`MigrationGraph::validate`] and every path query.
    pub fn new(
        name: GraphName,
        vertices: impl IntoIterator<Item = VersionHash>,
        edges: impl IntoIterator<Item = Edge>,
        first: Option<VersionHash>,
        last: Option<VersionHash>,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        let mut defect = None;

        for hash in vertices {
            if index.contains_key(&hash) {
                defect.get_or_insert(GraphError::DuplicateVertex(hash));
                continue;
            }
            let node = graph.add_node(hash.clone());
            index.insert(hash, node);
        }

        let mut connected = BTreeSet::new();
        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                let missing = if index.contains_key(&edge.from) {
                    edge.to.clone()
                } else {
                    edge.from.clone()
                };
                defect.get_or_insert(GraphError::DanglingEdge {
                    from: edge.from,
                    to: edge.to,
                    missing,
                });
                continue;
            };

            if !connected.insert((from.min(to), from.max(to))) {
                defect.get_or_insert(GraphError::AmbiguousEdge {
                    a: edge.from,
                    b: edge.to,
                });
                continue;
            }
            graph.add_edge(from, to, edge.action);
        }

        if defect.is_none()
            && let Err(cycle) = petgraph::algo::toposort(&graph, None)
        {
            defect = Some(GraphError::Cycle(graph[cycle.node_id()].clone()));
        }

        for (role, designated) in [(VertexRole::First, &first), (VertexRole::Last, &last)] {
            if let Some(hash) = designated
                && !index.contains_key(hash)
            {
                defect.get_or_insert(GraphError::UndeclaredDesignatedVertex {
                    role,
                    hash: hash.clone(),
                });
            }
        }

        Self {
            name,
            graph,
            index,
            first,
            last,
            defect,
        }
    }

    pub fn name(&self) -> GraphName {
        self.name
    }

    pub fn has_vertex(&self, hash: &VersionHash) -> bool {
        self.index.contains_key(hash)
    }

    /// Canonical origin, if the backing store designated one
    pub fn first_vertex(&self) -> Option<&VersionHash> {
        self.first.as_ref()
    }

    /// Canonical head, if the backing store designated one
    pub fn last_vertex(&self) -> Option<&VersionHash> {
        self.last.as_ref()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Report the first structural defect, if any.
    pub fn validate(&self) -> Result<(), GraphError> {
        match &self.defect {
            Some(defect) => Err(defect.clone()),
            None => Ok(()),
        }
    }

    /// Shortest path between `a` and `b` ignoring edge direction.
    ///
    /// Edges are returned in their stored orientation, ordered from `a` to
    /// `b`. Swapping `a` and `b` yields the same edges in reverse order.
    /// `Ok(None)` means no path exists or either vertex is unknown.
    pub fn find_equivalence_path(
        &self,
        a: &VersionHash,
        b: &VersionHash,
    ) -> Result<Option<Vec<Edge>>, GraphError> {
        self.validate()?;
        let (Some(&node_a), Some(&node_b)) = (self.index.get(a), self.index.get(b)) else {
            return Ok(None);
        };

        // Always walk from the smaller hash so both orientations agree on ties.
        let swapped = a > b;
        let (start, goal) = if swapped {
            (node_b, node_a)
        } else {
            (node_a, node_b)
        };

        let Some(walk) = self.shortest_walk(start, goal, Traversal::Undirected) else {
            return Ok(None);
        };
        let mut edges: Vec<Edge> = walk.into_iter().filter_map(|id| self.edge(id)).collect();
        if swapped {
            edges.reverse();
        }
        Ok(Some(edges))
    }

    /// Shortest directed path from `from` to `to`, as the steps taken.
    ///
    /// `from == to` yields an empty sequence. `Ok(None)` means no directed
    /// path exists or either vertex is unknown.
    pub fn run_forward_migration(
        &self,
        from: &VersionHash,
        to: &VersionHash,
    ) -> Result<Option<Vec<MigrationStep>>, GraphError> {
        self.validate()?;
        let (Some(&start), Some(&goal)) = (self.index.get(from), self.index.get(to)) else {
            return Ok(None);
        };

        let Some(walk) = self.shortest_walk(start, goal, Traversal::Forward) else {
            return Ok(None);
        };
        let steps = walk
            .into_iter()
            .filter_map(|id| self.edge(id))
            .map(|edge| MigrationStep {
                hash: edge.to,
                action: edge.action,
            })
            .collect();
        Ok(Some(steps))
    }

    fn edge(&self, id: EdgeIndex) -> Option<Edge> {
        let (source, target) = self.graph.edge_endpoints(id)?;
        Some(Edge {
            from: self.graph[source].clone(),
            to: self.graph[target].clone(),
            action: self.graph[id].clone(),
        })
    }

    /// Walk from `start` to `goal`, at every step taking the smallest
    /// neighbour that is still on a shortest path.
    fn shortest_walk(
        &self,
        start: NodeIndex,
        goal: NodeIndex,
        traversal: Traversal,
    ) -> Option<Vec<EdgeIndex>> {
        let distances = self.distances_to(goal, traversal);
        let mut remaining = *distances.get(&start)?;
        let mut current = start;
        let mut walk = Vec::with_capacity(remaining);

        while remaining > 0 {
            let (edge, next) = self
                .steps_from(current, traversal)
                .into_iter()
                .filter(|(_, next)| distances.get(next) == Some(&(remaining - 1)))
                .min_by(|(_, x), (_, y)| self.graph[*x].cmp(&self.graph[*y]))?;
            walk.push(edge);
            current = next;
            remaining -= 1;
        }

        Some(walk)
    }

    /// Breadth-first distances to `goal`, following edges backwards.
    fn distances_to(&self, goal: NodeIndex, traversal: Traversal) -> HashMap<NodeIndex, usize> {
        let mut distances = HashMap::from([(goal, 0)]);
        let mut queue = VecDeque::from([goal]);

        while let Some(node) = queue.pop_front() {
            let distance = distances.get(&node).copied().unwrap_or_default();
            for previous in self.predecessors(node, traversal) {
                if let Entry::Vacant(slot) = distances.entry(previous) {
                    slot.insert(distance + 1);
                    queue.push_back(previous);
                }
            }
        }

        distances
    }

    fn predecessors(&self, node: NodeIndex, traversal: Traversal) -> Neighbors<'_, String> {
        match traversal {
            Traversal::Forward => self.graph.neighbors_directed(node, Direction::Incoming),
            Traversal::Undirected => self.graph.neighbors_undirected(node),
        }
    }

    fn steps_from(&self, node: NodeIndex, traversal: Traversal) -> Vec<(EdgeIndex, NodeIndex)> {
        let directions: &[Direction] = match traversal {
            Traversal::Forward => &[Direction::Outgoing],
            Traversal::Undirected => &[Direction::Outgoing, Direction::Incoming],
        };

        directions
            .iter()
            .flat_map(|&direction| self.graph.edges_directed(node, direction))
            .filter_map(|edge| {
                let (source, target) = self.graph.edge_endpoints(edge.id())?;
                let other = if source == node { target } else { source };
                Some((edge.id(), other))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn h(s: &str) -> VersionHash {
        VersionHash::new(s)
    }

    fn graph(vertices: &[&str], edges: &[(&str, &str, &str)]) -> MigrationGraph {
        MigrationGraph::new(
            GraphName::Upgrade,
            vertices.iter().copied().map(h),
            edges
                .iter()
                .map(|(from, to, action)| Edge::new(*from, *to, *action)),
            vertices.first().copied().map(h),
            vertices.last().copied().map(h),
        )
    }

    /// A -> B -> D and A -> C -> D: two shortest paths between A and D
    fn diamond() -> MigrationGraph {
        graph(
            &["A", "B", "C", "D"],
            &[
                ("A", "C", "via C"),
                ("C", "D", "C to D"),
                ("A", "B", "via B"),
                ("B", "D", "B to D"),
            ],
        )
    }

    #[test]
    fn test_linear_forward_migration() {
        let g = graph(&["A", "B", "C"], &[("A", "B", "one"), ("B", "C", "two")]);
        let steps = g.run_forward_migration(&h("A"), &h("C")).unwrap();
        assert_eq!(
            steps,
            Some(vec![
                MigrationStep {
                    hash: h("B"),
                    action: "one".to_string()
                },
                MigrationStep {
                    hash: h("C"),
                    action: "two".to_string()
                },
            ])
        );
    }

    #[test]
    fn test_forward_migration_identity_is_empty() {
        let g = diamond();
        for vertex in ["A", "B", "C", "D"] {
            assert_eq!(
                g.run_forward_migration(&h(vertex), &h(vertex)).unwrap(),
                Some(vec![])
            );
        }
    }

    #[test]
    fn test_forward_migration_respects_direction() {
        let g = graph(&["A", "B"], &[("A", "B", "step")]);
        assert_eq!(g.run_forward_migration(&h("B"), &h("A")).unwrap(), None);
        assert!(g.find_equivalence_path(&h("B"), &h("A")).unwrap().is_some());
    }

    #[test]
    fn test_forward_migration_prefers_shortest_path() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[
                ("A", "B", "1"),
                ("B", "C", "2"),
                ("C", "D", "3"),
                ("A", "D", "shortcut"),
            ],
        );
        let steps = g.run_forward_migration(&h("A"), &h("D")).unwrap().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, "shortcut");
    }

    #[test]
    fn test_ties_resolve_to_smallest_vertex_sequence() {
        let g = diamond();
        let steps = g.run_forward_migration(&h("A"), &h("D")).unwrap().unwrap();
        assert_eq!(steps[0].hash, h("B"));

        let path = g.find_equivalence_path(&h("A"), &h("D")).unwrap().unwrap();
        assert_eq!(path[0], Edge::new("A", "B", "via B"));
        assert_eq!(path[1], Edge::new("B", "D", "B to D"));
    }

    #[test]
    fn test_queries_are_deterministic() {
        let g = diamond();
        let first = g.find_equivalence_path(&h("D"), &h("A")).unwrap();
        let forward = g.run_forward_migration(&h("A"), &h("D")).unwrap();
        for _ in 0..10 {
            assert_eq!(g.find_equivalence_path(&h("D"), &h("A")).unwrap(), first);
            assert_eq!(g.run_forward_migration(&h("A"), &h("D")).unwrap(), forward);
        }
    }

    #[test]
    fn test_equivalence_path_is_symmetric() {
        let g = diamond();
        let forward = g.find_equivalence_path(&h("C"), &h("B")).unwrap().unwrap();
        let mut backward = g.find_equivalence_path(&h("B"), &h("C")).unwrap().unwrap();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn test_equivalence_path_ignores_direction() {
        let g = graph(&["A", "B", "C"], &[("A", "B", "x"), ("C", "B", "y")]);
        let path = g.find_equivalence_path(&h("A"), &h("C")).unwrap().unwrap();
        assert_eq!(path, vec![Edge::new("A", "B", "x"), Edge::new("C", "B", "y")]);
        assert_eq!(g.run_forward_migration(&h("A"), &h("C")).unwrap(), None);
    }

    #[test]
    fn test_disconnected_vertices_have_no_path() {
        let g = graph(&["A", "B", "C"], &[("A", "B", "x")]);
        assert_eq!(g.find_equivalence_path(&h("A"), &h("C")).unwrap(), None);
        assert_eq!(g.run_forward_migration(&h("A"), &h("C")).unwrap(), None);
    }

    #[test]
    fn test_unknown_vertices_have_no_path() {
        let g = diamond();
        assert!(!g.has_vertex(&h("Z")));
        assert_eq!(g.find_equivalence_path(&h("A"), &h("Z")).unwrap(), None);
        assert_eq!(g.run_forward_migration(&h("Z"), &h("A")).unwrap(), None);
    }

    #[test]
    fn test_designated_vertices() {
        let g = diamond();
        assert_eq!(g.first_vertex(), Some(&h("A")));
        assert_eq!(g.last_vertex(), Some(&h("D")));
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 4);

        let undesignated =
            MigrationGraph::new(GraphName::Handoff, [h("A")], Vec::new(), None, None);
        assert_eq!(undesignated.first_vertex(), None);
        assert_eq!(undesignated.last_vertex(), None);
        assert_eq!(undesignated.validate(), Ok(()));
    }

    fn assert_malformed(g: &MigrationGraph, expected: &GraphError) {
        assert_eq!(g.validate().as_ref(), Err(expected));
        for a in ["A", "B", "C", "Z"] {
            for b in ["A", "B", "C", "Z"] {
                assert_eq!(
                    g.find_equivalence_path(&h(a), &h(b)).as_ref(),
                    Err(expected)
                );
                assert_eq!(
                    g.run_forward_migration(&h(a), &h(b)).as_ref(),
                    Err(expected)
                );
            }
        }
    }

    #[test]
    fn test_duplicate_vertex_is_structural() {
        let g = graph(&["A", "B", "A", "C"], &[("A", "B", "x")]);
        assert_malformed(&g, &GraphError::DuplicateVertex(h("A")));
        assert!(g.has_vertex(&h("A")));
    }

    #[test]
    fn test_dangling_edge_is_structural() {
        let g = graph(&["A", "B"], &[("A", "B", "x"), ("B", "C", "y")]);
        assert_malformed(
            &g,
            &GraphError::DanglingEdge {
                from: h("B"),
                to: h("C"),
                missing: h("C"),
            },
        );
    }

    #[test]
    fn test_parallel_edges_are_ambiguous() {
        let g = graph(&["A", "B", "C"], &[("A", "B", "x"), ("A", "B", "y")]);
        assert_malformed(
            &g,
            &GraphError::AmbiguousEdge {
                a: h("A"),
                b: h("B"),
            },
        );
    }

    #[test]
    fn test_opposing_edges_are_ambiguous() {
        let g = graph(&["A", "B", "C"], &[("A", "B", "x"), ("B", "A", "y")]);
        assert_malformed(
            &g,
            &GraphError::AmbiguousEdge {
                a: h("B"),
                b: h("A"),
            },
        );
    }

    #[test]
    fn test_cycle_is_structural() {
        let g = graph(
            &["A", "B", "C"],
            &[("A", "B", "x"), ("B", "C", "y"), ("C", "A", "z")],
        );
        assert!(matches!(g.validate(), Err(GraphError::Cycle(_))));
        assert!(g.find_equivalence_path(&h("A"), &h("A")).is_err());
        assert!(g.run_forward_migration(&h("A"), &h("C")).is_err());
    }

    #[test]
    fn test_self_loop_is_structural() {
        let g = graph(&["A", "B", "C"], &[("B", "B", "x")]);
        assert_malformed(&g, &GraphError::Cycle(h("B")));
    }

    #[test]
    fn test_undeclared_designated_vertex_is_structural() {
        let g = MigrationGraph::new(
            GraphName::Handoff,
            [h("A"), h("B")],
            [Edge::new("A", "B", "False")],
            Some(h("A")),
            Some(h("C")),
        );
        assert_eq!(
            g.validate(),
            Err(GraphError::UndeclaredDesignatedVertex {
                role: VertexRole::Last,
                hash: h("C"),
            })
        );
        assert_eq!(g.last_vertex(), Some(&h("C")));
        assert!(!g.has_vertex(&h("C")));
    }
}
