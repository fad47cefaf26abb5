//! Knowledge graph module: triple parsing, multi-edge adjacency and degree-based reduction.
//!
//! The graph is a directed multigraph over dense entity ids. Every edge is
//! tagged with a relation id; parallel edges (same or different relation)
//! between a node pair are kept.

mod builder;
mod reduce;

pub use builder::{build_graph, build_graph_from_reader};
pub use reduce::{reduce_graph, ReductionReport};

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{KgError, Result};
use crate::vocab::{EntityId, RelationId};

/// An outgoing edge (source is implied by the adjacency row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub target: EntityId,
    pub relation: RelationId,
}

/// Directed multigraph keyed by relation type.
#[derive(Debug, Clone)]
pub struct TripleGraph {
    out: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl TripleGraph {
    /// Empty graph over `num_nodes` entity ids.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            out: vec![Vec::new(); num_nodes],
            edge_count: 0,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.out.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Insert `source --relation--> target`. Duplicates become parallel edges.
    pub fn add_edge(&mut self, source: EntityId, relation: RelationId, target: EntityId) -> Result<()> {
        self.check_node(target)?;
        let row = self.row_mut(source)?;
        row.push(Edge { target, relation });
        self.edge_count += 1;
        Ok(())
    }

    /// Remove the most recently inserted `source --relation--> target` edge.
    /// Returns false if no such edge exists.
    pub fn remove_edge(&mut self, source: EntityId, relation: RelationId, target: EntityId) -> bool {
        let Some(row) = self.out.get_mut(source as usize) else {
            return false;
        };
        match row
            .iter()
            .rposition(|e| e.target == target && e.relation == relation)
        {
            Some(idx) => {
                row.remove(idx);
                self.edge_count -= 1;
                true
            }
            None => false,
        }
    }

    /// Outgoing edges of `node` in insertion order (empty for unknown ids).
    pub fn edges_from(&self, node: EntityId) -> &[Edge] {
        self.out.get(node as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_degree(&self, node: EntityId) -> usize {
        self.edges_from(node).len()
    }

    /// Nodes with at least one outgoing edge, ascending.
    pub fn source_nodes(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.out
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_empty())
            .map(|(id, _)| id as EntityId)
    }

    /// Edge count per relation type.
    pub fn relation_counts(&self) -> BTreeMap<RelationId, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.out {
            for edge in row {
                *counts.entry(edge.relation).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Distinct source and target nodes of all edges tagged `relation`.
    pub fn endpoints_of(&self, relation: RelationId) -> (BTreeSet<EntityId>, BTreeSet<EntityId>) {
        let mut sources = BTreeSet::new();
        let mut targets = BTreeSet::new();
        for (source, row) in self.out.iter().enumerate() {
            for edge in row.iter().filter(|e| e.relation == relation) {
                sources.insert(source as EntityId);
                targets.insert(edge.target);
            }
        }
        (sources, targets)
    }

    /// True if `source` has at least one edge tagged `relation`.
    pub fn has_edge_of(&self, source: EntityId, relation: RelationId) -> bool {
        self.edges_from(source).iter().any(|e| e.relation == relation)
    }

    fn check_node(&self, node: EntityId) -> Result<()> {
        if (node as usize) < self.out.len() {
            Ok(())
        } else {
            Err(KgError::OutOfRange {
                kind: "entity",
                id: node,
                limit: self.out.len(),
            })
        }
    }

    fn row_mut(&mut self, node: EntityId) -> Result<&mut Vec<Edge>> {
        self.check_node(node)?;
        Ok(&mut self.out[node as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_edges_kept() {
        let mut g = TripleGraph::new(3);
        g.add_edge(0, 0, 1).unwrap();
        g.add_edge(0, 1, 1).unwrap();
        g.add_edge(0, 0, 1).unwrap();
        assert_eq!(g.out_degree(0), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.relation_counts().get(&0), Some(&2));
    }

    #[test]
    fn test_remove_edge_matches_relation() {
        let mut g = TripleGraph::new(3);
        g.add_edge(0, 0, 1).unwrap();
        g.add_edge(0, 1, 1).unwrap();
        assert!(g.remove_edge(0, 0, 1));
        assert_eq!(g.edges_from(0), &[Edge { target: 1, relation: 1 }]);
        assert!(!g.remove_edge(0, 0, 1));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_out_of_range_node() {
        let mut g = TripleGraph::new(2);
        let err = g.add_edge(0, 0, 5).unwrap_err();
        assert!(matches!(err, KgError::OutOfRange { id: 5, .. }));
        assert_eq!(g.out_degree(9), 0);
    }

    #[test]
    fn test_endpoints_and_sources() {
        let mut g = TripleGraph::new(4);
        g.add_edge(0, 0, 1).unwrap();
        g.add_edge(2, 0, 3).unwrap();
        g.add_edge(2, 1, 0).unwrap();
        let (sources, targets) = g.endpoints_of(0);
        assert_eq!(sources.into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(g.source_nodes().collect::<Vec<_>>(), vec![0, 2]);
        assert!(g.has_edge_of(2, 1));
        assert!(!g.has_edge_of(0, 1));
    }
}
