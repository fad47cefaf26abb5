//! Action table construction from a (possibly reduced) graph.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{Action, ActionTable, ActionTokens};
use crate::error::{KgError, Result};
use crate::graph::{Edge, TripleGraph};
use crate::vocab::EntityId;

/// A node whose out-degree did not fit in its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedNode {
    pub entity: EntityId,
    pub out_degree: usize,
    pub dropped: usize,
}

/// Nodes that lost edges to the `max_branching` limit during a build.
#[derive(Debug, Clone, Default)]
pub struct CapacityReport {
    pub max_branching: usize,
    pub truncated: Vec<TruncatedNode>,
}

impl CapacityReport {
    pub fn is_empty(&self) -> bool {
        self.truncated.is_empty()
    }

    pub fn total_dropped(&self) -> usize {
        self.truncated.iter().map(|t| t.dropped).sum()
    }
}

impl ActionTable {
    /// Lay out every node's outgoing edges into fixed-width rows.
    ///
    /// Each node's edges are shuffled with `rng` before filling slots
    /// `1..max_branching`; whatever does not fit is dropped and reported.
    pub fn build<R: Rng + ?Sized>(
        graph: &TripleGraph,
        max_branching: usize,
        tokens: ActionTokens,
        rng: &mut R,
    ) -> Result<(Self, CapacityReport)> {
        if max_branching == 0 {
            return Err(KgError::InvalidInput(
                "max_branching must be greater than 0".to_string(),
            ));
        }

        let width = max_branching;
        let num_rows = graph.num_nodes();
        let mut actions = vec![tokens.pad_action(); num_rows * width];
        let mut report = CapacityReport {
            max_branching,
            truncated: Vec::new(),
        };
        let capacity = width - 1;

        for source in graph.source_nodes() {
            let base = source as usize * width;
            actions[base] = Action::new(source, tokens.no_op);

            let mut edges: Vec<Edge> = graph.edges_from(source).to_vec();
            edges.shuffle(rng);

            for (slot, edge) in edges.iter().take(capacity).enumerate() {
                actions[base + 1 + slot] = Action::new(edge.target, edge.relation);
            }

            if edges.len() > capacity {
                let dropped = edges.len() - capacity;
                log::debug!(
                    "Entity {} has {} outgoing edges, dropping {}",
                    source,
                    edges.len(),
                    dropped
                );
                report.truncated.push(TruncatedNode {
                    entity: source,
                    out_degree: edges.len(),
                    dropped,
                });
            }
        }

        if !report.is_empty() {
            log::warn!(
                "{} entities exceed max_branching {}; {} edges dropped from the action table",
                report.truncated.len(),
                max_branching,
                report.total_dropped()
            );
        }

        Ok((
            Self {
                width,
                num_rows,
                tokens,
                actions,
            },
            report,
        ))
    }
}
