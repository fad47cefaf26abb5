//! Degree-based reduction of over-represented relation types.

use std::collections::BTreeMap;

use super::TripleGraph;
use crate::error::{KgError, Result};
use crate::vocab::{EntityId, PairedRelations, RelationId};

/// Edges removed per relation by [`reduce_graph`].
#[derive(Debug, Clone, Default)]
pub struct ReductionReport {
    pub threshold: usize,
    pub removed: BTreeMap<RelationId, usize>,
}

impl ReductionReport {
    pub fn total_removed(&self) -> usize {
        self.removed.values().sum()
    }
}

/// Trim every relation type with more than `threshold` edges down to `threshold`.
///
/// Relations are visited in ascending id order using live counts, so an
/// inverse relation already trimmed in lockstep may need no further work.
/// Each step removes the edge between the highest out-degree source and its
/// highest out-degree target over that relation; out-degree ties go to the
/// smallest entity id. The mirrored inverse edge is removed too when the
/// relation is paired and the edge exists.
pub fn reduce_graph(
    graph: &mut TripleGraph,
    threshold: usize,
    paired: &PairedRelations,
) -> Result<ReductionReport> {
    let mut counts = graph.relation_counts();
    let relation_ids: Vec<RelationId> = counts.keys().copied().collect();
    let mut report = ReductionReport {
        threshold,
        ..Default::default()
    };
    let mut removals = 0usize;

    for relation in relation_ids {
        if counts.get(&relation).copied().unwrap_or(0) <= threshold {
            continue;
        }

        let inverse = paired.inverse_of(relation);
        let (mut sources, targets) = graph.endpoints_of(relation);

        while let Some(&remaining) = counts.get(&relation).filter(|&&c| c > threshold) {
            let exhausted = || KgError::ReductionExhausted {
                relation,
                remaining,
                threshold,
            };

            sources.retain(|&s| graph.has_edge_of(s, relation));
            let source = max_out_degree(graph, sources.iter().copied()).ok_or_else(exhausted)?;
            let target = max_out_degree(
                graph,
                graph
                    .edges_from(source)
                    .iter()
                    .filter(|e| e.relation == relation && targets.contains(&e.target))
                    .map(|e| e.target),
            )
            .ok_or_else(exhausted)?;

            if !graph.remove_edge(source, relation, target) {
                return Err(exhausted());
            }
            decrement(&mut counts, &mut report, relation);

            if let Some(inverse) = inverse {
                if graph.remove_edge(target, inverse, source) {
                    decrement(&mut counts, &mut report, inverse);
                }
            }

            removals += 1;
            if removals % 1000 == 0 {
                log::debug!("{} edges removed, {} remaining", removals, graph.edge_count());
            }
        }
    }

    log::info!(
        "Reduced graph to class threshold {}: removed {} edges, {} remaining",
        threshold,
        report.total_removed(),
        graph.edge_count()
    );
    Ok(report)
}

/// Node with the largest current out-degree; smallest id wins ties.
fn max_out_degree<I>(graph: &TripleGraph, nodes: I) -> Option<EntityId>
where
    I: Iterator<Item = EntityId>,
{
    nodes.max_by(|&a, &b| {
        graph
            .out_degree(a)
            .cmp(&graph.out_degree(b))
            .then_with(|| b.cmp(&a))
    })
}

fn decrement(
    counts: &mut BTreeMap<RelationId, usize>,
    report: &mut ReductionReport,
    relation: RelationId,
) {
    if let Some(count) = counts.get_mut(&relation) {
        *count = count.saturating_sub(1);
    }
    *report.removed.entry(relation).or_insert(0) += 1;
}
