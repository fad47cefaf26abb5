//! `RelationEntityGrapher`: the immutable environment context handed to rollouts.
//!
//! Construction runs graph parsing, optional class-threshold reduction and
//! action table layout in sequence. Any failure aborts the build; once built,
//! the grapher only hands out masked copies of its table.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actions::{ActionSlice, ActionTable, ActionTokens, CapacityReport, CorrectAnswers, StepQuery};
use crate::error::{KgError, Result};
use crate::graph::{build_graph, reduce_graph, ReductionReport, TripleGraph};
use crate::vocab::{PairedRelations, Vocab};

/// Build-time knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrapherOptions {
    /// Slots per entity row, stay action included.
    pub max_branching: usize,
    /// Maximum edges kept per relation type; `None` disables reduction.
    pub class_threshhold: Option<usize>,
    /// Seed for the per-node edge shuffle; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl GrapherOptions {
    pub fn new(max_branching: usize) -> Self {
        Self {
            max_branching,
            class_threshhold: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelationEntityGrapher {
    entities: Vocab,
    relations: Vocab,
    paired: PairedRelations,
    graph: TripleGraph,
    table: ActionTable,
    capacity: CapacityReport,
    reduction: Option<ReductionReport>,
}

impl RelationEntityGrapher {
    /// Build from a triple file, seeding the shuffle from `options.seed`.
    pub fn build(
        triple_file: &Path,
        entities: Vocab,
        relations: Vocab,
        options: &GrapherOptions,
    ) -> Result<Self> {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build_with_rng(triple_file, entities, relations, options, &mut rng)
    }

    pub fn build_with_rng<R: Rng + ?Sized>(
        triple_file: &Path,
        entities: Vocab,
        relations: Vocab,
        options: &GrapherOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let graph = build_graph(triple_file, &entities, &relations)?;
        Self::from_graph(graph, entities, relations, options, rng)
    }

    /// Build from an already parsed graph over `entities`.
    pub fn from_graph<R: Rng + ?Sized>(
        mut graph: TripleGraph,
        entities: Vocab,
        relations: Vocab,
        options: &GrapherOptions,
        rng: &mut R,
    ) -> Result<Self> {
        if graph.num_nodes() != entities.len() {
            return Err(KgError::Config(format!(
                "graph has {} nodes but the entity vocabulary has {} tokens",
                graph.num_nodes(),
                entities.len()
            )));
        }

        let tokens = ActionTokens::from_vocabs(&entities, &relations)?;
        let paired = PairedRelations::from_vocab(&relations);

        let reduction = match options.class_threshhold {
            Some(threshold) => Some(reduce_graph(&mut graph, threshold, &paired)?),
            None => None,
        };

        let (table, capacity) = ActionTable::build(&graph, options.max_branching, tokens, rng)?;

        log::info!(
            "KG constructed: {} entities, {} relations, {} edges, max_branching {}",
            entities.len(),
            relations.len(),
            graph.edge_count(),
            options.max_branching
        );

        Ok(Self {
            entities,
            relations,
            paired,
            graph,
            table,
            capacity,
            reduction,
        })
    }

    /// Legal next actions for a rollout batch, with answer leakage masked.
    /// See [`ActionTable::select`].
    pub fn next_actions<A>(
        &self,
        step: &StepQuery<'_>,
        answers: &A,
        is_last_step: bool,
        rollouts: usize,
    ) -> Result<ActionSlice>
    where
        A: CorrectAnswers + ?Sized,
    {
        self.table.select(step, answers, is_last_step, rollouts)
    }

    /// Non-PAD actions of the entity named `name`, as `(target, relation)` names.
    pub fn actions_for_name(&self, name: &str) -> Result<Vec<(&str, &str)>> {
        let id = self.entities.id(name).ok_or_else(|| {
            KgError::InvalidInput(format!("unknown entity '{}'", name))
        })?;
        let mut out = Vec::new();
        for action in self.table.row(id)? {
            if self.table.is_pad(action) {
                continue;
            }
            let target = self.entities.name(action.entity).unwrap_or("?");
            let relation = self.relations.name(action.relation).unwrap_or("?");
            out.push((target, relation));
        }
        Ok(out)
    }

    pub fn entity_vocab(&self) -> &Vocab {
        &self.entities
    }

    pub fn relation_vocab(&self) -> &Vocab {
        &self.relations
    }

    pub fn paired_relations(&self) -> &PairedRelations {
        &self.paired
    }

    pub fn graph(&self) -> &TripleGraph {
        &self.graph
    }

    pub fn table(&self) -> &ActionTable {
        &self.table
    }

    pub fn capacity_report(&self) -> &CapacityReport {
        &self.capacity
    }

    pub fn reduction_report(&self) -> Option<&ReductionReport> {
        self.reduction.as_ref()
    }
}
