//! Per-step action selection with answer-leakage masking.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{ActionSlice, ActionTable};
use crate::error::{KgError, Result};
use crate::vocab::{EntityId, RelationId};

/// Rollout state for one batch; all slices are parallel and of equal length.
#[derive(Debug, Clone, Copy)]
pub struct StepQuery<'a> {
    /// Entity each rollout currently sits on.
    pub current: &'a [EntityId],
    /// Query source entity.
    pub start: &'a [EntityId],
    /// Query relation.
    pub query_relations: &'a [RelationId],
    /// Answer entity scored for this rollout.
    pub end: &'a [EntityId],
}

impl StepQuery<'_> {
    pub fn batch_size(&self) -> usize {
        self.current.len()
    }

    fn validate(&self) -> Result<()> {
        let b = self.current.len();
        if self.start.len() != b || self.query_relations.len() != b || self.end.len() != b {
            return Err(KgError::InvalidInput(format!(
                "step arrays differ in length: current={}, start={}, query_relations={}, end={}",
                b,
                self.start.len(),
                self.query_relations.len(),
                self.end.len()
            )));
        }
        Ok(())
    }
}

/// Source of the full correct-answer set per original query.
pub trait CorrectAnswers {
    fn answers_for(&self, query_index: usize) -> Option<&HashSet<EntityId>>;
}

impl CorrectAnswers for HashMap<usize, HashSet<EntityId>> {
    fn answers_for(&self, query_index: usize) -> Option<&HashSet<EntityId>> {
        self.get(&query_index)
    }
}

impl CorrectAnswers for BTreeMap<usize, HashSet<EntityId>> {
    fn answers_for(&self, query_index: usize) -> Option<&HashSet<EntityId>> {
        self.get(&query_index)
    }
}

impl CorrectAnswers for [HashSet<EntityId>] {
    fn answers_for(&self, query_index: usize) -> Option<&HashSet<EntityId>> {
        self.get(query_index)
    }
}

impl CorrectAnswers for Vec<HashSet<EntityId>> {
    fn answers_for(&self, query_index: usize) -> Option<&HashSet<EntityId>> {
        self.get(query_index)
    }
}

impl ActionTable {
    /// Copy the rows for `step.current` and mask answer leakage.
    ///
    /// While a rollout is still on its start entity, the queried edge
    /// `(query_relation, end)` is padded out. On the last step every action
    /// landing on another correct answer of the same query (looked up at
    /// `i / rollouts`) is padded out, leaving only the scored `end` entity.
    /// The answer index is only consulted when `is_last_step` is set.
    pub fn select<A>(
        &self,
        step: &StepQuery<'_>,
        answers: &A,
        is_last_step: bool,
        rollouts: usize,
    ) -> Result<ActionSlice>
    where
        A: CorrectAnswers + ?Sized,
    {
        step.validate()?;
        if rollouts == 0 {
            return Err(KgError::InvalidInput(
                "rollouts must be greater than 0".to_string(),
            ));
        }

        let pad = self.tokens.pad_action();
        let mut actions = Vec::with_capacity(step.batch_size() * self.width);

        for i in 0..step.batch_size() {
            let offset = actions.len();
            actions.extend_from_slice(self.row(step.current[i])?);
            let row = &mut actions[offset..];

            if step.current[i] == step.start[i] {
                for slot in row.iter_mut() {
                    if slot.relation == step.query_relations[i] && slot.entity == step.end[i] {
                        *slot = pad;
                    }
                }
            }

            if is_last_step {
                let query_index = i / rollouts;
                let correct = answers
                    .answers_for(query_index)
                    .ok_or(KgError::MissingAnswerSet(query_index))?;
                for slot in row.iter_mut() {
                    if slot.entity != step.end[i] && correct.contains(&slot.entity) {
                        *slot = pad;
                    }
                }
            }
        }

        Ok(ActionSlice {
            width: self.width,
            actions,
        })
    }
}
