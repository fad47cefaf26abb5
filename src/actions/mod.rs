//! Fixed-width action space: one row of `max_branching` (target, relation)
//! slots per entity, stored in a single flat buffer.
//!
//! Row `e` lives at `actions[e * width .. (e + 1) * width]`. Slot 0 of any
//! entity with outgoing edges is the stay action `(e, NO_OP)`; unused slots
//! hold `(PAD_entity, PAD_relation)`.

mod masking;
mod table;

pub use masking::{CorrectAnswers, StepQuery};
pub use table::{CapacityReport, TruncatedNode};

use crate::error::{KgError, Result};
use crate::vocab::{EntityId, RelationId, Vocab, NO_OP_TOKEN};

/// One traversable action: move to `entity` over `relation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub entity: EntityId,
    pub relation: RelationId,
}

impl Action {
    pub fn new(entity: EntityId, relation: RelationId) -> Self {
        Self { entity, relation }
    }
}

impl From<(EntityId, RelationId)> for Action {
    fn from((entity, relation): (EntityId, RelationId)) -> Self {
        Self { entity, relation }
    }
}

/// Reserved ids the table writes into its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTokens {
    pub entity_pad: EntityId,
    pub relation_pad: RelationId,
    pub no_op: RelationId,
}

impl ActionTokens {
    pub fn from_vocabs(entities: &Vocab, relations: &Vocab) -> Result<Self> {
        Ok(Self {
            entity_pad: entities.pad(),
            relation_pad: relations.pad(),
            no_op: relations.require(NO_OP_TOKEN)?,
        })
    }

    pub fn pad_action(&self) -> Action {
        Action::new(self.entity_pad, self.relation_pad)
    }
}

/// Dense per-entity action table. Immutable once built.
#[derive(Debug, Clone)]
pub struct ActionTable {
    width: usize,
    num_rows: usize,
    tokens: ActionTokens,
    actions: Vec<Action>,
}

impl ActionTable {
    /// Slots per row (`max_branching`).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of entity rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn tokens(&self) -> ActionTokens {
        self.tokens
    }

    /// The row of `entity`, or `OutOfRange`.
    pub fn row(&self, entity: EntityId) -> Result<&[Action]> {
        let idx = entity as usize;
        if idx >= self.num_rows {
            return Err(KgError::OutOfRange {
                kind: "entity",
                id: entity,
                limit: self.num_rows,
            });
        }
        Ok(&self.actions[idx * self.width..(idx + 1) * self.width])
    }

    /// True for the padding action.
    pub fn is_pad(&self, action: &Action) -> bool {
        *action == self.tokens.pad_action()
    }

    /// Number of non-PAD slots in `entity`'s row (stay action included).
    pub fn filled_slots(&self, entity: EntityId) -> Result<usize> {
        Ok(self.row(entity)?.iter().filter(|a| !self.is_pad(a)).count())
    }
}

/// Masked copy of table rows for one batch, `len() x width` actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSlice {
    width: usize,
    actions: Vec<Action>,
}

impl ActionSlice {
    pub fn width(&self) -> usize {
        self.width
    }

    /// Batch size.
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.actions.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Masked row of batch element `i`, `None` past the end of the batch.
    pub fn row(&self, i: usize) -> Option<&[Action]> {
        let start = i.checked_mul(self.width)?;
        self.actions.get(start..start.checked_add(self.width)?)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Action]> {
        self.actions.chunks(self.width.max(1))
    }

    /// Flattened target entities (`[batch][slot]`, row-major).
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.actions.iter().map(|a| a.entity).collect()
    }

    /// Flattened relations (`[batch][slot]`, row-major).
    pub fn relation_ids(&self) -> Vec<RelationId> {
        self.actions.iter().map(|a| a.relation).collect()
    }

    pub fn into_vec(self) -> Vec<Action> {
        self.actions
    }
}
