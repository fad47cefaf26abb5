//! Vocabulary maps: token name <-> dense integer id, plus inverse-relation pairing.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{KgError, Result};

/// Dense entity id in `[0, entity_vocab.len())`.
pub type EntityId = u32;
/// Dense relation id in `[0, relation_vocab.len())`.
pub type RelationId = u32;

/// Reserved padding token present in every vocabulary.
pub const PAD_TOKEN: &str = "PAD";
/// Reserved relation token for the "stay where you are" action.
pub const NO_OP_TOKEN: &str = "NO_OP";

/// Immutable bidirectional token/id mapping.
#[derive(Debug, Clone)]
pub struct Vocab {
    kind: &'static str,
    ids: HashMap<String, u32>,
    names: Vec<String>,
    pad: u32,
}

impl Vocab {
    /// Build a vocabulary from a token -> id map.
    ///
    /// Ids must be dense in `[0, map.len())` and the map must contain `PAD`.
    /// `kind` names the vocabulary in error messages (`"entity"`, `"relation"`).
    pub fn from_map(kind: &'static str, ids: HashMap<String, u32>) -> Result<Self> {
        let mut slots: Vec<Option<String>> = vec![None; ids.len()];
        for (token, &id) in &ids {
            let slot = slots.get_mut(id as usize).ok_or_else(|| {
                KgError::Config(format!(
                    "{} vocabulary id {} for '{}' is not dense (size {})",
                    kind,
                    id,
                    token,
                    ids.len()
                ))
            })?;
            if let Some(existing) = slot {
                return Err(KgError::Config(format!(
                    "{} vocabulary maps both '{}' and '{}' to id {}",
                    kind, existing, token, id
                )));
            }
            *slot = Some(token.clone());
        }
        // Every id is in range and unique, so every slot is filled.
        let names: Vec<String> = slots.into_iter().flatten().collect();

        let pad = *ids.get(PAD_TOKEN).ok_or_else(|| {
            KgError::Config(format!("{} vocabulary has no {} token", kind, PAD_TOKEN))
        })?;

        Ok(Self {
            kind,
            ids,
            names,
            pad,
        })
    }

    /// Build a vocabulary from `(token, id)` pairs.
    pub fn from_pairs<I, S>(kind: &'static str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self::from_map(kind, pairs.into_iter().map(|(t, id)| (t.into(), id)).collect())
    }

    /// Load a vocabulary from a JSON object file (`{"token": id, ...}`).
    pub fn load(kind: &'static str, path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let ids: HashMap<String, u32> = serde_json::from_str(&raw)?;
        let vocab = Self::from_map(kind, ids)?;
        log::info!(
            "Loaded {} {} tokens from {}",
            vocab.len(),
            kind,
            path.display()
        );
        Ok(vocab)
    }

    /// Id of `token`, if present.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Id of `token` or `UnknownToken` tagged with the triple-file line.
    pub fn lookup(&self, token: &str, line: usize) -> Result<u32> {
        self.id(token).ok_or_else(|| KgError::UnknownToken {
            vocab: self.kind,
            token: token.to_string(),
            line,
        })
    }

    /// Id of a reserved token the caller cannot work without.
    pub fn require(&self, token: &str) -> Result<u32> {
        self.id(token).ok_or_else(|| {
            KgError::Config(format!("{} vocabulary has no {} token", self.kind, token))
        })
    }

    /// Token for `id`, if in range.
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn pad(&self) -> u32 {
        self.pad
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as u32, name.as_str()))
    }
}

/// Relation id -> id of its inverse relation.
///
/// Pairing follows the naming convention: a bare `rel` pairs with `_rel`,
/// or with `rel_` when there is no `_rel`. Pairs are registered in both
/// directions and only when both names exist.
#[derive(Debug, Clone, Default)]
pub struct PairedRelations {
    inverse: HashMap<RelationId, RelationId>,
}

impl PairedRelations {
    pub fn from_vocab(relations: &Vocab) -> Self {
        let pairs = relations
            .iter()
            .filter(|(_, name)| !is_marked(name))
            .filter_map(|(id, name)| {
                [format!("_{}", name), format!("{}_", name)]
                    .iter()
                    .find_map(|partner| relations.id(partner))
                    .map(|partner_id| (id, partner_id))
            });
        let paired = Self::from_pairs(pairs);
        log::debug!("Derived {} paired relations", paired.len() / 2);
        paired
    }

    /// Explicit pairing, registered in both directions.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (RelationId, RelationId)>,
    {
        let mut inverse = HashMap::new();
        for (a, b) in pairs {
            if a != b {
                inverse.insert(a, b);
                inverse.insert(b, a);
            }
        }
        Self { inverse }
    }

    pub fn inverse_of(&self, relation: RelationId) -> Option<RelationId> {
        self.inverse.get(&relation).copied()
    }

    pub fn len(&self) -> usize {
        self.inverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverse.is_empty()
    }
}

fn is_marked(name: &str) -> bool {
    name.starts_with('_') || name.ends_with('_')
}
