pub mod actions;
pub mod config;
pub mod error;
pub mod eval;
pub mod grapher;
pub mod graph;
pub mod vocab;

pub use actions::{Action, ActionSlice, ActionTable, CorrectAnswers, StepQuery};
pub use config::Config;
pub use error::{KgError, Result};
pub use grapher::{GrapherOptions, RelationEntityGrapher};
pub use graph::{build_graph, reduce_graph, TripleGraph};
pub use vocab::{EntityId, PairedRelations, RelationId, Vocab};
