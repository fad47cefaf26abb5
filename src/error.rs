use thiserror::Error;

/// Main error type for kgenv
#[derive(Error, Debug)]
pub enum KgError {
    /// A triple referenced a name missing from a vocabulary
    #[error("Unknown {vocab} token '{token}' on line {line}")]
    UnknownToken {
        vocab: &'static str,
        token: String,
        line: usize,
    },

    /// Final-step masking referenced a query with no registered answer set
    #[error("No correct-answer set registered for query index {0}")]
    MissingAnswerSet(usize),

    /// Reducer ran out of removable edges before reaching the threshold
    #[error("Cannot reduce relation {relation} to {threshold} edges: {remaining} remain with no removable candidate")]
    ReductionExhausted {
        relation: u32,
        remaining: usize,
        threshold: usize,
    },

    /// Entity or relation id outside the vocabulary / table
    #[error("{kind} id {id} out of range (limit {limit})")]
    OutOfRange {
        kind: &'static str,
        id: u32,
        limit: usize,
    },

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding errors (vocabulary files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using KgError
pub type Result<T> = std::result::Result<T, KgError>;
