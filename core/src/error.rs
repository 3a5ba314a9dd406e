use crate::gateway::RecordKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Gateway {op} on {kind} failed: {reason}")]
    Gateway {
        op: &'static str,
        kind: RecordKind,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },

    #[error("Transaction '{id}' cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("A reconciliation pass is already running")]
    PassInProgress,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// True for failures raised by the persistence layer.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Gateway { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
