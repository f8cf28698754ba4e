use thiserror::Error;

use super::types::TicketId;

/// Structured error kinds per the error-handling design: Input errors abort
/// the run before it starts, Data/Dependency problems are recorded and
/// skipped, Transient errors degrade to compute-only mode, Internal errors
/// indicate a bug and fail the run.
#[derive(Debug, Error)]
pub enum RouteEngineError {
    #[error("unknown crew type: {0}")]
    InvalidCrewType(String),

    #[error("shift budget must be positive, got {0} hours")]
    InvalidBudget(f64),

    #[error("ticket {0:?} has a malformed geometry or non-positive service time")]
    MalformedTicket(TicketId),

    #[error("backing store unavailable, falling back to compute-only mode: {0}")]
    StoreUnavailable(String),

    #[error("optimization deadline exceeded during stitching")]
    DeadlineExceeded,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Errors surfaced by `TicketStore`/`DistanceCacheStore` adapters. Always
/// treated as Transient by callers in the core engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}
