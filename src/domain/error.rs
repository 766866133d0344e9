//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violated construction invariants of the data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("depth cannot be negative: {0}")]
    NegativeDepth(i64),

    #[error("invalid port {0}: must be between 0 and 65535")]
    InvalidPort(i64),

    #[error("at least one zone required")]
    EmptyCorefile,

    #[error("invalid plain form for {kind} '{name}': {message}")]
    InvalidPlain {
        kind: &'static str,
        name: String,
        message: String,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
