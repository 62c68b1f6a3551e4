//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::tree::NodeId;

/// Domain errors represent structural violations of a condition tree
/// or of one of its encodings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown node kind: {0}")]
    UnknownKind(String),

    #[error("unknown search field: {0}")]
    UnknownField(String),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("malformed rows at position {row}: {reason}")]
    MalformedRows { row: usize, reason: String },

    #[error("cannot decode tree: {0}")]
    Decode(String),

    #[error("invalid condition expression: {0}")]
    InvalidCondition(String),
}

impl DomainError {
    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRows {
            row,
            reason: reason.into(),
        }
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;
