use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid locator {0:?}: expected \"<objectType>:<primaryKey>\"")]
    InvalidLocator(String),

    #[error("a {0} value cannot be used as a primary key")]
    InvalidPrimaryKey(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("invalid {expected} value: {reason}")]
    InvalidValue { expected: String, reason: String },

    #[error("unknown type name: {0:?}")]
    UnknownType(String),
}
