//! Error types for registry operations.

use thiserror::Error;

/// Errors that can occur while registering or looking up schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("object type not found: {0}")]
    ObjectTypeNotFound(String),

    #[error("object type already exists: {0}")]
    ObjectTypeAlreadyExists(String),

    /// No link with this name is declared on the object type.
    #[error("link type not found: {object_type}.{link}")]
    LinkTypeNotFound { object_type: String, link: String },

    #[error("link type already exists: {object_type}.{link}")]
    LinkTypeAlreadyExists { object_type: String, link: String },

    #[error("property not found: {object_type}.{property}")]
    PropertyNotFound {
        object_type: String,
        property: String,
    },

    #[error("action type not found: {0}")]
    ActionTypeNotFound(String),

    #[error("action type already exists: {0}")]
    ActionTypeAlreadyExists(String),

    /// The link type declaration is internally inconsistent.
    #[error("invalid link type {link}: {reason}")]
    InvalidLinkType { link: String, reason: String },
}

/// Result alias for registry operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
