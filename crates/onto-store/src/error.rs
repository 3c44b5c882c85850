use onto_schema::SchemaError;
use onto_types::{Locator, TypeError};

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the locator.
    #[error("object not found: {0}")]
    ObjectNotFound(Locator),

    /// The record exists but has no such link target.
    #[error("linked object not found: {source_object} -> {link} -> {target}")]
    LinkedObjectNotFound {
        source_object: Locator,
        link: String,
        target: String,
    },

    #[error("object already exists: {0}")]
    ObjectAlreadyExists(Locator),

    #[error("property not found: {object_type}.{property}")]
    PropertyNotFound {
        object_type: String,
        property: String,
    },

    /// The property's declared type does not allow the requested use or value.
    #[error("invalid property type for {object_type}.{property}: expected {expected}, got {actual}")]
    InvalidPropertyType {
        object_type: String,
        property: String,
        expected: String,
        actual: String,
    },

    #[error("invalid value for property {property}: {reason}")]
    InvalidPropertyValue { property: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The inverse link name given by the caller is not the schema's inverse.
    #[error("link name mismatch on destination side: expected {expected}, found {actual}")]
    LinkNameMismatch { expected: String, actual: String },

    /// The two resolved link sides belong to different link types.
    #[error("link sides disagree on identity: {source_rid} vs {target_rid}")]
    LinkIdentityMismatch {
        source_rid: String,
        target_rid: String,
    },

    /// The link indices are inconsistent. Always a bug in index maintenance.
    #[error("link invariant violated: {0}")]
    LinkInvariantViolation(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
