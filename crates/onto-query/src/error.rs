use onto_schema::SchemaError;
use onto_store::StoreError;
use onto_types::TypeError;

/// Errors from object-set evaluation and loading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("object set not found: {0}")]
    ObjectSetNotFound(String),

    /// A saved object set refers back to itself.
    #[error("cyclic object set reference: {0}")]
    CyclicReference(String),

    #[error("invalid page size {size}: must be between 1 and {max}")]
    InvalidPageSize { size: usize, max: usize },

    #[error("invalid page token: {0:?}")]
    InvalidPageToken(String),

    /// `methodInput` was evaluated outside a derived property.
    #[error("methodInput is only valid inside a derived property")]
    MissingMethodInput,

    /// A derived `get` selected more than one record.
    #[error("derived property {property} selects {count} objects, expected at most one")]
    AmbiguousSelection { property: String, count: usize },

    #[error("property securities can only be loaded for a single object, found {0}")]
    SecuritiesRequireSingleObject(usize),

    /// A predicate literal does not fit the property's declared type.
    #[error("invalid value for property {property}: {reason}")]
    InvalidPropertyValue { property: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

pub type QueryResult<T> = Result<T, QueryError>;
