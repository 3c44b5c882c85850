use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("unsupported fixture format: {0}")]
    UnsupportedFixtureFormat(String),

    #[error("invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("type error: {0}")]
    Type(#[from] onto_types::TypeError),

    #[error("schema error: {0}")]
    Schema(#[from] onto_schema::SchemaError),

    #[error("store error: {0}")]
    Store(#[from] onto_store::StoreError),

    #[error("query error: {0}")]
    Query(#[from] onto_query::QueryError),

    #[error("action error: {0}")]
    Action(#[from] onto_action::ActionError),
}

pub type SdkResult<T> = Result<T, SdkError>;
