use onto_schema::SchemaError;
use onto_store::StoreError;
use onto_types::TypeError;

/// Errors from applying or validating actions.
///
/// A single action that fails validation is not an error: it comes back as
/// an `INVALID` [`crate::ValidationResponse`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// The action type is declared but no effect is registered for it.
    #[error("action not implemented: {0}")]
    ActionNotImplemented(String),

    /// A batch member failed validation, so no effect ran.
    #[error("action validation failed: {action} (request {index})")]
    ActionValidationFailed { action: String, index: usize },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The effect returned an error. Writes made before the failure remain.
    #[error("effect of {action} failed: {source}")]
    EffectFailed {
        action: String,
        #[source]
        source: Box<ActionError>,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl ActionError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;
