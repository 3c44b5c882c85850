//! Actions: validated, edit-tracked mutations of a [`onto_store::DataStore`].
//!
//! An action type is declared in the ontology with typed parameters. The
//! [`ActionEngine`] checks a request's parameters against that declaration,
//! runs every registered [`SubmissionCriterion`], and only then hands a
//! [`Batch`] to the effect registered for the action. The batch writes
//! straight through to the store and records each mutation as an
//! [`ObjectEdit`].
//!
//! ```text
//!   request ──► validate parameters ──► submission criteria ──► INVALID
//!                                              │
//!                                            VALID
//!                                              ▼
//!                               effect(&mut Batch, &params) ──► ActionEdits
//! ```
//!
//! Validation failures are data ([`ValidationResponse`]); only batch
//! pre-validation turns them into [`ActionError::ActionValidationFailed`].

pub mod batch;
pub mod criteria;
pub mod edits;
pub mod engine;
pub mod error;
pub mod params;
pub mod registry;
pub mod validation;

pub use batch::Batch;
pub use criteria::{CriterionDecision, FnCriterion, ObjectExists, ParameterNotEmpty, SubmissionCriterion};
pub use edits::{diff_properties, ActionEdits, ObjectEdit, PropertyChange, PropertyDiff};
pub use engine::{
    ActionEngine, ActionMode, ActionPhase, ApplyActionOptions, ApplyActionRequest,
    ApplyActionResponse, BatchApplyActionItem, BatchApplyActionOptions, BatchApplyActionRequest,
    BatchApplyActionResponse, ReturnEdits,
};
pub use error::{ActionError, ActionResult};
pub use params::ActionParameters;
pub use registry::{ActionEffect, ActionRegistry};
pub use validation::{
    validate_parameters, CriterionEvaluation, ParameterEvaluation, ValidationResponse,
    ValidationResult,
};
