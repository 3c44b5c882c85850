use onto_store::DataStore;
use serde_json::Value;

use crate::error::ActionResult;
use crate::params::ActionParameters;

// ---------------------------------------------------------------------------
// CriterionDecision
// ---------------------------------------------------------------------------

/// Outcome of one submission criterion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CriterionDecision {
    Pass,
    Fail { reason: String },
}

impl CriterionDecision {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail { reason: reason.into() }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ---------------------------------------------------------------------------
// SubmissionCriterion trait
// ---------------------------------------------------------------------------

/// A business rule checked before an action's effect runs.
///
/// Criteria see the request parameters and the current store state. Every
/// registered criterion runs, so a response lists all failing rules.
pub trait SubmissionCriterion: Send + Sync {
    /// Name reported in the validation response.
    fn name(&self) -> &str;

    fn evaluate(&self, params: &ActionParameters, store: &DataStore) -> ActionResult<CriterionDecision>;
}

// ---------------------------------------------------------------------------
// Built-in criteria
// ---------------------------------------------------------------------------

/// The parameter is present and not an empty string or array.
pub struct ParameterNotEmpty {
    name: String,
    parameter: String,
}

impl ParameterNotEmpty {
    /// Criterion named after the parameter it checks.
    pub fn new(parameter: impl Into<String>) -> Self {
        let parameter = parameter.into();
        Self {
            name: parameter.clone(),
            parameter,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl SubmissionCriterion for ParameterNotEmpty {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, params: &ActionParameters, _store: &DataStore) -> ActionResult<CriterionDecision> {
        let empty = match params.get(&self.parameter) {
            None => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };
        Ok(if empty {
            CriterionDecision::fail(format!("{} must not be empty", self.parameter))
        } else {
            CriterionDecision::Pass
        })
    }
}

/// The parameter holds the primary key of an existing object.
pub struct ObjectExists {
    name: String,
    parameter: String,
    object_type: String,
}

impl ObjectExists {
    pub fn new(parameter: impl Into<String>, object_type: impl Into<String>) -> Self {
        let parameter = parameter.into();
        Self {
            name: parameter.clone(),
            parameter,
            object_type: object_type.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl SubmissionCriterion for ObjectExists {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, params: &ActionParameters, store: &DataStore) -> ActionResult<CriterionDecision> {
        let Ok(locator) = params.locator(&self.parameter, &self.object_type) else {
            return Ok(CriterionDecision::fail(format!(
                "{} does not name a {}",
                self.parameter, self.object_type
            )));
        };
        Ok(if store.get_object(&locator).is_some() {
            CriterionDecision::Pass
        } else {
            CriterionDecision::fail(format!("{locator} does not exist"))
        })
    }
}

type CriterionFn =
    Box<dyn Fn(&ActionParameters, &DataStore) -> ActionResult<CriterionDecision> + Send + Sync>;

/// A criterion defined by a closure.
pub struct FnCriterion {
    name: String,
    check: CriterionFn,
}

impl FnCriterion {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ActionParameters, &DataStore) -> ActionResult<CriterionDecision> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }
}

impl SubmissionCriterion for FnCriterion {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, params: &ActionParameters, store: &DataStore) -> ActionResult<CriterionDecision> {
        (self.check)(params, store)
    }
}
