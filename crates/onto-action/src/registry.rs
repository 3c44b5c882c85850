use std::collections::HashMap;
use std::fmt;

use crate::batch::Batch;
use crate::criteria::SubmissionCriterion;
use crate::error::{ActionError, ActionResult};
use crate::params::ActionParameters;

/// The effect of an action: mutations applied through a batch.
pub type ActionEffect =
    Box<dyn Fn(&mut Batch<'_>, &ActionParameters) -> ActionResult<()> + Send + Sync>;

/// Effects and submission criteria keyed by action type name.
#[derive(Default)]
pub struct ActionRegistry {
    effects: HashMap<String, ActionEffect>,
    criteria: HashMap<String, Vec<Box<dyn SubmissionCriterion>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the effect for `action`, replacing any earlier one.
    pub fn register<F>(&mut self, action: impl Into<String>, effect: F)
    where
        F: Fn(&mut Batch<'_>, &ActionParameters) -> ActionResult<()> + Send + Sync + 'static,
    {
        self.effects.insert(action.into(), Box::new(effect));
    }

    pub fn unregister(&mut self, action: &str) -> bool {
        self.effects.remove(action).is_some()
    }

    pub fn add_criterion(
        &mut self,
        action: impl Into<String>,
        criterion: impl SubmissionCriterion + 'static,
    ) {
        self.criteria
            .entry(action.into())
            .or_default()
            .push(Box::new(criterion));
    }

    pub fn effect(&self, action: &str) -> ActionResult<&ActionEffect> {
        self.effects
            .get(action)
            .ok_or_else(|| ActionError::ActionNotImplemented(action.to_string()))
    }

    pub fn is_implemented(&self, action: &str) -> bool {
        self.effects.contains_key(action)
    }

    /// Criteria for `action` in the order they were added.
    pub fn criteria(&self, action: &str) -> &[Box<dyn SubmissionCriterion>] {
        self.criteria.get(action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Implemented action names, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("effects", &self.actions())
            .field(
                "criteria",
                &self
                    .criteria
                    .iter()
                    .map(|(action, list)| (action, list.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}
