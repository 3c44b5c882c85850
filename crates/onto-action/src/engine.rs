//! The action engine: validation, effect dispatch, and edit reporting.

use std::fmt;

use onto_store::DataStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::batch::Batch;
use crate::criteria::{CriterionDecision, SubmissionCriterion};
use crate::edits::ActionEdits;
use crate::error::{ActionError, ActionResult};
use crate::params::ActionParameters;
use crate::registry::ActionRegistry;
use crate::validation::{validate_parameters, ValidationResponse};

// ---------------------------------------------------------------------------
// Request and response shapes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionMode {
    #[default]
    ValidateAndExecute,
    ValidateOnly,
}

/// Which edits a committed action reports.
///
/// A single apply reports the full log for `All` and `AllV2WithDeletions`
/// alike. A batch apply never reports delete edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnEdits {
    None,
    All,
    #[serde(rename = "ALL_V2_WITH_DELETIONS")]
    AllV2WithDeletions,
}

/// Options of a single apply. Absent fields stay `None` on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyActionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ActionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_edits: Option<ReturnEdits>,
}

impl ApplyActionOptions {
    pub fn mode(&self) -> ActionMode {
        self.mode.unwrap_or_default()
    }

    /// Edits come back only when the caller explicitly asked to execute and
    /// to see them.
    fn reports_edits(&self) -> bool {
        self.mode == Some(ActionMode::ValidateAndExecute)
            && matches!(
                self.return_edits,
                Some(ReturnEdits::All | ReturnEdits::AllV2WithDeletions)
            )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyActionRequest {
    pub parameters: ActionParameters,
    #[serde(default)]
    pub options: ApplyActionOptions,
}

impl ApplyActionRequest {
    pub fn new(parameters: ActionParameters) -> Self {
        Self {
            parameters,
            options: ApplyActionOptions::default(),
        }
    }

    pub fn validate_only(mut self) -> Self {
        self.options.mode = Some(ActionMode::ValidateOnly);
        self
    }

    /// Ask for edits. Also pins the mode to `ValidateAndExecute` unless one
    /// was already chosen.
    pub fn return_edits(mut self, return_edits: ReturnEdits) -> Self {
        self.options.mode.get_or_insert(ActionMode::ValidateAndExecute);
        self.options.return_edits = Some(return_edits);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyActionResponse {
    pub validation: ValidationResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<ActionEdits>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchApplyActionItem {
    pub parameters: ActionParameters,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchApplyActionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_edits: Option<ReturnEdits>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchApplyActionRequest {
    pub requests: Vec<BatchApplyActionItem>,
    #[serde(default)]
    pub options: BatchApplyActionOptions,
}

impl BatchApplyActionRequest {
    pub fn new(parameters: impl IntoIterator<Item = ActionParameters>) -> Self {
        Self {
            requests: parameters
                .into_iter()
                .map(|parameters| BatchApplyActionItem { parameters })
                .collect(),
            options: BatchApplyActionOptions::default(),
        }
    }

    pub fn return_edits(mut self, return_edits: ReturnEdits) -> Self {
        self.options.return_edits = Some(return_edits);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchApplyActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<ActionEdits>,
}

// ---------------------------------------------------------------------------
// ActionPhase
// ---------------------------------------------------------------------------

/// Where an invocation ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionPhase {
    Validating,
    Rejected,
    Applying,
    Committed,
    Failed,
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::Applying => "applying",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ActionEngine
// ---------------------------------------------------------------------------

/// Validates and applies actions against a store.
///
/// Every invocation moves `Validating -> Rejected` or
/// `Validating -> Applying -> {Committed, Failed}`. The engine holds no store
/// of its own; callers pass the store they want mutated.
#[derive(Debug, Default)]
pub struct ActionEngine {
    registry: ActionRegistry,
}

impl ActionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: ActionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn register<F>(&mut self, action: impl Into<String>, effect: F)
    where
        F: Fn(&mut Batch<'_>, &ActionParameters) -> ActionResult<()> + Send + Sync + 'static,
    {
        self.registry.register(action, effect);
    }

    pub fn add_criterion(
        &mut self,
        action: impl Into<String>,
        criterion: impl SubmissionCriterion + 'static,
    ) {
        self.registry.add_criterion(action, criterion);
    }

    /// Check parameters and run every submission criterion.
    ///
    /// Fails only when the action type is unknown or a criterion itself
    /// errors; an invalid request is reported in the response.
    pub fn validate_action(
        &self,
        store: &DataStore,
        action: &str,
        params: &ActionParameters,
    ) -> ActionResult<ValidationResponse> {
        let def = store.ontology().action_type(action)?;
        let mut response = validate_parameters(def, params, store);
        for criterion in self.registry.criteria(action) {
            let failure = match criterion.evaluate(params, store)? {
                CriterionDecision::Pass => None,
                CriterionDecision::Fail { reason } => Some(reason),
            };
            debug!(action, criterion = criterion.name(), passed = failure.is_none(), "criterion evaluated");
            response.record_criterion(criterion.name(), failure);
        }
        Ok(response)
    }

    /// Validate one request and, if valid, run its effect.
    pub fn apply_action(
        &self,
        store: &mut DataStore,
        action: &str,
        request: &ApplyActionRequest,
    ) -> ActionResult<ApplyActionResponse> {
        let span = info_span!("apply_action", action);
        let _guard = span.enter();

        let effect = self.registry.effect(action)?;
        debug!(phase = %ActionPhase::Validating, "validating");
        let validation = self.validate_action(store, action, &request.parameters)?;
        if !validation.is_valid() {
            info!(phase = %ActionPhase::Rejected, failures = ?validation.failures(), "action rejected");
            return Ok(ApplyActionResponse {
                validation,
                edits: None,
            });
        }
        if request.options.mode() == ActionMode::ValidateOnly {
            return Ok(ApplyActionResponse {
                validation,
                edits: None,
            });
        }

        debug!(phase = %ActionPhase::Applying, "applying");
        let mut batch = Batch::new(store);
        if let Err(e) = effect(&mut batch, &request.parameters) {
            warn!(phase = %ActionPhase::Failed, edits = batch.edits().len(), error = %e, "effect failed");
            return Err(ActionError::EffectFailed {
                action: action.to_string(),
                source: Box::new(e),
            });
        }

        let edits = ActionEdits::from_log(batch.into_edits());
        info!(phase = %ActionPhase::Committed, edits = edits.edits.len(), "action committed");
        Ok(ApplyActionResponse {
            validation,
            edits: request.options.reports_edits().then_some(edits),
        })
    }

    /// Validate every request, then run all effects in order on one batch.
    ///
    /// Any invalid request fails the whole call before any effect runs.
    pub fn batch_apply_action(
        &self,
        store: &mut DataStore,
        action: &str,
        request: &BatchApplyActionRequest,
    ) -> ActionResult<BatchApplyActionResponse> {
        let span = info_span!("batch_apply_action", action, size = request.requests.len());
        let _guard = span.enter();

        let effect = self.registry.effect(action)?;
        for (index, item) in request.requests.iter().enumerate() {
            let validation = self.validate_action(store, action, &item.parameters)?;
            if !validation.is_valid() {
                info!(phase = %ActionPhase::Rejected, index, failures = ?validation.failures(), "batch rejected");
                return Err(ActionError::ActionValidationFailed {
                    action: action.to_string(),
                    index,
                });
            }
        }

        let mut batch = Batch::new(store);
        for item in &request.requests {
            if let Err(e) = effect(&mut batch, &item.parameters) {
                warn!(phase = %ActionPhase::Failed, edits = batch.edits().len(), error = %e, "batch effect failed");
                return Err(ActionError::EffectFailed {
                    action: action.to_string(),
                    source: Box::new(e),
                });
            }
        }

        let edits = ActionEdits::from_log(batch.into_edits());
        info!(phase = %ActionPhase::Committed, edits = edits.edits.len(), "batch committed");
        let edits = match request.options.return_edits {
            Some(ReturnEdits::None) => None,
            _ => Some(edits.without_deletions()),
        };
        Ok(BatchApplyActionResponse { edits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{FnCriterion, ParameterNotEmpty};
    use crate::edits::ObjectEdit;
    use crate::validation::ValidationResult;
    use onto_schema::{ActionTypeDef, ObjectTypeDef, Ontology, ParameterDef, ParameterType};
    use onto_types::{Locator, PropertyType, PropertyValue};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn ontology() -> Arc<Ontology> {
        Arc::new(
            Ontology::build(
                [ObjectTypeDef::new("Office", "officeId", PropertyType::String)
                    .with_property("address", PropertyType::String)],
                [],
                [
                    ActionTypeDef::new("moveOffice")
                        .with_parameter("officeId", ParameterDef::required(ParameterType::object("Office")))
                        .with_parameter("newAddress", ParameterDef::required(ParameterType::String)),
                    ActionTypeDef::new("openOffice")
                        .with_parameter("officeId", ParameterDef::required(ParameterType::String)),
                    ActionTypeDef::new("closeOffice")
                        .with_parameter("officeId", ParameterDef::required(ParameterType::object("Office"))),
                ],
            )
            .unwrap(),
        )
    }

    fn store() -> DataStore {
        let mut store = DataStore::new(ontology());
        let office = store
            .record_from_json(
                "Office",
                json!({"officeId": "O1", "address": "1 St"}).as_object().unwrap(),
                None,
            )
            .unwrap();
        store.register_object(office).unwrap();
        store
    }

    fn engine() -> ActionEngine {
        let mut engine = ActionEngine::new();
        engine.register("moveOffice", |batch, params| {
            let office = params.locator("officeId", "Office")?;
            batch.modify_object(&office, &obj(json!({"address": params.string("newAddress")?})))?;
            Ok(())
        });
        engine.add_criterion("moveOffice", ParameterNotEmpty::new("newAddress"));
        engine.register("openOffice", |batch, params| {
            batch.create_object("Office", &obj(json!({"officeId": params.string("officeId")?})))?;
            Ok(())
        });
        engine.register("closeOffice", |batch, params| {
            batch.delete_object(&params.locator("officeId", "Office")?)
        });
        engine
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn params(value: Value) -> ActionParameters {
        serde_json::from_value(value).unwrap()
    }

    fn address(store: &DataStore, pk: &str) -> Option<PropertyValue> {
        store
            .get_object(&Locator::new("Office", pk))
            .and_then(|r| r.get("address").cloned())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn empty_address_is_rejected_and_store_unchanged() {
        let mut store = store();
        let request = ApplyActionRequest::new(params(json!({"officeId": "O1", "newAddress": ""})));
        let response = engine().apply_action(&mut store, "moveOffice", &request).unwrap();

        assert_eq!(response.validation.result, ValidationResult::Invalid);
        assert_eq!(response.validation.failures(), vec!["newAddress"]);
        assert!(response.edits.is_none());
        assert_eq!(address(&store, "O1"), Some(PropertyValue::from("1 St")));
    }

    #[test]
    fn all_failures_are_collected() {
        let mut engine = engine();
        engine.add_criterion(
            "moveOffice",
            FnCriterion::new("notSameAddress", |params, store| {
                let office = store.get_object(&params.locator("officeId", "Office")?);
                let current = office.and_then(|r| r.get("address")).and_then(|v| v.as_str());
                Ok(if current == params.get("newAddress").and_then(|v| v.as_str()) {
                    CriterionDecision::fail("address unchanged")
                } else {
                    CriterionDecision::Pass
                })
            }),
        );
        let response = engine
            .validate_action(&store(), "moveOffice", &params(json!({"officeId": "O9", "newAddress": ""})))
            .unwrap();
        assert_eq!(response.failures(), vec!["officeId", "newAddress"]);
        assert_eq!(response.submission_criteria.len(), 2);
        assert_eq!(response.submission_criteria[1].result, ValidationResult::Valid);
    }

    #[test]
    fn unknown_action_type_is_an_error() {
        let err = engine()
            .validate_action(&store(), "fireEveryone", &ActionParameters::new())
            .unwrap_err();
        assert!(matches!(err, ActionError::Schema(_)));
    }

    #[test]
    fn declared_action_without_effect_is_not_implemented() {
        let mut store = store();
        let engine = ActionEngine::new();
        let request = ApplyActionRequest::new(params(json!({"officeId": "O1", "newAddress": "x"})));
        assert_eq!(
            engine.apply_action(&mut store, "moveOffice", &request).unwrap_err(),
            ActionError::ActionNotImplemented("moveOffice".into())
        );
    }

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    #[test]
    fn valid_request_commits_and_reports_edits() {
        let mut store = store();
        let request = ApplyActionRequest::new(params(json!({"officeId": "O1", "newAddress": "5 Ave"})))
            .return_edits(ReturnEdits::All);
        let response = engine().apply_action(&mut store, "moveOffice", &request).unwrap();

        assert!(response.validation.is_valid());
        let edits = response.edits.unwrap();
        assert_eq!(edits.modified_objects_count, 1);
        assert!(matches!(edits.edits[0], ObjectEdit::ModifyObject { .. }));
        assert_eq!(address(&store, "O1"), Some(PropertyValue::from("5 Ave")));
    }

    #[test]
    fn validate_only_runs_no_effect() {
        let mut store = store();
        let request = ApplyActionRequest::new(params(json!({"officeId": "O1", "newAddress": "5 Ave"})))
            .validate_only();
        let response = engine().apply_action(&mut store, "moveOffice", &request).unwrap();
        assert!(response.validation.is_valid());
        assert!(response.edits.is_none());
        assert_eq!(address(&store, "O1"), Some(PropertyValue::from("1 St")));
    }

    #[test]
    fn single_apply_reports_edits_only_when_asked() {
        let request = ApplyActionRequest::new(params(json!({"officeId": "O1"})));

        let mut bare_store = store();
        let bare = engine().apply_action(&mut bare_store, "closeOffice", &request).unwrap();
        assert!(bare.edits.is_none());
        assert!(bare_store.get_object(&Locator::new("Office", "O1")).is_none());

        // A mode left unset executes but reports nothing.
        let mut unset_store = store();
        let mut unset = request.clone();
        unset.options.return_edits = Some(ReturnEdits::All);
        let response = engine().apply_action(&mut unset_store, "closeOffice", &unset).unwrap();
        assert!(response.edits.is_none());

        for return_edits in [ReturnEdits::All, ReturnEdits::AllV2WithDeletions] {
            let mut full_store = store();
            let full = engine()
                .apply_action(&mut full_store, "closeOffice", &request.clone().return_edits(return_edits))
                .unwrap();
            let edits = full.edits.unwrap();
            assert!(matches!(edits.edits[..], [ObjectEdit::DeleteObject { .. }]));
            assert_eq!(edits.deleted_objects_count, 1);
        }

        let mut quiet_store = store();
        let quiet = engine()
            .apply_action(&mut quiet_store, "closeOffice", &request.return_edits(ReturnEdits::None))
            .unwrap();
        assert!(quiet.edits.is_none());
        assert!(quiet_store.get_object(&Locator::new("Office", "O1")).is_none());
    }

    #[test]
    fn batch_apply_never_reports_deletions() {
        let request = BatchApplyActionRequest::new([params(json!({"officeId": "O1"}))]);

        for return_edits in [None, Some(ReturnEdits::All), Some(ReturnEdits::AllV2WithDeletions)] {
            let mut store = store();
            let mut request = request.clone();
            request.options.return_edits = return_edits;
            let edits = engine()
                .batch_apply_action(&mut store, "closeOffice", &request)
                .unwrap()
                .edits
                .unwrap();
            assert!(edits.edits.is_empty());
            assert_eq!(edits.deleted_objects_count, 1);
        }

        let mut store = store();
        let quiet = engine()
            .batch_apply_action(&mut store, "closeOffice", &request.return_edits(ReturnEdits::None))
            .unwrap();
        assert!(quiet.edits.is_none());
    }

    #[test]
    fn effect_failure_keeps_earlier_writes() {
        let mut store = store();
        let mut engine = engine();
        engine.register("openOffice", |batch, params| {
            batch.create_object("Office", &obj(json!({"officeId": params.string("officeId")?})))?;
            Err(ActionError::invalid_parameter("officeId", "quota exceeded"))
        });
        let request = ApplyActionRequest::new(params(json!({"officeId": "O2"})));
        let err = engine.apply_action(&mut store, "openOffice", &request).unwrap_err();

        assert!(matches!(err, ActionError::EffectFailed { ref action, .. } if action == "openOffice"));
        assert!(store.get_object(&Locator::new("Office", "O2")).is_some());
    }

    // -----------------------------------------------------------------------
    // Batch apply
    // -----------------------------------------------------------------------

    #[test]
    fn batch_runs_sequentially_on_one_log() {
        let mut store = store();
        let request = BatchApplyActionRequest::new([
            params(json!({"officeId": "O2"})),
            params(json!({"officeId": "O3"})),
        ]);
        let response = engine().batch_apply_action(&mut store, "openOffice", &request).unwrap();
        let edits = response.edits.unwrap();
        assert_eq!(edits.added_object_count, 2);
        assert_eq!(store.objects().len(), 3);
    }

    #[test]
    fn later_batch_items_see_earlier_writes() {
        let mut store = store();
        let mut engine = engine();
        engine.register("openOffice", |batch, params| {
            let pk = params.string("officeId")?;
            if batch.get_object(&Locator::new("Office", pk)).is_some() {
                return Err(ActionError::invalid_parameter("officeId", "already open"));
            }
            batch.create_object("Office", &obj(json!({"officeId": pk})))?;
            Ok(())
        });
        let request = BatchApplyActionRequest::new([
            params(json!({"officeId": "O2"})),
            params(json!({"officeId": "O2"})),
        ]);
        let err = engine.batch_apply_action(&mut store, "openOffice", &request).unwrap_err();
        assert!(matches!(err, ActionError::EffectFailed { .. }));
        assert_eq!(store.objects().len(), 2);
    }

    #[test]
    fn invalid_batch_item_stops_everything() {
        let mut store = store();
        let request = BatchApplyActionRequest::new([
            params(json!({"officeId": "O1", "newAddress": "5 Ave"})),
            params(json!({"officeId": "O1", "newAddress": ""})),
        ]);
        let err = engine().batch_apply_action(&mut store, "moveOffice", &request).unwrap_err();
        assert_eq!(
            err,
            ActionError::ActionValidationFailed {
                action: "moveOffice".into(),
                index: 1
            }
        );
        assert_eq!(address(&store, "O1"), Some(PropertyValue::from("1 St")));
    }

    #[test]
    fn request_wire_shape() {
        let request: ApplyActionRequest = serde_json::from_value(json!({
            "parameters": {"officeId": "O1"},
            "options": {"mode": "VALIDATE_ONLY", "returnEdits": "ALL_V2_WITH_DELETIONS"}
        }))
        .unwrap();
        assert_eq!(request.options.mode, Some(ActionMode::ValidateOnly));
        assert_eq!(request.options.return_edits, Some(ReturnEdits::AllV2WithDeletions));

        let bare: ApplyActionRequest =
            serde_json::from_value(json!({"parameters": {}})).unwrap();
        assert_eq!(bare.options, ApplyActionOptions::default());
    }
}
