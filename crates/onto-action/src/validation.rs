//! Parameter validation for action requests.

use std::collections::BTreeMap;

use onto_schema::{ActionTypeDef, ParameterType};
use onto_store::DataStore;
use onto_types::{Locator, PrimaryKey, PropertyType, PropertyValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::ActionParameters;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationResult {
    Valid,
    Invalid,
}

/// Why one parameter was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterEvaluation {
    pub result: ValidationResult,
    /// Constraints that failed beyond the type check, e.g. `objectExists`.
    pub evaluated_constraints: Vec<String>,
    pub required: bool,
}

/// Outcome of one submission criterion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionEvaluation {
    pub name: String,
    pub result: ValidationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Full validation outcome. Only failing parameters are listed; every
/// criterion that ran is listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub result: ValidationResult,
    pub parameters: BTreeMap<String, ParameterEvaluation>,
    pub submission_criteria: Vec<CriterionEvaluation>,
}

impl Default for ValidationResponse {
    fn default() -> Self {
        Self {
            result: ValidationResult::Valid,
            parameters: BTreeMap::new(),
            submission_criteria: Vec::new(),
        }
    }
}

impl ValidationResponse {
    pub fn is_valid(&self) -> bool {
        self.result == ValidationResult::Valid
    }

    /// Names of failing parameters and criteria.
    pub fn failures(&self) -> Vec<&str> {
        let params = self
            .parameters
            .iter()
            .filter(|(_, e)| e.result == ValidationResult::Invalid)
            .map(|(name, _)| name.as_str());
        let criteria = self
            .submission_criteria
            .iter()
            .filter(|c| c.result == ValidationResult::Invalid)
            .map(|c| c.name.as_str());
        params.chain(criteria).collect()
    }

    fn reject_parameter(&mut self, name: &str, required: bool, constraints: Vec<String>) {
        self.result = ValidationResult::Invalid;
        self.parameters.insert(
            name.to_string(),
            ParameterEvaluation {
                result: ValidationResult::Invalid,
                evaluated_constraints: constraints,
                required,
            },
        );
    }

    pub(crate) fn record_criterion(&mut self, name: &str, failure: Option<String>) {
        let result = if failure.is_some() {
            self.result = ValidationResult::Invalid;
            ValidationResult::Invalid
        } else {
            ValidationResult::Valid
        };
        self.submission_criteria.push(CriterionEvaluation {
            name: name.to_string(),
            result,
            reason: failure,
        });
    }
}

/// Check every declared parameter of `def` against `params`.
///
/// Undeclared parameters are ignored.
pub fn validate_parameters(
    def: &ActionTypeDef,
    params: &ActionParameters,
    store: &DataStore,
) -> ValidationResponse {
    let mut response = ValidationResponse::default();
    for (name, param) in &def.parameters {
        match params.get(name) {
            None if param.required => response.reject_parameter(name, true, Vec::new()),
            None => {}
            Some(value) => {
                if let Err(constraints) = check_value(&param.data_type, value, store) {
                    response.reject_parameter(name, param.required, constraints);
                }
            }
        }
    }
    response
}

/// `Err` carries the names of failed constraints beyond the type check.
fn check_value(ty: &ParameterType, value: &Value, store: &DataStore) -> Result<(), Vec<String>> {
    match ty {
        ParameterType::Array { sub_type } => {
            let items = value.as_array().ok_or_else(Vec::new)?;
            items
                .iter()
                .try_for_each(|item| check_value(sub_type, item, store))
        }
        ParameterType::Object { object_type } => {
            let primary_key = PrimaryKey::from_json(value).map_err(|_| Vec::new())?;
            if store.get_object(&Locator::new(object_type.clone(), primary_key)).is_none() {
                return Err(vec!["objectExists".to_string()]);
            }
            Ok(())
        }
        ParameterType::ObjectType => match value.as_str() {
            Some(name) if store.ontology().has_object_type(name) => Ok(()),
            Some(_) => Err(vec!["objectTypeExists".to_string()]),
            None => Err(Vec::new()),
        },
        scalar => {
            let property_type = scalar_property_type(scalar).ok_or_else(Vec::new)?;
            PropertyValue::from_json(value, &property_type)
                .map(drop)
                .map_err(|_| Vec::new())
        }
    }
}

fn scalar_property_type(ty: &ParameterType) -> Option<PropertyType> {
    Some(match ty {
        ParameterType::Boolean => PropertyType::Boolean,
        ParameterType::String => PropertyType::String,
        ParameterType::Integer => PropertyType::Integer,
        ParameterType::Long => PropertyType::Long,
        ParameterType::Double => PropertyType::Double,
        ParameterType::Date => PropertyType::Date,
        ParameterType::Timestamp => PropertyType::Timestamp,
        ParameterType::Attachment => PropertyType::Attachment,
        ParameterType::MediaReference => PropertyType::MediaReference,
        ParameterType::Object { .. } | ParameterType::ObjectType | ParameterType::Array { .. } => {
            return None
        }
    })
}
