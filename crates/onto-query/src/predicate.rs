//! Filter predicates over record properties.
//!
//! Literals arrive as JSON and are converted with the declared type of the
//! property on the record being tested, so `"2024-01-01"` compares as a date
//! against a `date` column and as a string against a `string` column.

use std::cmp::Ordering;

use onto_schema::ObjectTypeDef;
use onto_types::{PropertyType, PropertyValue, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryError, QueryResult};

/// A boolean expression evaluated against one record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    Eq { field: String, value: Value },
    Gt { field: String, value: Value },
    Gte { field: String, value: Value },
    Lt { field: String, value: Value },
    Lte { field: String, value: Value },
    /// Property equals any of the listed literals.
    In { field: String, value: Vec<Value> },
    /// `value: true` matches absent properties, `false` present ones.
    IsNull { field: String, value: bool },
    /// Array property holds an element equal to the literal.
    Contains { field: String, value: Value },
    StartsWith { field: String, value: String },
    ContainsAnyTerm { field: String, value: String },
    ContainsAllTerms { field: String, value: String },
    ContainsAllTermsInOrder { field: String, value: String },
    And { value: Vec<Predicate> },
    Or { value: Vec<Predicate> },
    Not { value: Box<Predicate> },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq { field: field.into(), value: value.into() }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt { field: field.into(), value: value.into() }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte { field: field.into(), value: value.into() }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt { field: field.into(), value: value.into() }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte { field: field.into(), value: value.into() }
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            field: field.into(),
            value: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull { field: field.into(), value: true }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::IsNull { field: field.into(), value: false }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains { field: field.into(), value: value.into() }
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith { field: field.into(), value: prefix.into() }
    }

    pub fn contains_any_term(field: impl Into<String>, terms: impl Into<String>) -> Self {
        Self::ContainsAnyTerm { field: field.into(), value: terms.into() }
    }

    pub fn contains_all_terms(field: impl Into<String>, terms: impl Into<String>) -> Self {
        Self::ContainsAllTerms { field: field.into(), value: terms.into() }
    }

    pub fn contains_all_terms_in_order(field: impl Into<String>, terms: impl Into<String>) -> Self {
        Self::ContainsAllTermsInOrder { field: field.into(), value: terms.into() }
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::And { value: predicates.into_iter().collect() }
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or { value: predicates.into_iter().collect() }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        Self::Not { value: Box::new(predicate) }
    }

    /// Test `record`, whose object type is `def`.
    ///
    /// Undeclared properties read as absent. Literals that cannot be
    /// converted to the property's type are an error, not a mismatch.
    pub fn matches(&self, record: &Record, def: &ObjectTypeDef) -> QueryResult<bool> {
        match self {
            Self::Eq { field, value } => {
                compare_with(record, def, field, value, |o| o == Ordering::Equal, true)
            }
            Self::Gt { field, value } => {
                compare_with(record, def, field, value, |o| o == Ordering::Greater, false)
            }
            Self::Gte { field, value } => {
                compare_with(record, def, field, value, |o| o != Ordering::Less, true)
            }
            Self::Lt { field, value } => {
                compare_with(record, def, field, value, |o| o == Ordering::Less, false)
            }
            Self::Lte { field, value } => {
                compare_with(record, def, field, value, |o| o != Ordering::Greater, true)
            }
            Self::In { field, value } => {
                let Some((actual, ty)) = lookup(record, def, field) else {
                    return Ok(false);
                };
                for literal in value {
                    if actual.same_value(&literal_value(field, literal, ty)?) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::IsNull { field, value } => {
                Ok(lookup(record, def, field).is_none() == *value)
            }
            Self::Contains { field, value } => {
                let Some((actual, ty)) = lookup(record, def, field) else {
                    return Ok(false);
                };
                let (Some(items), Some(element)) = (actual.as_array(), ty.element_type()) else {
                    return Ok(false);
                };
                let needle = literal_value(field, value, element)?;
                Ok(items.iter().any(|item| item.same_value(&needle)))
            }
            Self::StartsWith { field, value } => Ok(text(record, def, field)
                .is_some_and(|s| s.to_lowercase().starts_with(&value.to_lowercase()))),
            Self::ContainsAnyTerm { field, value } => Ok(text(record, def, field)
                .is_some_and(|s| {
                    let haystack = s.to_lowercase();
                    terms(value).iter().any(|term| haystack.contains(term.as_str()))
                })),
            Self::ContainsAllTerms { field, value } => Ok(text(record, def, field)
                .is_some_and(|s| {
                    let haystack = s.to_lowercase();
                    terms(value).iter().all(|term| haystack.contains(term.as_str()))
                })),
            Self::ContainsAllTermsInOrder { field, value } => Ok(text(record, def, field)
                .is_some_and(|s| terms_in_order(&s.to_lowercase(), &terms(value)))),
            Self::And { value } => {
                for predicate in value {
                    if !predicate.matches(record, def)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or { value } => {
                for predicate in value {
                    if predicate.matches(record, def)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { value } => value.matches(record, def).map(|m| !m),
        }
    }
}

/// The record's value for `field` together with its declared type.
fn lookup<'r>(
    record: &'r Record,
    def: &'r ObjectTypeDef,
    field: &str,
) -> Option<(&'r PropertyValue, &'r PropertyType)> {
    let ty = def.property_type(field)?;
    record.get(field).map(|value| (value, ty))
}

fn text<'r>(record: &'r Record, def: &'r ObjectTypeDef, field: &str) -> Option<&'r str> {
    lookup(record, def, field).and_then(|(value, _)| value.as_str())
}

fn literal_value(field: &str, literal: &Value, ty: &PropertyType) -> QueryResult<PropertyValue> {
    PropertyValue::from_json(literal, ty).map_err(|e| QueryError::InvalidPropertyValue {
        property: field.to_string(),
        reason: e.to_string(),
    })
}

/// Compare the record's value with a literal. Arrays and media references
/// have no ordering and only satisfy equality tests (`eq_ok`).
fn compare_with(
    record: &Record,
    def: &ObjectTypeDef,
    field: &str,
    literal: &Value,
    accept: impl Fn(Ordering) -> bool,
    eq_ok: bool,
) -> QueryResult<bool> {
    let Some((actual, ty)) = lookup(record, def, field) else {
        return Ok(false);
    };
    let expected = literal_value(field, literal, ty)?;
    Ok(match actual.compare(&expected) {
        Some(ordering) => accept(ordering),
        None => eq_ok && actual == &expected,
    })
}

fn terms(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn terms_in_order(haystack: &str, terms: &[String]) -> bool {
    let mut from = 0;
    for term in terms {
        match haystack[from..].find(term.as_str()) {
            Some(at) => from += at + term.len(),
            None => return false,
        }
    }
    true
}
