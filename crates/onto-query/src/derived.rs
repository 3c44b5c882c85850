//! Derived properties for `withProperties` object sets.

use std::sync::Arc;

use onto_types::{PropertyValue, Record};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::object_set::ObjectSet;

/// A property computed per record when a `withProperties` set is evaluated.
///
/// The object set inside a selection is evaluated once per record, with
/// `methodInput` bound to that record:
///
/// ```json
/// { "type": "selection",
///   "objectSet": { "type": "searchAround",
///                  "objectSet": { "type": "methodInput" },
///                  "link": "peeps" },
///   "operation": { "type": "count" } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DerivedProperty {
    #[serde(rename_all = "camelCase")]
    Selection {
        object_set: ObjectSet,
        operation: SelectionOperation,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SelectionOperation {
    /// The property of the single selected record.
    #[serde(rename_all = "camelCase")]
    Get { selected_property_api_name: String },
    /// The property of every selected record, in order.
    #[serde(rename_all = "camelCase")]
    CollectList { selected_property_api_name: String },
    /// Like `collectList`, keeping the first occurrence of each value.
    #[serde(rename_all = "camelCase")]
    CollectSet { selected_property_api_name: String },
    /// Number of selected records, as a decimal string.
    Count,
}

impl DerivedProperty {
    pub fn get(object_set: ObjectSet, property: impl Into<String>) -> Self {
        Self::selection(object_set, SelectionOperation::Get {
            selected_property_api_name: property.into(),
        })
    }

    pub fn collect_list(object_set: ObjectSet, property: impl Into<String>) -> Self {
        Self::selection(object_set, SelectionOperation::CollectList {
            selected_property_api_name: property.into(),
        })
    }

    pub fn collect_set(object_set: ObjectSet, property: impl Into<String>) -> Self {
        Self::selection(object_set, SelectionOperation::CollectSet {
            selected_property_api_name: property.into(),
        })
    }

    pub fn count(object_set: ObjectSet) -> Self {
        Self::selection(object_set, SelectionOperation::Count)
    }

    fn selection(object_set: ObjectSet, operation: SelectionOperation) -> Self {
        Self::Selection { object_set, operation }
    }
}

impl SelectionOperation {
    /// Reduce the selected records to the value of derived property `name`.
    /// `None` leaves the property absent.
    pub fn apply(&self, name: &str, selected: &[Arc<Record>]) -> QueryResult<Option<PropertyValue>> {
        match self {
            Self::Get { selected_property_api_name } => match selected {
                [] => Ok(None),
                [one] => Ok(one.get(selected_property_api_name).cloned()),
                many => Err(QueryError::AmbiguousSelection {
                    property: name.to_string(),
                    count: many.len(),
                }),
            },
            Self::CollectList { selected_property_api_name } => Ok(Some(PropertyValue::Array(
                selected
                    .iter()
                    .filter_map(|record| record.get(selected_property_api_name).cloned())
                    .collect(),
            ))),
            Self::CollectSet { selected_property_api_name } => {
                let mut distinct: Vec<PropertyValue> = Vec::new();
                for value in selected.iter().filter_map(|r| r.get(selected_property_api_name)) {
                    if !distinct.contains(value) {
                        distinct.push(value.clone());
                    }
                }
                Ok(Some(PropertyValue::Array(distinct)))
            }
            Self::Count => Ok(Some(PropertyValue::String(selected.len().to_string()))),
        }
    }
}
