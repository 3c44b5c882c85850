use std::collections::BTreeMap;

use onto_types::Rid;
use serde::{Deserialize, Serialize};

use crate::derived::DerivedProperty;
use crate::predicate::Predicate;

/// A set-algebraic query over stored records.
///
/// Serialized internally tagged by `type`, in the platform's wire shape:
///
/// ```json
/// { "type": "searchAround",
///   "objectSet": { "type": "base", "objectType": "Employee" },
///   "link": "peeps" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectSet {
    /// Every record of one object type, in registration order.
    #[serde(rename_all = "camelCase")]
    Base { object_type: String },

    /// Records by rid. Unknown rids are skipped.
    Static { objects: Vec<Rid> },

    /// A saved object set, by id.
    Reference { reference: String },

    #[serde(rename_all = "camelCase")]
    Filter {
        object_set: Box<ObjectSet>,
        #[serde(rename = "where")]
        predicate: Predicate,
    },

    #[serde(rename_all = "camelCase")]
    Union { object_sets: Vec<ObjectSet> },

    #[serde(rename_all = "camelCase")]
    Intersect { object_sets: Vec<ObjectSet> },

    /// The first operand minus every later operand.
    #[serde(rename_all = "camelCase")]
    Subtract { object_sets: Vec<ObjectSet> },

    /// Follow `link` from every record of the inner set.
    #[serde(rename_all = "camelCase")]
    SearchAround { object_set: Box<ObjectSet>, link: String },

    /// The inner set with computed properties added to every record.
    #[serde(rename_all = "camelCase")]
    WithProperties {
        object_set: Box<ObjectSet>,
        derived_properties: BTreeMap<String, DerivedProperty>,
    },

    /// The record a derived property is computed for. Only valid inside a
    /// [`DerivedProperty`].
    MethodInput,

    /// The `num_neighbors` records whose numeric-array `property` lies
    /// closest to `query` by Euclidean distance, nearest first. Records
    /// without a vector of the query's length are skipped.
    #[serde(rename_all = "camelCase")]
    NearestNeighbors {
        object_set: Box<ObjectSet>,
        property: String,
        query: Vec<f64>,
        num_neighbors: usize,
    },
}

impl ObjectSet {
    pub fn base(object_type: impl Into<String>) -> Self {
        Self::Base { object_type: object_type.into() }
    }

    pub fn from_rids(rids: impl IntoIterator<Item = Rid>) -> Self {
        Self::Static { objects: rids.into_iter().collect() }
    }

    /// The set with no members.
    pub fn empty() -> Self {
        Self::Static { objects: Vec::new() }
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference { reference: id.into() }
    }

    pub fn union(sets: impl IntoIterator<Item = ObjectSet>) -> Self {
        Self::Union { object_sets: sets.into_iter().collect() }
    }

    pub fn intersect(sets: impl IntoIterator<Item = ObjectSet>) -> Self {
        Self::Intersect { object_sets: sets.into_iter().collect() }
    }

    pub fn subtract(sets: impl IntoIterator<Item = ObjectSet>) -> Self {
        Self::Subtract { object_sets: sets.into_iter().collect() }
    }

    pub fn filter(self, predicate: Predicate) -> Self {
        Self::Filter { object_set: Box::new(self), predicate }
    }

    pub fn search_around(self, link: impl Into<String>) -> Self {
        Self::SearchAround { object_set: Box::new(self), link: link.into() }
    }

    pub fn method_input() -> Self {
        Self::MethodInput
    }

    pub fn with_properties<S: Into<String>>(
        self,
        derived: impl IntoIterator<Item = (S, DerivedProperty)>,
    ) -> Self {
        Self::WithProperties {
            object_set: Box::new(self),
            derived_properties: derived.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn nearest_neighbors(
        self,
        property: impl Into<String>,
        query: Vec<f64>,
        num_neighbors: usize,
    ) -> Self {
        Self::NearestNeighbors {
            object_set: Box::new(self),
            property: property.into(),
            query,
            num_neighbors,
        }
    }
}
