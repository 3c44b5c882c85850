//! Property-level security markings kept beside records.
//!
//! A secured object carries a table of [`PropertySecurities`] and, for each
//! governed property, the index of the entry that applies to it. Loads that
//! ask for securities render governed properties as
//! `{"value": ..., "propertySecurityIndex": n}`.

use std::collections::{BTreeMap, HashMap};

use onto_types::{Locator, Record};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One policy outcome for a property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropertySecurity {
    /// Markings a reader must hold: all of `conjunctive`, and at least one
    /// marking from each group in `disjunctive`.
    PropertyMarkingSummary {
        #[serde(default)]
        conjunctive: Vec<String>,
        #[serde(default)]
        disjunctive: Vec<Vec<String>>,
    },
    UnsupportedPolicy,
    ErrorComputingSecurity,
}

/// Alternatives: satisfying any one grants access to the value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySecurities {
    pub disjunction: Vec<PropertySecurity>,
}

impl PropertySecurities {
    pub fn single(security: PropertySecurity) -> Self {
        Self {
            disjunction: vec![security],
        }
    }
}

/// The securities of one object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectSecurities {
    pub securities: Vec<PropertySecurities>,
    /// Property name to index into `securities`.
    pub properties: BTreeMap<String, usize>,
}

impl ObjectSecurities {
    pub fn new(securities: Vec<PropertySecurities>) -> Self {
        Self {
            securities,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>, index: usize) -> Self {
        self.properties.insert(property.into(), index);
        self
    }

    pub fn index_of(&self, property: &str) -> Option<usize> {
        self.properties.get(property).copied()
    }

    /// Wire rendering of `record` with every governed property wrapped.
    pub fn render(&self, record: &Record, primary_key_property: &str) -> Value {
        let mut rendered = record.to_json(primary_key_property);
        if let Value::Object(map) = &mut rendered {
            for (property, index) in &self.properties {
                if let Some(value) = map.get_mut(property) {
                    let plain = value.take();
                    *value = json!({ "value": plain, "propertySecurityIndex": index });
                }
            }
        }
        rendered
    }
}

/// Securities keyed by the locator of the object they belong to.
#[derive(Debug, Default)]
pub struct SecurityStore {
    by_object: HashMap<Locator, ObjectSecurities>,
}

impl SecurityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, locator: Locator, securities: ObjectSecurities) {
        self.by_object.insert(locator, securities);
    }

    pub fn get(&self, locator: &Locator) -> Option<&ObjectSecurities> {
        self.by_object.get(locator)
    }

    pub fn remove(&mut self, locator: &Locator) -> Option<ObjectSecurities> {
        self.by_object.remove(locator)
    }

    pub fn clear(&mut self) {
        self.by_object.clear();
    }
}
