use std::collections::BTreeMap;

use crate::locator::{Locator, PrimaryKey};
use crate::rid::Rid;
use crate::value::PropertyValue;

/// A typed object.
///
/// Records are immutable once stored; modifications build a new record and
/// replace the old one under the same locator. The wire form (see
/// [`Record::to_json`]) flattens the properties next to the `__apiName`,
/// `__primaryKey`, and `__rid` fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub object_type: String,
    pub primary_key: PrimaryKey,
    pub rid: Rid,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Record {
    /// A new record with a freshly generated rid.
    pub fn new(
        object_type: impl Into<String>,
        primary_key: impl Into<PrimaryKey>,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self::with_rid(object_type, primary_key, Rid::object(), properties)
    }

    pub fn with_rid(
        object_type: impl Into<String>,
        primary_key: impl Into<PrimaryKey>,
        rid: Rid,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            primary_key: primary_key.into(),
            rid,
            properties,
        }
    }

    pub fn locator(&self) -> Locator {
        Locator::new(self.object_type.clone(), self.primary_key.clone())
    }

    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }

    /// Copy of this record with one property set.
    pub fn with_property(&self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let mut next = self.clone();
        next.properties.insert(name.into(), value.into());
        next
    }

    /// Copy of this record with one property removed.
    pub fn without_property(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.properties.remove(name);
        next
    }

    /// JSON rendering of the record, as returned by loads.
    ///
    /// `__primaryKey` carries the typed value of `primary_key_property`, so an
    /// integer key renders as a number. A record missing that property falls
    /// back to the canonical string.
    pub fn to_json(&self, primary_key_property: &str) -> serde_json::Value {
        let primary_key = self
            .get(primary_key_property)
            .map(PropertyValue::to_json)
            .unwrap_or_else(|| self.primary_key.as_str().into());
        let mut map = serde_json::Map::new();
        map.insert("__apiName".into(), self.object_type.clone().into());
        map.insert("__primaryKey".into(), primary_key);
        map.insert("__rid".into(), self.rid.as_str().into());
        for (name, value) in &self.properties {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn employee() -> Record {
        let mut props = BTreeMap::new();
        props.insert("id".to_string(), PropertyValue::Integer(7));
        props.insert("name".to_string(), PropertyValue::from("Ann"));
        Record::with_rid("Employee", "7", Rid::from("ri.test.main.object.7"), props)
    }

    #[test]
    fn locator_combines_type_and_key() {
        assert_eq!(employee().locator(), Locator::new("Employee", "7"));
    }

    #[test]
    fn with_property_leaves_original_untouched() {
        let original = employee();
        let updated = original.with_property("name", "Bea");
        assert_eq!(original.get("name"), Some(&PropertyValue::from("Ann")));
        assert_eq!(updated.get("name"), Some(&PropertyValue::from("Bea")));
        assert_eq!(updated.rid, original.rid);
        assert!(updated.without_property("name").get("name").is_none());
    }

    #[test]
    fn wire_form_is_flattened_with_typed_key() {
        let expected = json!({
            "__apiName": "Employee",
            "__primaryKey": 7,
            "__rid": "ri.test.main.object.7",
            "id": 7,
            "name": "Ann"
        });
        assert_eq!(employee().to_json("id"), expected);
    }

    #[test]
    fn missing_key_property_renders_canonical_string() {
        let json = employee().without_property("id").to_json("id");
        assert_eq!(json["__primaryKey"], json!("7"));
    }

    #[test]
    fn new_records_get_distinct_rids() {
        let a = Record::new("Employee", "1", BTreeMap::new());
        let b = Record::new("Employee", "1", BTreeMap::new());
        assert_ne!(a.rid, b.rid);
    }
}
