use std::collections::BTreeMap;

use onto_types::{Locator, PrimaryKey, PropertyType, PropertyValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ActionError, ActionResult};

/// Parameter values of one action request, as JSON literals.
///
/// `null` is treated the same as an absent parameter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParameters(BTreeMap<String, Value>);

impl ActionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// The parameter's value, unless absent or `null`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn required(&self, name: &str) -> ActionResult<&Value> {
        self.get(name)
            .ok_or_else(|| ActionError::invalid_parameter(name, "missing"))
    }

    pub fn string(&self, name: &str) -> ActionResult<&str> {
        self.required(name)?
            .as_str()
            .ok_or_else(|| ActionError::invalid_parameter(name, "expected a string"))
    }

    pub fn integer(&self, name: &str) -> ActionResult<i64> {
        let value = self.required(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| ActionError::invalid_parameter(name, "expected an integer"))
    }

    pub fn double(&self, name: &str) -> ActionResult<f64> {
        self.required(name)?
            .as_f64()
            .ok_or_else(|| ActionError::invalid_parameter(name, "expected a number"))
    }

    pub fn boolean(&self, name: &str) -> ActionResult<bool> {
        self.required(name)?
            .as_bool()
            .ok_or_else(|| ActionError::invalid_parameter(name, "expected a boolean"))
    }

    /// Locator for an object parameter, whose value is the primary key.
    pub fn locator(&self, name: &str, object_type: &str) -> ActionResult<Locator> {
        let primary_key = PrimaryKey::from_json(self.required(name)?)
            .map_err(|e| ActionError::invalid_parameter(name, e.to_string()))?;
        Ok(Locator::new(object_type, primary_key))
    }

    /// The parameter converted to a typed property value.
    pub fn property_value(&self, name: &str, ty: &PropertyType) -> ActionResult<PropertyValue> {
        PropertyValue::from_json(self.required(name)?, ty)
            .map_err(|e| ActionError::invalid_parameter(name, e.to_string()))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ActionParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> ActionParameters {
        ActionParameters::new()
            .with("name", "Ann")
            .with("count", 3)
            .with("ratio", 0.5)
            .with("active", true)
            .with("office", "O1")
            .with("nothing", Value::Null)
    }

    #[test]
    fn typed_accessors() {
        let p = params();
        assert_eq!(p.string("name").unwrap(), "Ann");
        assert_eq!(p.integer("count").unwrap(), 3);
        assert_eq!(p.double("ratio").unwrap(), 0.5);
        assert!(p.boolean("active").unwrap());
        assert_eq!(p.locator("office", "Office").unwrap(), Locator::new("Office", "O1"));
        assert_eq!(
            p.property_value("count", &PropertyType::Double).unwrap(),
            PropertyValue::Double(3.0)
        );
    }

    #[test]
    fn null_reads_as_missing() {
        let p = params();
        assert!(!p.contains("nothing"));
        assert_eq!(
            p.string("nothing"),
            Err(ActionError::invalid_parameter("nothing", "missing"))
        );
    }

    #[test]
    fn wrong_kind_is_invalid_parameter() {
        let p = params();
        assert!(matches!(p.integer("name"), Err(ActionError::InvalidParameter { .. })));
        assert!(matches!(p.boolean("count"), Err(ActionError::InvalidParameter { .. })));
        assert!(matches!(
            p.property_value("name", &PropertyType::Date),
            Err(ActionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn deserializes_from_json_object() {
        let p: ActionParameters = serde_json::from_value(json!({"a": 1, "b": "x"})).unwrap();
        assert_eq!(p.iter().count(), 2);
        let collected: ActionParameters = [("a", json!(1)), ("b", json!("x"))].into_iter().collect();
        assert_eq!(p, collected);
    }
}
