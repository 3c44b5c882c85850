use std::collections::BTreeMap;

use onto_types::PropertyType;
use serde::{Deserialize, Serialize};

/// Declaration of a single property.
///
/// In fixture files a property may be written either in full
/// (`{ dataType = { type = "string" } }`) or as the bare type name
/// (`"string"`, `"array<date>"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PropertyDefRepr")]
pub struct PropertyDef {
    pub data_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertyDef {
    pub fn new(data_type: PropertyType) -> Self {
        Self {
            data_type,
            description: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PropertyDefRepr {
    Short(String),
    Full {
        #[serde(rename = "dataType")]
        data_type: PropertyType,
        #[serde(default)]
        description: Option<String>,
    },
}

impl TryFrom<PropertyDefRepr> for PropertyDef {
    type Error = String;

    fn try_from(repr: PropertyDefRepr) -> Result<Self, Self::Error> {
        match repr {
            PropertyDefRepr::Short(name) => name
                .parse()
                .map(PropertyDef::new)
                .map_err(|e| e.to_string()),
            PropertyDefRepr::Full {
                data_type,
                description,
            } => Ok(PropertyDef {
                data_type,
                description,
            }),
        }
    }
}

/// Declaration of an object type: its name, primary-key property, and the
/// typed properties its records may carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeDef {
    pub api_name: String,
    pub primary_key: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

impl ObjectTypeDef {
    /// A new object type whose primary-key property is declared with
    /// `primary_key_type`.
    pub fn new(
        api_name: impl Into<String>,
        primary_key: impl Into<String>,
        primary_key_type: PropertyType,
    ) -> Self {
        let primary_key = primary_key.into();
        let mut properties = BTreeMap::new();
        properties.insert(primary_key.clone(), PropertyDef::new(primary_key_type));
        Self {
            api_name: api_name.into(),
            primary_key,
            properties,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, data_type: PropertyType) -> Self {
        self.properties.insert(name.into(), PropertyDef::new(data_type));
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn property_type(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name).map(|p| &p.data_type)
    }

    pub fn primary_key_type(&self) -> Option<&PropertyType> {
        self.property_type(&self.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_declares_primary_key() {
        let def = ObjectTypeDef::new("Employee", "id", PropertyType::Integer)
            .with_property("name", PropertyType::String);
        assert_eq!(def.primary_key_type(), Some(&PropertyType::Integer));
        assert_eq!(def.property_type("name"), Some(&PropertyType::String));
        assert!(def.property("salary").is_none());
    }

    #[test]
    fn properties_accept_short_and_full_forms() {
        let def: ObjectTypeDef = toml::from_str(
            r#"
            apiName = "Office"
            primaryKey = "officeId"

            [properties]
            officeId = "string"
            tags = "array<string>"
            address = { dataType = { type = "string" }, description = "street address" }
            "#,
        )
        .unwrap();
        assert_eq!(def.property_type("officeId"), Some(&PropertyType::String));
        assert_eq!(
            def.property_type("tags"),
            Some(&PropertyType::array(PropertyType::String))
        );
        assert_eq!(
            def.property("address").unwrap().description.as_deref(),
            Some("street address")
        );
    }

    #[test]
    fn unknown_short_type_is_rejected() {
        let result: Result<ObjectTypeDef, _> = serde_json::from_str(
            r#"{"apiName":"X","primaryKey":"id","properties":{"id":"uuid"}}"#,
        );
        assert!(result.is_err());
    }
}
