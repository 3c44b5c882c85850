//! Declarative sandbox contents: schema, objects, and links in one file.
//!
//! A fixture is TOML or JSON, picked by file extension:
//!
//! ```toml
//! [[object_types]]
//! apiName = "Employee"
//! primaryKey = "id"
//! properties = { id = "string", officeId = "string" }
//!
//! [[objects]]
//! object_type = "Employee"
//! properties = { id = "1", officeId = "O1" }
//!
//! [[links]]
//! source = "Employee:1"
//! link = "office"
//! target = "Office:O1"
//! inverse = "occupants"
//! ```

use std::path::Path;

use onto_schema::{ActionTypeDef, LinkTypeDef, ObjectTypeDef, Ontology};
use onto_store::DataStore;
use onto_types::{Locator, Rid};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub object_types: Vec<ObjectTypeDef>,
    #[serde(default)]
    pub link_types: Vec<LinkTypeDef>,
    #[serde(default)]
    pub action_types: Vec<ActionTypeDef>,
    #[serde(default)]
    pub objects: Vec<FixtureObject>,
    #[serde(default)]
    pub links: Vec<FixtureLink>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureObject {
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<Rid>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureLink {
    pub source: Locator,
    pub link: String,
    pub target: Locator,
    pub inverse: String,
}

impl Fixture {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::InvalidFixture(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> SdkResult<Self> {
        serde_json::from_str(s).map_err(|e| SdkError::InvalidFixture(e.to_string()))
    }

    /// Read a `.toml` or `.json` fixture.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(SdkError::UnsupportedFixtureFormat(path.display().to_string())),
        }
    }

    /// Register the declared object, link, and action types.
    pub fn ontology(&self) -> SdkResult<Ontology> {
        Ok(Ontology::build(
            self.object_types.iter().cloned(),
            self.link_types.iter().cloned(),
            self.action_types.iter().cloned(),
        )?)
    }

    /// Register the fixture's objects, then its links, into `store`.
    pub fn populate(&self, store: &mut DataStore) -> SdkResult<()> {
        for object in &self.objects {
            let record =
                store.record_from_json(&object.object_type, &object.properties, object.rid.clone())?;
            store.register_object(record)?;
        }
        for link in &self.links {
            store.register_link(&link.source, &link.link, &link.target, &link.inverse)?;
        }
        debug!(
            objects = self.objects.len(),
            links = self.links.len(),
            "populated store from fixture"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onto_store::StoreError;
    use std::sync::Arc;

    const OFFICES: &str = r#"
[[object_types]]
apiName = "Employee"
primaryKey = "id"
properties = { id = "string", name = "string", salary = "integer", officeId = "string" }

[[object_types]]
apiName = "Office"
primaryKey = "officeId"
properties = { officeId = "string", address = "string" }

[[link_types]]
source = { objectType = "Employee", linkName = "office", cardinality = "ONE", foreignKeyProperty = "officeId" }
target = { objectType = "Office", linkName = "occupants", cardinality = "MANY" }

[[action_types]]
apiName = "moveOffice"
parameters = { officeId = "object<Office>", newAddress = "string" }

[[objects]]
object_type = "Office"
properties = { officeId = "O1", address = "1 St" }

[[objects]]
object_type = "Employee"
rid = "ri.phonograph2-objects.main.object.fixed"
properties = { id = "1", name = "Ann", salary = 120 }

[[links]]
source = "Employee:1"
link = "office"
target = "Office:O1"
inverse = "occupants"
"#;

    #[test]
    fn toml_fixture_populates_a_store() {
        let fixture = Fixture::from_toml_str(OFFICES).unwrap();
        let mut store = DataStore::new(Arc::new(fixture.ontology().unwrap()));
        fixture.populate(&mut store).unwrap();

        let ann = store.get_object(&Locator::new("Employee", "1")).unwrap();
        assert_eq!(ann.rid.as_str(), "ri.phonograph2-objects.main.object.fixed");
        assert_eq!(ann.get("salary").and_then(|v| v.as_i64()), Some(120));
        let occupants = store
            .get_links_or_err(&Locator::new("Office", "O1"), "occupants")
            .unwrap();
        assert_eq!(occupants.len(), 1);
        assert!(store.ontology().action_type("moveOffice").is_ok());
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("offices.toml");
        std::fs::write(&toml_path, OFFICES).unwrap();
        let from_toml = Fixture::load(&toml_path).unwrap();

        let json_path = dir.path().join("offices.json");
        std::fs::write(&json_path, serde_json::to_string(&from_toml).unwrap()).unwrap();
        let from_json = Fixture::load(&json_path).unwrap();
        assert_eq!(from_json, from_toml);

        let yaml_path = dir.path().join("offices.yaml");
        std::fs::write(&yaml_path, "objects: []").unwrap();
        assert!(matches!(
            Fixture::load(&yaml_path),
            Err(SdkError::UnsupportedFixtureFormat(_))
        ));
    }

    #[test]
    fn bad_locator_is_an_invalid_fixture() {
        let err = Fixture::from_json_str(
            r#"{"links": [{"source": "nocolon", "link": "x", "target": "A:1", "inverse": "y"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::InvalidFixture(_)));
    }

    #[test]
    fn undeclared_property_fails_population() {
        let mut fixture = Fixture::from_toml_str(OFFICES).unwrap();
        fixture.objects[0]
            .properties
            .insert("floor".into(), Value::from(3));
        let mut store = DataStore::new(Arc::new(fixture.ontology().unwrap()));
        let err = fixture.populate(&mut store).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Store(StoreError::PropertyNotFound { ref property, .. }) if property == "floor"
        ));
    }
}
