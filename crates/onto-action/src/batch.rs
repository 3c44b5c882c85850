//! The mutation surface handed to action effects.

use std::sync::Arc;

use onto_store::{DataStore, StoreError};
use onto_types::{Locator, PropertyValue, Record};
use serde_json::{Map, Value};
use tracing::debug;

use crate::edits::{diff_properties, ObjectEdit};
use crate::error::ActionResult;

/// Edit-tracking wrapper around a store.
///
/// Writes go straight to the store; the batch only records what it did.
/// There is no staging, so an effect that fails halfway leaves its earlier
/// writes in place.
pub struct Batch<'s> {
    store: &'s mut DataStore,
    edits: Vec<ObjectEdit>,
}

impl<'s> Batch<'s> {
    pub fn new(store: &'s mut DataStore) -> Self {
        Self {
            store,
            edits: Vec::new(),
        }
    }

    /// Read access to the store, including writes made by this batch.
    pub fn store(&self) -> &DataStore {
        self.store
    }

    pub fn get_object(&self, locator: &Locator) -> Option<&Arc<Record>> {
        self.store.get_object(locator)
    }

    pub fn get_object_or_err(&self, locator: &Locator) -> ActionResult<&Arc<Record>> {
        Ok(self.store.get_object_or_err(locator)?)
    }

    pub fn edits(&self) -> &[ObjectEdit] {
        &self.edits
    }

    pub fn into_edits(self) -> Vec<ObjectEdit> {
        self.edits
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    pub fn add_object(&mut self, record: Record) -> ActionResult<Arc<Record>> {
        let stored = self.store.register_object(record)?;
        self.edits.push(ObjectEdit::AddObject {
            object_type: stored.object_type.clone(),
            primary_key: stored.primary_key.clone(),
        });
        Ok(stored)
    }

    /// Add a record built from JSON property literals.
    pub fn create_object(
        &mut self,
        object_type: &str,
        properties: &Map<String, Value>,
    ) -> ActionResult<Arc<Record>> {
        let record = self.store.record_from_json(object_type, properties, None)?;
        self.add_object(record)
    }

    /// Swap in a new version of a record and log the property diff.
    pub fn replace_object(&mut self, record: Record) -> ActionResult<Arc<Record>> {
        let previous = Arc::clone(self.store.get_object_or_err(&record.locator())?);
        let stored = self.store.replace_object_or_err(record)?;
        self.edits.push(ObjectEdit::ModifyObject {
            object_type: stored.object_type.clone(),
            primary_key: stored.primary_key.clone(),
            changes: diff_properties(&previous.properties, &stored.properties),
        });
        Ok(stored)
    }

    /// Merge JSON property literals into a record. `null` removes a property.
    pub fn modify_object(
        &mut self,
        locator: &Locator,
        update: &Map<String, Value>,
    ) -> ActionResult<Arc<Record>> {
        let current = self.store.get_object_or_err(locator)?;
        let def = self.store.ontology().object_type(&locator.object_type)?;
        let mut properties = current.properties.clone();
        for (name, json) in update {
            if json.is_null() {
                properties.remove(name);
                continue;
            }
            let ty = def
                .property_type(name)
                .ok_or_else(|| StoreError::PropertyNotFound {
                    object_type: locator.object_type.clone(),
                    property: name.clone(),
                })?;
            let value =
                PropertyValue::from_json(json, ty).map_err(|e| StoreError::InvalidPropertyValue {
                    property: name.clone(),
                    reason: e.to_string(),
                })?;
            properties.insert(name.clone(), value);
        }
        let next = Record::with_rid(
            current.object_type.clone(),
            current.primary_key.clone(),
            current.rid.clone(),
            properties,
        );
        self.replace_object(next)
    }

    /// Detach every link of the record, then remove it.
    pub fn delete_object(&mut self, locator: &Locator) -> ActionResult<()> {
        self.store.get_object_or_err(locator)?;
        for (link, target) in self.store.links().links_of(locator) {
            // A self-inverse loop shows up under both ends; the first unlink removes it.
            if !self.store.links().contains(locator, &link, &target) {
                continue;
            }
            let inverse = self
                .store
                .ontology()
                .inverse_link_name(&locator.object_type, &link)?
                .to_string();
            self.remove_link(locator, &link, &target, &inverse)?;
        }
        self.store.unregister_object_or_err(locator)?;
        debug!(locator = %locator, "batch deleted object");
        self.edits.push(ObjectEdit::DeleteObject {
            object_type: locator.object_type.clone(),
            primary_key: locator.primary_key.clone(),
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Link two records. In a strict store a foreign-key link rewrites the
    /// owning record, which is logged as a `ModifyObject` after the link.
    pub fn add_link(
        &mut self,
        source: &Locator,
        link: &str,
        target: &Locator,
        inverse: &str,
    ) -> ActionResult<()> {
        let before = self.endpoints(source, target);
        self.store.register_link(source, link, target, inverse)?;
        self.edits.push(ObjectEdit::AddLink {
            source: source.clone(),
            link: link.to_string(),
            target: target.clone(),
            inverse: inverse.to_string(),
        });
        self.log_rewrites(before);
        Ok(())
    }

    pub fn remove_link(
        &mut self,
        source: &Locator,
        link: &str,
        target: &Locator,
        inverse: &str,
    ) -> ActionResult<()> {
        let before = self.endpoints(source, target);
        self.store.unregister_link(source, link, target, inverse)?;
        self.edits.push(ObjectEdit::DeleteLink {
            source: source.clone(),
            link: link.to_string(),
            target: target.clone(),
            inverse: inverse.to_string(),
        });
        self.log_rewrites(before);
        Ok(())
    }

    fn endpoints(&self, source: &Locator, target: &Locator) -> Vec<Arc<Record>> {
        let mut records: Vec<_> = [source, target]
            .into_iter()
            .filter_map(|locator| self.store.get_object(locator).cloned())
            .collect();
        records.dedup_by(|a, b| a.locator() == b.locator());
        records
    }

    /// Log property changes the store made to link endpoints on its own.
    fn log_rewrites(&mut self, before: Vec<Arc<Record>>) {
        for previous in before {
            let Some(current) = self.store.get_object(&previous.locator()) else {
                continue;
            };
            if Arc::ptr_eq(&previous, current) {
                continue;
            }
            let changes = diff_properties(&previous.properties, &current.properties);
            if changes.changes.is_empty() {
                continue;
            }
            debug!(locator = %previous.locator(), "link rewrote foreign key");
            self.edits.push(ObjectEdit::ModifyObject {
                object_type: previous.object_type.clone(),
                primary_key: previous.primary_key.clone(),
                changes,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::PropertyChange;
    use onto_schema::{LinkEnd, LinkTypeDef, ObjectTypeDef, Ontology};
    use onto_store::StoreConfig;
    use onto_types::PropertyType;
    use serde_json::json;

    fn ontology() -> Arc<Ontology> {
        Arc::new(
            Ontology::build(
                [
                    ObjectTypeDef::new("Employee", "id", PropertyType::String)
                        .with_property("name", PropertyType::String)
                        .with_property("officeId", PropertyType::String),
                    ObjectTypeDef::new("Office", "officeId", PropertyType::String)
                        .with_property("address", PropertyType::String),
                ],
                [
                    LinkTypeDef::new(
                        LinkEnd::one("Employee", "office").with_foreign_key("officeId"),
                        LinkEnd::many("Office", "occupants"),
                    ),
                    LinkTypeDef::new(
                        LinkEnd::many("Employee", "peeps"),
                        LinkEnd::many("Employee", "peeps"),
                    ),
                ],
                [],
            )
            .unwrap(),
        )
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn emp(pk: &str) -> Locator {
        Locator::new("Employee", pk)
    }

    #[test]
    fn every_mutation_is_logged_in_order() {
        let mut store = DataStore::new(ontology());
        let mut batch = Batch::new(&mut store);
        batch.create_object("Office", &obj(json!({"officeId": "O1", "address": "1 St"}))).unwrap();
        batch.create_object("Employee", &obj(json!({"id": "1", "name": "Ann"}))).unwrap();
        batch
            .add_link(&emp("1"), "office", &Locator::new("Office", "O1"), "occupants")
            .unwrap();
        batch
            .modify_object(&Locator::new("Office", "O1"), &obj(json!({"address": "5 Ave"})))
            .unwrap();

        let kinds: Vec<_> = batch
            .edits()
            .iter()
            .map(|e| serde_json::to_value(e).unwrap()["type"].clone())
            .collect();
        assert_eq!(
            kinds,
            vec![json!("addObject"), json!("addObject"), json!("addLink"), json!("modifyObject")]
        );
        let ObjectEdit::ModifyObject { changes, .. } = &batch.edits()[3] else {
            panic!("expected a modify edit");
        };
        assert_eq!(changes.modifications(), 1);
        drop(batch);

        let office = store.get_object(&Locator::new("Office", "O1")).unwrap();
        assert_eq!(office.get("address"), Some(&PropertyValue::from("5 Ave")));
    }

    #[test]
    fn modify_with_null_removes_property() {
        let mut store = DataStore::new(ontology());
        let mut batch = Batch::new(&mut store);
        batch.create_object("Employee", &obj(json!({"id": "1", "name": "Ann"}))).unwrap();
        let updated = batch.modify_object(&emp("1"), &obj(json!({"name": null}))).unwrap();
        assert!(updated.get("name").is_none());
        let ObjectEdit::ModifyObject { changes, .. } = batch.edits().last().unwrap() else {
            panic!("expected a modify edit");
        };
        assert!(matches!(&changes.changes[0], PropertyChange::Removed { property, .. } if property == "name"));
    }

    #[test]
    fn modify_rejects_undeclared_property() {
        let mut store = DataStore::new(ontology());
        let mut batch = Batch::new(&mut store);
        batch.create_object("Employee", &obj(json!({"id": "1"}))).unwrap();
        assert!(batch.modify_object(&emp("1"), &obj(json!({"age": 3}))).is_err());
        assert_eq!(batch.edits().len(), 1);
    }

    #[test]
    fn delete_detaches_links_first() {
        let mut store = DataStore::new(ontology());
        let mut batch = Batch::new(&mut store);
        for pk in ["1", "2", "3"] {
            batch.create_object("Employee", &obj(json!({"id": pk}))).unwrap();
        }
        batch.add_link(&emp("1"), "peeps", &emp("2"), "peeps").unwrap();
        batch.add_link(&emp("3"), "peeps", &emp("1"), "peeps").unwrap();
        batch.delete_object(&emp("1")).unwrap();

        let tail: Vec<_> = batch.edits()[5..].to_vec();
        assert_eq!(tail.len(), 3);
        assert!(matches!(&tail[0], ObjectEdit::DeleteLink { target, .. } if target == &emp("2")));
        assert!(matches!(&tail[1], ObjectEdit::DeleteLink { target, .. } if target == &emp("3")));
        assert!(matches!(&tail[2], ObjectEdit::DeleteObject { .. }));
        drop(batch);

        assert!(store.get_links_or_err(&emp("2"), "peeps").unwrap().is_empty());
        assert!(store.get_links_or_err(&emp("3"), "peeps").unwrap().is_empty());
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn delete_handles_self_links() {
        let mut store = DataStore::new(ontology());
        let mut batch = Batch::new(&mut store);
        batch.create_object("Employee", &obj(json!({"id": "1"}))).unwrap();
        batch.add_link(&emp("1"), "peeps", &emp("1"), "peeps").unwrap();
        batch.delete_object(&emp("1")).unwrap();
        drop(batch);
        assert_eq!(store.links().edge_count(), 0);
    }

    #[test]
    fn strict_delete_clears_foreign_key_links() {
        let mut store = DataStore::with_config(ontology(), StoreConfig::strict());
        let mut batch = Batch::new(&mut store);
        batch.create_object("Office", &obj(json!({"officeId": "O1"}))).unwrap();
        batch
            .create_object("Employee", &obj(json!({"id": "1", "officeId": "O1"})))
            .unwrap();
        batch.delete_object(&Locator::new("Office", "O1")).unwrap();
        drop(batch);

        let ann = store.get_object(&emp("1")).unwrap();
        assert!(ann.get("officeId").is_none());
        assert_eq!(store.links().edge_count(), 0);
    }

    #[test]
    fn strict_link_writes_log_the_foreign_key_change() {
        let mut store = DataStore::with_config(ontology(), StoreConfig::strict());
        let mut batch = Batch::new(&mut store);
        let o1 = Locator::new("Office", "O1");
        batch.create_object("Office", &obj(json!({"officeId": "O1"}))).unwrap();
        batch.create_object("Employee", &obj(json!({"id": "1"}))).unwrap();

        batch.add_link(&emp("1"), "office", &o1, "occupants").unwrap();
        let [ObjectEdit::AddLink { .. }, ObjectEdit::ModifyObject { primary_key, changes, .. }] =
            &batch.edits()[2..]
        else {
            panic!("expected a link then a modify, got {:?}", &batch.edits()[2..]);
        };
        assert_eq!(primary_key.as_str(), "1");
        assert!(matches!(&changes.changes[..], [PropertyChange::Added { property, .. }] if property == "officeId"));

        // Unlinking from the far side still rewrites the employee.
        batch.remove_link(&o1, "occupants", &emp("1"), "office").unwrap();
        let [ObjectEdit::DeleteLink { .. }, ObjectEdit::ModifyObject { changes, .. }] =
            &batch.edits()[4..]
        else {
            panic!("expected an unlink then a modify, got {:?}", &batch.edits()[4..]);
        };
        assert!(matches!(&changes.changes[..], [PropertyChange::Removed { property, .. }] if property == "officeId"));
    }

    #[test]
    fn plain_links_log_no_modify() {
        let mut store = DataStore::new(ontology());
        let mut batch = Batch::new(&mut store);
        batch.create_object("Employee", &obj(json!({"id": "1"}))).unwrap();
        batch.create_object("Employee", &obj(json!({"id": "2"}))).unwrap();
        batch.add_link(&emp("1"), "peeps", &emp("2"), "peeps").unwrap();
        batch.add_link(&emp("1"), "peeps", &emp("1"), "peeps").unwrap();
        assert_eq!(batch.edits().len(), 4);
    }
}
