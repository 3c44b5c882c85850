use std::sync::Arc;

use onto_schema::{LinkTypeSide, Ontology, SchemaError};
use onto_types::{Locator, PrimaryKey, Record};

use crate::error::{StoreError, StoreResult};
use crate::store::DataStore;

/// Per-object-type view of the links an object can traverse.
pub trait LinkAccessor {
    /// The object type this accessor serves.
    fn object_type(&self) -> &str;

    /// Link names available on the object type, sorted.
    fn link_names(&self) -> Vec<&str>;

    /// Records reachable from `primary_key` through `link`.
    fn links(
        &self,
        store: &DataStore,
        primary_key: &PrimaryKey,
        link: &str,
    ) -> StoreResult<Vec<Arc<Record>>>;

    /// The record with `target` among the targets of `link`.
    fn link(
        &self,
        store: &DataStore,
        primary_key: &PrimaryKey,
        link: &str,
        target: &PrimaryKey,
    ) -> StoreResult<Arc<Record>> {
        self.links(store, primary_key, link)?
            .into_iter()
            .find(|record| &record.primary_key == target)
            .ok_or_else(|| StoreError::LinkedObjectNotFound {
                source_object: Locator::new(self.object_type(), primary_key.clone()),
                link: link.to_string(),
                target: target.to_string(),
            })
    }
}

/// [`LinkAccessor`] derived from the link types registered in an ontology.
#[derive(Clone, Debug)]
pub struct SchemaLinkAccessor {
    object_type: String,
    sides: Vec<LinkTypeSide>,
}

impl SchemaLinkAccessor {
    pub fn new(ontology: &Ontology, object_type: &str) -> StoreResult<Self> {
        let sides = ontology
            .link_type_sides(object_type)?
            .into_iter()
            .cloned()
            .collect();
        Ok(Self {
            object_type: object_type.to_string(),
            sides,
        })
    }
}

impl LinkAccessor for SchemaLinkAccessor {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn link_names(&self) -> Vec<&str> {
        self.sides.iter().map(|side| side.api_name.as_str()).collect()
    }

    fn links(
        &self,
        store: &DataStore,
        primary_key: &PrimaryKey,
        link: &str,
    ) -> StoreResult<Vec<Arc<Record>>> {
        if !self.sides.iter().any(|side| side.api_name == link) {
            return Err(SchemaError::LinkTypeNotFound {
                object_type: self.object_type.clone(),
                link: link.to_string(),
            }
            .into());
        }
        store.get_links_or_err(&Locator::new(self.object_type.clone(), primary_key.clone()), link)
    }
}
