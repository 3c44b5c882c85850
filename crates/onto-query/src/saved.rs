use std::collections::BTreeMap;

use crate::error::{QueryError, QueryResult};
use crate::object_set::ObjectSet;

/// Named object sets reachable through [`ObjectSet::Reference`].
#[derive(Clone, Debug, Default)]
pub struct SavedObjectSets {
    sets: BTreeMap<String, ObjectSet>,
}

impl SavedObjectSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save `set` under `id`, replacing any earlier definition.
    pub fn save(&mut self, id: impl Into<String>, set: ObjectSet) {
        self.sets.insert(id.into(), set);
    }

    pub fn get(&self, id: &str) -> QueryResult<&ObjectSet> {
        self.sets
            .get(id)
            .ok_or_else(|| QueryError::ObjectSetNotFound(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Option<ObjectSet> {
        self.sets.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
