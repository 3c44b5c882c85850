//! The object table: canonical owner of every record.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use onto_types::{Locator, PrimaryKey, Record, Rid};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct TypeTable {
    /// Record plus the sequence number it was first registered with.
    by_key: HashMap<PrimaryKey, (u64, Arc<Record>)>,
    order: BTreeMap<u64, PrimaryKey>,
}

/// Records keyed by `(object type, primary key)`.
///
/// Stored records are frozen behind `Arc`; a change always swaps in a new
/// record through [`ObjectTable::replace`]. Scans return records in the order
/// they were first registered, and a replaced record keeps its position.
#[derive(Debug, Default)]
pub struct ObjectTable {
    types: HashMap<String, TypeTable>,
    next_seq: u64,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Fails if one already exists under the same locator.
    pub fn register(&mut self, record: Record) -> StoreResult<Arc<Record>> {
        let table = self.types.entry(record.object_type.clone()).or_default();
        if table.by_key.contains_key(&record.primary_key) {
            return Err(StoreError::ObjectAlreadyExists(record.locator()));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let record = Arc::new(record);
        table.order.insert(seq, record.primary_key.clone());
        table
            .by_key
            .insert(record.primary_key.clone(), (seq, Arc::clone(&record)));
        Ok(record)
    }

    /// Swap the stored record for `record`, returning the previous one.
    pub fn replace(&mut self, record: Record) -> StoreResult<Arc<Record>> {
        let slot = self
            .types
            .get_mut(&record.object_type)
            .and_then(|t| t.by_key.get_mut(&record.primary_key))
            .ok_or_else(|| StoreError::ObjectNotFound(record.locator()))?;
        let previous = std::mem::replace(&mut slot.1, Arc::new(record));
        Ok(previous)
    }

    /// Remove a record. Links pointing at it are left untouched.
    pub fn unregister(&mut self, locator: &Locator) -> StoreResult<Arc<Record>> {
        let table = self
            .types
            .get_mut(&locator.object_type)
            .ok_or_else(|| StoreError::ObjectNotFound(locator.clone()))?;
        let (seq, record) = table
            .by_key
            .remove(&locator.primary_key)
            .ok_or_else(|| StoreError::ObjectNotFound(locator.clone()))?;
        table.order.remove(&seq);
        Ok(record)
    }

    pub fn get(&self, locator: &Locator) -> Option<&Arc<Record>> {
        self.types
            .get(&locator.object_type)
            .and_then(|t| t.by_key.get(&locator.primary_key))
            .map(|(_, record)| record)
    }

    pub fn get_or_err(&self, locator: &Locator) -> StoreResult<&Arc<Record>> {
        self.get(locator)
            .ok_or_else(|| StoreError::ObjectNotFound(locator.clone()))
    }

    pub fn contains(&self, locator: &Locator) -> bool {
        self.get(locator).is_some()
    }

    /// All records of `object_type` in registration order.
    pub fn scan<'a>(&'a self, object_type: &str) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.types.get(object_type).into_iter().flat_map(|table| {
            table
                .order
                .values()
                .filter_map(move |pk| table.by_key.get(pk).map(|(_, record)| record))
        })
    }

    /// Linear scan for a record by rid.
    pub fn find_by_rid(&self, rid: &Rid) -> Option<&Arc<Record>> {
        self.types
            .values()
            .flat_map(|t| t.by_key.values())
            .map(|(_, record)| record)
            .find(|record| &record.rid == rid)
    }

    pub fn len(&self) -> usize {
        self.types.values().map(|t| t.by_key.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }
}
