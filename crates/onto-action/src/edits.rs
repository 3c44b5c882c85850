//! The edit log produced by a batch.

use std::collections::BTreeMap;

use onto_types::{Locator, PrimaryKey, PropertyValue};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Property diff
// ---------------------------------------------------------------------------

/// A single property change on a modified object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum PropertyChange {
    Added {
        property: String,
        value: PropertyValue,
    },
    Removed {
        property: String,
        value: PropertyValue,
    },
    Modified {
        property: String,
        old: PropertyValue,
        new: PropertyValue,
    },
}

/// Property-level difference between two versions of a record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyDiff {
    pub changes: Vec<PropertyChange>,
}

impl PropertyDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, PropertyChange::Added { .. }))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, PropertyChange::Removed { .. }))
            .count()
    }

    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, PropertyChange::Modified { .. }))
            .count()
    }
}

/// Compare two property maps.
///
/// Properties only in `new` are `Added`, only in `old` are `Removed`, and
/// in both with different values are `Modified`. Output follows property
/// name order within each pass.
pub fn diff_properties(
    old: &BTreeMap<String, PropertyValue>,
    new: &BTreeMap<String, PropertyValue>,
) -> PropertyDiff {
    let mut changes = Vec::new();

    for (property, old_value) in old {
        match new.get(property) {
            Some(new_value) if new_value != old_value => changes.push(PropertyChange::Modified {
                property: property.clone(),
                old: old_value.clone(),
                new: new_value.clone(),
            }),
            Some(_) => {}
            None => changes.push(PropertyChange::Removed {
                property: property.clone(),
                value: old_value.clone(),
            }),
        }
    }

    for (property, value) in new {
        if !old.contains_key(property) {
            changes.push(PropertyChange::Added {
                property: property.clone(),
                value: value.clone(),
            });
        }
    }

    PropertyDiff { changes }
}

// ---------------------------------------------------------------------------
// Object edits
// ---------------------------------------------------------------------------

/// One mutation performed through a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectEdit {
    #[serde(rename_all = "camelCase")]
    AddObject {
        object_type: String,
        primary_key: PrimaryKey,
    },
    #[serde(rename_all = "camelCase")]
    ModifyObject {
        object_type: String,
        primary_key: PrimaryKey,
        changes: PropertyDiff,
    },
    #[serde(rename_all = "camelCase")]
    DeleteObject {
        object_type: String,
        primary_key: PrimaryKey,
    },
    #[serde(rename_all = "camelCase")]
    AddLink {
        source: Locator,
        link: String,
        target: Locator,
        inverse: String,
    },
    #[serde(rename_all = "camelCase")]
    DeleteLink {
        source: Locator,
        link: String,
        target: Locator,
        inverse: String,
    },
}

impl ObjectEdit {
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::DeleteObject { .. } | Self::DeleteLink { .. })
    }
}

/// The edit log returned from a committed action, with per-kind counts over
/// the full log.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEdits {
    pub edits: Vec<ObjectEdit>,
    pub added_object_count: usize,
    pub modified_objects_count: usize,
    pub deleted_objects_count: usize,
    pub added_links_count: usize,
    pub deleted_links_count: usize,
}

impl ActionEdits {
    pub fn from_log(edits: Vec<ObjectEdit>) -> Self {
        let mut out = Self::default();
        for edit in &edits {
            match edit {
                ObjectEdit::AddObject { .. } => out.added_object_count += 1,
                ObjectEdit::ModifyObject { .. } => out.modified_objects_count += 1,
                ObjectEdit::DeleteObject { .. } => out.deleted_objects_count += 1,
                ObjectEdit::AddLink { .. } => out.added_links_count += 1,
                ObjectEdit::DeleteLink { .. } => out.deleted_links_count += 1,
            }
        }
        out.edits = edits;
        out
    }

    /// Drop delete edits from the list. Counts are unchanged.
    pub fn without_deletions(mut self) -> Self {
        self.edits.retain(|edit| !edit.is_deletion());
        self
    }
}
