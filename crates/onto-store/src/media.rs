use std::collections::HashMap;

use bytes::Bytes;
use onto_types::{MediaReference, Rid};
use serde::Serialize;

/// Descriptive metadata for a stored media item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub size_bytes: u64,
    /// Hex BLAKE3 digest of the content.
    pub content_hash: String,
}

/// A media blob together with the reference handed out for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    pub content: Bytes,
    pub reference: MediaReference,
    pub metadata: MediaMetadata,
}

impl MediaItem {
    pub fn new(content: Bytes, media_type: impl Into<String>, path: Option<String>, rid: Rid) -> Self {
        let media_type = media_type.into();
        let metadata = MediaMetadata {
            media_type: media_type.clone(),
            path,
            size_bytes: content.len() as u64,
            content_hash: blake3::hash(&content).to_hex().to_string(),
        };
        Self {
            reference: MediaReference::sandbox(rid, media_type),
            content,
            metadata,
        }
    }
}

/// Media items keyed by `(object type, property)` and then media item rid.
#[derive(Debug, Default)]
pub struct MediaStore {
    items: HashMap<(String, String), HashMap<Rid, MediaItem>>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an item, replacing any item with the same rid.
    pub fn insert(&mut self, object_type: &str, property: &str, item: MediaItem) {
        self.items
            .entry((object_type.to_string(), property.to_string()))
            .or_default()
            .insert(item.reference.media_item_rid.clone(), item);
    }

    pub fn get(&self, object_type: &str, property: &str, rid: &Rid) -> Option<&MediaItem> {
        self.items
            .get(&(object_type.to_string(), property.to_string()))
            .and_then(|items| items.get(rid))
    }

    pub fn len(&self) -> usize {
        self.items.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
