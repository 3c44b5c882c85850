use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque resource identifier.
///
/// Rids are assigned to records when they are created and to media items
/// when they are uploaded. They have the shape
/// `ri.<service>.<instance>.<kind>.<locator>`; callers should treat them as
/// opaque strings and only compare them for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rid(String);

impl Rid {
    const OBJECT_PREFIX: &'static str = "ri.phonograph2-objects.main.object";
    const MEDIA_ITEM_PREFIX: &'static str = "ri.mio.main.media-item";

    /// A fresh, time-ordered rid for an object record.
    pub fn object() -> Self {
        Self(format!("{}.{}", Self::OBJECT_PREFIX, Uuid::now_v7()))
    }

    /// A fresh, time-ordered rid for a media item.
    pub fn media_item() -> Self {
        Self(format!("{}.{}", Self::MEDIA_ITEM_PREFIX, Uuid::now_v7()))
    }

    /// Wrap an existing rid string without validation.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string carries the `ri.` resource prefix.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with("ri.") && self.0.split('.').count() >= 5
    }

    pub fn is_media_item(&self) -> bool {
        self.0.starts_with(Self::MEDIA_ITEM_PREFIX)
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Rid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Rid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_rids_are_unique() {
        let a = Rid::object();
        let b = Rid::object();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert!(a.as_str().starts_with("ri.phonograph2-objects.main.object."));
    }

    #[test]
    fn media_item_rids_are_recognized() {
        let rid = Rid::media_item();
        assert!(rid.is_media_item());
        assert!(!Rid::object().is_media_item());
    }

    #[test]
    fn arbitrary_strings_are_not_valid_rids() {
        assert!(!Rid::from("hello").is_valid());
        assert!(!Rid::from("ri.short").is_valid());
    }

    #[test]
    fn serializes_as_plain_string() {
        let rid = Rid::from("ri.a.b.c.d");
        assert_eq!(serde_json::to_string(&rid).unwrap(), "\"ri.a.b.c.d\"");
    }
}
