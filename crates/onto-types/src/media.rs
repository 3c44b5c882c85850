use serde::{Deserialize, Serialize};

use crate::rid::Rid;

/// Pointer from a property value to an item in the media store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub mime_type: String,
    pub media_item_rid: Rid,
    pub media_set_rid: Rid,
    pub media_set_view_rid: Rid,
}

impl MediaReference {
    /// Media set every in-memory upload lands in.
    pub const SANDBOX_MEDIA_SET: &'static str = "ri.mio.main.media-set.sandbox";
    pub const SANDBOX_MEDIA_SET_VIEW: &'static str = "ri.mio.main.view.sandbox";

    /// Reference to an item in the sandbox media set.
    pub fn sandbox(media_item_rid: Rid, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            media_item_rid,
            media_set_rid: Rid::from(Self::SANDBOX_MEDIA_SET),
            media_set_view_rid: Rid::from(Self::SANDBOX_MEDIA_SET_VIEW),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "mimeType": self.mime_type,
            "mediaItemRid": self.media_item_rid.as_str(),
            "mediaSetRid": self.media_set_rid.as_str(),
            "mediaSetViewRid": self.media_set_view_rid.as_str(),
        })
    }
}
