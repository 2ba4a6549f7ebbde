//! Media handle model.

use serde::{Deserialize, Serialize};

/// Reference to an image held by the remote object store.
///
/// Handles are plain values: complaints and avatars embed copies of them and
/// nothing tracks how many records point at the same upstream asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaHandle {
    /// Publicly addressable URL.
    pub url: String,
    /// Identifier issued by the storage service (needed to delete the asset).
    pub media_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
}

impl MediaHandle {
    /// Handle with only the mandatory fields set.
    pub fn new(url: impl Into<String>, media_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_id: media_id.into(),
            width: None,
            height: None,
            format: None,
            byte_size: None,
        }
    }
}
