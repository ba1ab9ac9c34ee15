use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned container (collection/gallery) identifier.
pub type ContainerId = i64;

/// Server-assigned item identifier, unique per item type.
pub type ItemId = i64;

/// Authoritative ordering returned by the sort endpoint (id → ordinal).
pub type OrderMap = HashMap<ItemId, u32>;

/// Polymorphic item tag chosen by the server for each uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemType {
    #[default]
    File,
    Image,
    Svg,
    Media,
    /// Any tag registered by the host application.
    Other(String),
}

impl ItemType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "file",
            Self::Image => "image",
            Self::Svg => "svg",
            Self::Media => "media",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for ItemType {
    fn from(tag: &str) -> Self {
        match tag {
            "file" => Self::File,
            "image" => Self::Image,
            "svg" => Self::Svg,
            "media" => Self::Media,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ItemType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<ItemType> for String {
    fn from(item_type: ItemType) -> Self {
        item_type.as_str().to_string()
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item description sent by the server.
///
/// Returned by the final chunk of an upload, and used to seed a container
/// with the items that already exist server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub id: ItemId,
    #[serde(default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caption: String,
    /// Opaque preview markup, rendered by the host.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preview: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Human-readable size/format summary (single-file widgets only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<ContainerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl ItemPayload {
    /// Caption to display, falling back to the file name.
    pub fn display_caption(&self) -> &str {
        if self.caption.is_empty() {
            &self.name
        } else {
            &self.caption
        }
    }
}
