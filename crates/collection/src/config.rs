//! Widget configuration, as rendered by the server into the page.

use std::collections::BTreeMap;

use attache_uploader::QueueConfig;
use attache_validation::ValidationConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Remote endpoints of one widget.
///
/// Unused URLs may be left empty (a single-file field has no sort URL).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Endpoints {
    pub create_url: String,
    pub delete_url: String,
    pub upload_url: String,
    pub delete_item_url: String,
    pub sort_url: String,
    pub change_url: String,
    /// Extra parameters sent with every request (owner model, field name...).
    pub params: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Collection widget
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectionConfig {
    #[serde(flatten)]
    pub endpoints: Endpoints,
    /// Admission rules applied to every upload.
    pub configuration: ValidationConfig,
    pub queue: QueueConfig,
    /// Let the first completed upload create the container. When `false`,
    /// uploads are refused until the container exists.
    pub implicit_create: bool,
    /// Ask the user before deleting the container or items.
    pub confirm_deletes: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            configuration: ValidationConfig::default(),
            queue: QueueConfig::collection(),
            implicit_create: true,
            confirm_deletes: true,
        }
    }
}

impl CollectionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Single-file field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(flatten)]
    pub endpoints: Endpoints,
    pub configuration: ValidationConfig,
    pub queue: QueueConfig,
    pub confirm_deletes: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            configuration: ValidationConfig::default(),
            queue: QueueConfig::single_file(),
            confirm_deletes: true,
        }
    }
}

impl FieldConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
