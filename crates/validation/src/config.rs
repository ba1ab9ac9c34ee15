use serde::{Deserialize, Serialize};

use crate::ValidationError;
use crate::dimensions::ImageBounds;

/// Admission rules for one widget, as emitted by the server.
///
/// Zero-valued bounds are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Accepted extensions, with or without the leading dot.
    pub allowed_extensions: Vec<String>,
    /// Accepted MIME types; `type/*` matches any subtype.
    pub accept_files: Vec<String>,
    /// Minimum file size in bytes.
    pub min_size: Option<u64>,
    /// Maximum file size in bytes.
    pub size_limit: Option<u64>,
    pub min_image_width: Option<u32>,
    pub min_image_height: Option<u32>,
    pub max_image_width: Option<u32>,
    pub max_image_height: Option<u32>,
    /// Reject files that cannot be decoded as images when dimension bounds
    /// are set. When `false` the dimension check is left to the server.
    pub strict_image_validation: bool,
}

impl ValidationConfig {
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Dimension bounds, if any are set.
    pub fn image_bounds(&self) -> Option<ImageBounds> {
        let bounds = ImageBounds {
            min_width: nonzero(self.min_image_width),
            min_height: nonzero(self.min_image_height),
            max_width: nonzero(self.max_image_width),
            max_height: nonzero(self.max_image_height),
        };
        (!bounds.is_unbounded()).then_some(bounds)
    }

    pub(crate) fn min_size(&self) -> Option<u64> {
        self.min_size.filter(|v| *v > 0)
    }

    pub(crate) fn size_limit(&self) -> Option<u64> {
        self.size_limit.filter(|v| *v > 0)
    }
}

fn nonzero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_widget_json() {
        let config = ValidationConfig::from_json(
            r#"{
                "allowedExtensions": ["jpg", "png"],
                "acceptFiles": ["image/*"],
                "sizeLimit": 1048576,
                "maxImageWidth": 800,
                "strictImageValidation": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.allowed_extensions, vec!["jpg", "png"]);
        assert_eq!(config.accept_files, vec!["image/*"]);
        assert_eq!(config.size_limit, Some(1_048_576));
        assert_eq!(config.min_size, None);
        assert!(config.strict_image_validation);

        let bounds = config.image_bounds().unwrap();
        assert_eq!(bounds.max_width, Some(800));
        assert_eq!(bounds.max_height, None);
    }

    #[test]
    fn empty_json_is_default() {
        let config = ValidationConfig::from_json("{}").unwrap();
        assert_eq!(config, ValidationConfig::default());
        assert!(config.image_bounds().is_none());
    }

    #[test]
    fn zero_bounds_are_unset() {
        let config = ValidationConfig {
            min_image_width: Some(0),
            size_limit: Some(0),
            ..Default::default()
        };
        assert!(config.image_bounds().is_none());
        assert!(config.size_limit().is_none());
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(matches!(
            ValidationConfig::from_json("{\"sizeLimit\": \"big\"}"),
            Err(ValidationError::Config(_))
        ));
    }
}
