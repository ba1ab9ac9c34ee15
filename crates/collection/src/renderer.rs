//! Markup for permanent items, one render function per item type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use attache_protocol::types::ItemType;

use crate::container::PermanentItem;
use crate::error::CollectionError;

/// Produces the markup of one item.
pub type RenderFn = Arc<dyn Fn(&PermanentItem) -> String + Send + Sync>;

/// Maps item types to render functions.
///
/// The default registry knows `file`, `image`, `svg` and `media`, and
/// renders each as the preview markup sent by the server. Hosts register
/// their own functions for custom types, or to replace the defaults.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<ItemType, RenderFn>,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.renderers.keys().map(ItemType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("RendererRegistry")
            .field("types", &types)
            .finish()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for item_type in [ItemType::File, ItemType::Image, ItemType::Svg, ItemType::Media] {
            registry.register(item_type, preview_markup);
        }
        registry
    }
}

impl RendererRegistry {
    /// Registry without any render function.
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registers `render` for `item_type`, replacing any previous one.
    pub fn register<F>(&mut self, item_type: ItemType, render: F) -> &mut Self
    where
        F: Fn(&PermanentItem) -> String + Send + Sync + 'static,
    {
        self.renderers.insert(item_type, Arc::new(render));
        self
    }

    pub fn supports(&self, item_type: &ItemType) -> bool {
        self.renderers.contains_key(item_type)
    }

    pub fn render(&self, item: &PermanentItem) -> Result<String, CollectionError> {
        let render = self
            .renderers
            .get(&item.item_type)
            .ok_or_else(|| CollectionError::UnknownItemType(item.item_type.clone()))?;
        Ok(render(item))
    }
}

fn preview_markup(item: &PermanentItem) -> String {
    item.preview.clone()
}

#[cfg(test)]
mod tests {
    use attache_protocol::types::ItemPayload;

    use super::*;

    fn item(item_type: &str) -> PermanentItem {
        let payload: ItemPayload = serde_json::from_value(serde_json::json!({
            "id": 5,
            "itemType": item_type,
            "name": "report.pdf",
            "preview": "<div>report</div>",
        }))
        .unwrap();
        PermanentItem::from(payload)
    }

    #[test]
    fn builtin_types_render_preview() {
        let registry = RendererRegistry::default();
        for tag in ["file", "image", "svg", "media"] {
            assert_eq!(registry.render(&item(tag)).unwrap(), "<div>report</div>");
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = RendererRegistry::default();
        let err = registry.render(&item("document")).unwrap_err();
        assert!(matches!(err, CollectionError::UnknownItemType(ItemType::Other(ref t)) if t == "document"));
        assert!(!registry.supports(&ItemType::from("document")));
    }

    #[test]
    fn custom_renderers_override() {
        let mut registry = RendererRegistry::empty();
        registry
            .register(ItemType::from("document"), |item| format!("<a>{}</a>", item.name))
            .register(ItemType::File, |_| "file".to_string());

        assert_eq!(registry.render(&item("document")).unwrap(), "<a>report.pdf</a>");
        assert_eq!(registry.render(&item("file")).unwrap(), "file");
        assert!(registry.render(&item("image")).is_err());
        assert!(format!("{registry:?}").contains("document"));
    }
}
