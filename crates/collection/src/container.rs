//! Local model of a server-side container.

use std::time::Duration;

use attache_protocol::messages::ChangeItemResponse;
use attache_protocol::types::{ContainerId, ItemId, ItemPayload, ItemType, OrderMap};
use attache_uploader::{ItemLifecycle, ItemState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse status shown by the host (drop zone, sort handles).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    #[default]
    Empty,
    /// Uploads are running.
    Loading,
    Ready,
    /// The container is being deleted.
    Removing,
}

/// Where the container is in its server-side life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// No server id yet.
    Unassigned,
    /// Has an id but holds nothing.
    Created,
    Populated,
    Removing,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A server-confirmed item.
#[derive(Debug, Clone, PartialEq)]
pub struct PermanentItem {
    pub id: ItemId,
    pub item_type: ItemType,
    pub name: String,
    pub caption: String,
    /// Opaque preview markup from the server.
    pub preview: String,
    pub url: String,
    pub order: Option<u32>,
    pub selected: bool,
    /// Output of the renderer registered for `item_type`.
    pub rendered: String,
}

impl From<ItemPayload> for PermanentItem {
    fn from(payload: ItemPayload) -> Self {
        Self {
            id: payload.id,
            item_type: payload.item_type,
            name: payload.name,
            caption: payload.caption,
            preview: payload.preview,
            url: payload.url,
            order: payload.order,
            selected: false,
            rendered: String::new(),
        }
    }
}

impl PermanentItem {
    /// Caption to display, falling back to the file name.
    pub fn display_caption(&self) -> &str {
        if self.caption.is_empty() {
            &self.name
        } else {
            &self.caption
        }
    }

    /// Applies the display fields returned by a change form. Empty fields
    /// keep their current value.
    pub(crate) fn apply_change(&mut self, change: &ChangeItemResponse) {
        let fields = [
            (&mut self.name, &change.name),
            (&mut self.caption, &change.caption),
            (&mut self.preview, &change.preview),
            (&mut self.url, &change.url),
        ];
        for (field, value) in fields {
            if !value.is_empty() {
                field.clone_from(value);
            }
        }
    }
}

/// Placeholder for an upload in progress.
#[derive(Debug, Clone)]
pub struct Preloader {
    pub uuid: Uuid,
    pub name: String,
    /// Ordinal reserved for the item at submission.
    pub order: u32,
    lifecycle: ItemLifecycle,
}

impl Preloader {
    pub(crate) fn new(uuid: Uuid, name: String, order: u32, delay: Duration) -> Self {
        Self {
            uuid,
            name,
            order,
            lifecycle: ItemLifecycle::new(uuid, delay),
        }
    }

    pub fn state(&self) -> ItemState {
        self.lifecycle.state()
    }

    pub fn percentage(&self) -> u8 {
        self.lifecycle.percentage()
    }

    pub(crate) fn lifecycle_mut(&mut self) -> &mut ItemLifecycle {
        &mut self.lifecycle
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Items and preloaders of one container, in display order.
#[derive(Debug, Clone, Default)]
pub struct Container {
    id: Option<ContainerId>,
    status: ContainerStatus,
    items: Vec<PermanentItem>,
    preloaders: Vec<Preloader>,
    /// Last item toggled by the user; start of a range selection.
    anchor: Option<ItemId>,
}

impl Container {
    pub fn new(id: Option<ContainerId>, items: Vec<PermanentItem>) -> Self {
        let mut container = Self {
            id,
            items,
            ..Self::default()
        };
        container.sort();
        if !container.items.is_empty() {
            container.status = ContainerStatus::Ready;
        }
        container
    }

    pub fn id(&self) -> Option<ContainerId> {
        self.id
    }

    pub fn status(&self) -> ContainerStatus {
        self.status
    }

    /// Returns `true` when the status changed.
    pub(crate) fn set_status(&mut self, status: ContainerStatus) -> bool {
        let changed = self.status != status;
        self.status = status;
        changed
    }

    pub fn state(&self) -> ContainerState {
        if self.status == ContainerStatus::Removing {
            ContainerState::Removing
        } else if self.id.is_none() {
            ContainerState::Unassigned
        } else if self.items.is_empty() && self.preloaders.is_empty() {
            ContainerState::Created
        } else {
            ContainerState::Populated
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.preloaders.is_empty()
    }

    /// Takes `id` if the container has none yet. Returns `true` when the id
    /// was adopted.
    pub(crate) fn adopt(&mut self, id: ContainerId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }

    /// Forgets the server container and everything in it.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Ordinal for the next upload: one past the highest ordinal held by
    /// an item or reserved by a preloader, starting at 0.
    pub fn next_order(&self) -> u32 {
        self.items
            .iter()
            .filter_map(|item| item.order)
            .chain(self.preloaders.iter().map(|p| p.order))
            .max()
            .map_or(0, |max| max + 1)
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub fn items(&self) -> &[PermanentItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&PermanentItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub(crate) fn item_mut(&mut self, id: ItemId) -> Option<&mut PermanentItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Item ids in display order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Inserts `item`, replacing any item with the same id.
    pub(crate) fn insert_item(&mut self, item: PermanentItem) {
        self.items.retain(|existing| existing.id != item.id);
        self.items.push(item);
        self.sort();
    }

    pub(crate) fn remove_item(&mut self, id: ItemId) -> Option<PermanentItem> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        if self.anchor == Some(id) {
            self.anchor = None;
        }
        Some(self.items.remove(pos))
    }

    /// Replaces every item's ordinal with the server's. Items missing from
    /// `order_map` lose their ordinal and sort last.
    pub(crate) fn apply_order(&mut self, order_map: &OrderMap) {
        for item in &mut self.items {
            item.order = order_map.get(&item.id).copied();
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.items
            .sort_by_key(|item| (item.order.is_none(), item.order));
    }

    // -----------------------------------------------------------------------
    // Preloaders
    // -----------------------------------------------------------------------

    pub fn preloaders(&self) -> &[Preloader] {
        &self.preloaders
    }

    pub fn preloader(&self, uuid: Uuid) -> Option<&Preloader> {
        self.preloaders.iter().find(|p| p.uuid == uuid)
    }

    pub(crate) fn preloader_mut(&mut self, uuid: Uuid) -> Option<&mut Preloader> {
        self.preloaders.iter_mut().find(|p| p.uuid == uuid)
    }

    pub(crate) fn add_preloader(&mut self, preloader: Preloader) {
        self.preloaders.push(preloader);
    }

    pub(crate) fn remove_preloader(&mut self, uuid: Uuid) -> Option<Preloader> {
        let pos = self.preloaders.iter().position(|p| p.uuid == uuid)?;
        Some(self.preloaders.remove(pos))
    }

    pub(crate) fn take_preloaders(&mut self) -> Vec<Preloader> {
        std::mem::take(&mut self.preloaders)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Flips the selection of one item and makes it the range anchor.
    /// Returns the new selection state, or `None` for unknown ids.
    pub(crate) fn toggle(&mut self, id: ItemId) -> Option<bool> {
        let item = self.item_mut(id)?;
        item.selected = !item.selected;
        let selected = item.selected;
        self.anchor = Some(id);
        Some(selected)
    }

    /// Sets `state` on every item displayed between `from` and `to`,
    /// both included. Returns how many items changed, or `None` when either
    /// end is unknown.
    pub(crate) fn select_range(&mut self, from: ItemId, to: ItemId, state: bool) -> Option<usize> {
        let start = self.items.iter().position(|item| item.id == from)?;
        let end = self.items.iter().position(|item| item.id == to)?;
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };

        let mut changed = 0;
        for item in &mut self.items[lo..=hi] {
            if item.selected != state {
                item.selected = state;
                changed += 1;
            }
        }
        self.anchor = Some(to);
        Some(changed)
    }

    pub fn anchor(&self) -> Option<ItemId> {
        self.anchor
    }

    pub fn selected(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.id)
            .collect()
    }

    /// Returns `true` if anything was selected.
    pub(crate) fn clear_selection(&mut self) -> bool {
        let mut any = false;
        for item in self.items.iter_mut().filter(|item| item.selected) {
            item.selected = false;
            any = true;
        }
        self.anchor = None;
        any
    }
}
