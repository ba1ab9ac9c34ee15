//! Per-item lifecycle as seen by a widget.
//!
//! `Provisional → Uploading → Processing → Permanent`, with `Removed`
//! reachable from any non-final state. Promotion out of `Processing` needs
//! both the completion payload and the end of the processing delay; the
//! driver owns the timer and reports it with [`ItemLifecycle::delay_elapsed`].

use std::time::Duration;

use attache_protocol::types::ItemPayload;
use uuid::Uuid;

use crate::events::QueueEvent;

/// Default cosmetic delay between reaching 100 % and promotion.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Admitted, waiting for a transfer slot.
    Provisional,
    Uploading,
    /// Fully transferred, waiting for the server and the delay.
    Processing,
    Permanent,
    Removed,
}

impl ItemState {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Permanent | Self::Removed)
    }
}

/// What happened when an event was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Event did not concern this item, or the item is already final.
    Ignored,
    /// Still in the same state (e.g. a progress update).
    Unchanged,
    /// Moved to a new non-final state.
    Entered(ItemState),
    /// Became permanent with the server's item.
    Promoted(ItemPayload),
    /// Removed; carries the error reasons, if any.
    Removed(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ItemLifecycle {
    uuid: Uuid,
    state: ItemState,
    percentage: u8,
    delay: Duration,
    delay_elapsed: bool,
    payload: Option<ItemPayload>,
}

impl ItemLifecycle {
    pub fn new(uuid: Uuid, delay: Duration) -> Self {
        Self {
            uuid,
            state: ItemState::Provisional,
            percentage: 0,
            delay,
            delay_elapsed: false,
            payload: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    /// Delay the driver must wait after [`ItemState::Processing`] is entered.
    pub fn processing_delay(&self) -> Duration {
        self.delay
    }

    /// Server item, once known.
    pub fn payload(&self) -> Option<&ItemPayload> {
        self.payload.as_ref()
    }

    /// Applies a queue event.
    pub fn apply(&mut self, event: &QueueEvent) -> Transition {
        if self.state.is_final() || event.uuid() != Some(self.uuid) {
            return Transition::Ignored;
        }

        match event {
            QueueEvent::Submit { .. } | QueueEvent::Submitted { .. } => Transition::Unchanged,
            QueueEvent::Upload { .. } => match self.state {
                ItemState::Provisional => self.enter(ItemState::Uploading),
                _ => Transition::Unchanged,
            },
            QueueEvent::Progress { percentage, .. } => {
                self.percentage = self.percentage.max(*percentage);
                if self.percentage >= 100 && self.state != ItemState::Processing {
                    self.enter(ItemState::Processing)
                } else {
                    Transition::Unchanged
                }
            }
            QueueEvent::Complete { item, .. } => {
                self.percentage = 100;
                self.payload = Some(item.clone());
                if self.state != ItemState::Processing {
                    return self.enter(ItemState::Processing);
                }
                self.try_promote()
            }
            QueueEvent::Error { reasons, .. } => self.remove(reasons.clone()),
            QueueEvent::Cancel { .. } => self.remove(Vec::new()),
            QueueEvent::AllComplete => Transition::Ignored,
        }
    }

    /// Reports the end of the processing delay.
    pub fn delay_elapsed(&mut self) -> Transition {
        if self.state != ItemState::Processing {
            return Transition::Ignored;
        }
        self.delay_elapsed = true;
        self.try_promote()
    }

    /// Removes the item locally (e.g. the host discarded it).
    pub fn discard(&mut self) -> Transition {
        if self.state.is_final() {
            return Transition::Ignored;
        }
        self.remove(Vec::new())
    }

    fn enter(&mut self, state: ItemState) -> Transition {
        self.state = state;
        if state == ItemState::Processing && self.delay.is_zero() {
            self.delay_elapsed = true;
            if let Transition::Promoted(item) = self.try_promote() {
                return Transition::Promoted(item);
            }
        }
        Transition::Entered(state)
    }

    fn try_promote(&mut self) -> Transition {
        if !self.delay_elapsed {
            return Transition::Unchanged;
        }
        match self.payload.clone() {
            Some(item) => {
                self.state = ItemState::Permanent;
                Transition::Promoted(item)
            }
            None => Transition::Unchanged,
        }
    }

    fn remove(&mut self, reasons: Vec<String>) -> Transition {
        self.state = ItemState::Removed;
        Transition::Removed(reasons)
    }
}
