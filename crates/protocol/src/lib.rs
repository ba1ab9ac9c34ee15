//! Wire contract between attachment widgets and the remote upload service.
//!
//! Every endpoint speaks JSON over HTTP. A response is only a success when
//! the status is 2xx **and** the body carries no `errors`; [`envelope`]
//! implements that rule once so the transport adapters don't have to.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

pub use envelope::{EnvelopeError, parse_response};
pub use types::{ContainerId, ItemId, ItemPayload, ItemType, OrderMap};
