//! Collection error types.

use attache_protocol::types::{ItemId, ItemType};
use attache_uploader::SubmitError;

/// Failure of a reconciliation request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP {status}")]
    Status { status: u16, errors: Vec<String> },

    /// 2xx response carrying `errors`.
    #[error("request rejected: {}", errors.join("; "))]
    Rejected { errors: Vec<String> },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Reasons to show the user.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Rejected { errors } => errors.clone(),
            Self::Status { errors, .. } if !errors.is_empty() => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Errors produced by [`Collection`](crate::Collection) and
/// [`FileField`](crate::FileField).
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Another reconciliation request is still in flight.
    #[error("another request is in progress")]
    Busy,

    #[error("collection doesn't exist")]
    NoContainer,

    #[error("collection already exists")]
    ContainerExists,

    #[error("no file to act on")]
    NoFile,

    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    #[error("unsupported item type `{0}`")]
    UnknownItemType(ItemType),

    /// The user answered "no" to a confirmation.
    #[error("declined")]
    Declined,
}

impl CollectionError {
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Api(e) => e.reasons(),
            other => vec![other.to_string()],
        }
    }
}
