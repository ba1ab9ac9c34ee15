//! Upload error types.

use attache_validation::Rejection;

/// Errors reported by a [`Transport`](crate::Transport) for one chunk.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP {status}")]
    Status { status: u16, errors: Vec<String> },

    /// 2xx response carrying application errors.
    #[error("upload rejected: {}", errors.join("; "))]
    Rejected {
        errors: Vec<String>,
        prevent_retry: bool,
    },

    #[error("cancelled")]
    Cancelled,
}

impl TransportError {
    /// Reasons to show the user.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Status { status, errors } if errors.is_empty() => {
                vec![format!("Upload failed with HTTP status {status}")]
            }
            Self::Status { errors, .. } | Self::Rejected { errors, .. } => errors.clone(),
            Self::Network(msg) => vec![msg.clone()],
            Self::Cancelled => vec!["Upload cancelled".into()],
        }
    }
}

/// Reasons a file was not admitted into the queue.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Rejected(#[from] Rejection),

    /// Single-file mode and another upload is still running.
    #[error("only one upload at a time")]
    Busy,

    #[error("transfer error: {0}")]
    Transfer(#[from] attache_transfer::TransferError),
}

/// Errors that end one transfer.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("transfer error: {0}")]
    Transfer(#[from] attache_transfer::TransferError),

    #[error("server returned no item for the uploaded file")]
    MissingItem,
}

impl UploadError {
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Transport(e) => e.reasons(),
            other => vec![other.to_string()],
        }
    }
}
