//! Admission checks run on every file before it enters the upload queue.
//!
//! A [`Pipeline`] is an ordered list of [`FileFilter`]s. Filters either
//! decide immediately or hand back a future (e.g. image decoding), and the
//! pipeline resolves all of them into a single [`Verdict`].

mod config;
mod dimensions;
mod filter;
mod mime;
mod pipeline;

pub use config::ValidationConfig;
pub use dimensions::{DimensionFilter, ImageBounds, read_dimensions};
pub use filter::{
    DeferredCheck, ExtensionFilter, FileFilter, FilterOutcome, MimeFilter, SizeFilter,
};
pub use mime::{extension_allowed, format_size, mime_allowed};
pub use pipeline::Pipeline;

/// Reason a file was refused, ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Rejection(pub String);

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Outcome of running the pipeline on one file.
pub type Verdict = Result<(), Rejection>;

/// Errors produced while setting up validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid validation config: {0}")]
    Config(#[from] serde_json::Error),
}
