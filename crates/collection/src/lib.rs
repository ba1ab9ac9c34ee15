//! Container reconciliation for remote-backed attachments.
//!
//! A [`Collection`] keeps a local picture of a server-side container
//! (collection or gallery) in step with the server: uploads show up as
//! preloaders first and become permanent items once confirmed, the
//! container id is adopted from the first completed upload, and deletes
//! and reorders are applied only from server responses.
//!
//! [`FileField`] does the same for single-file and single-image fields.

pub mod api;
pub mod collaborators;
pub mod collection;
pub mod config;
pub mod container;
pub mod error;
pub mod field;
pub mod notices;
pub mod renderer;

pub use api::{ApiFuture, CollectionApi, FieldApi};
pub use collaborators::{AutoConfirm, CollectionEvent, CollectionEvents, Notifier};
pub use collection::{BulkDeleteReport, ChangeOutcome, Collection, CollectionBuilder};
pub use config::{CollectionConfig, Endpoints, FieldConfig};
pub use container::{Container, ContainerState, ContainerStatus, PermanentItem, Preloader};
pub use error::{ApiError, CollectionError};
pub use field::{FieldEvent, FieldState, FileField, FileFieldBuilder, StoredFile};
pub use notices::{DEFAULT_NOTICE_CAPACITY, NoticeBuffer};
pub use renderer::{RenderFn, RendererRegistry};
