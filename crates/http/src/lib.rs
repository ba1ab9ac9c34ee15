//! HTTP adapter for the upload service.
//!
//! [`HttpClient`] implements the queue's [`Transport`](attache_uploader::Transport)
//! and the widgets' [`CollectionApi`](attache_collection::CollectionApi) and
//! [`FieldApi`](attache_collection::FieldApi) on top of `reqwest`.

pub mod client;
pub mod config;

pub use client::{Error, HttpClient};
pub use config::HttpConfig;
