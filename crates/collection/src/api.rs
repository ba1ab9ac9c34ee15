//! Network seams for reconciliation requests.
//!
//! Implemented by `attache-http`; tests use in-memory mocks.

use std::future::Future;
use std::pin::Pin;

use attache_protocol::messages::{
    ChangeFormResponse, ChangeItemResponse, CreateContainerResponse, DeleteContainerRequest,
    EmptyResponse, FileRequest, ItemRequest, SortItemsRequest, SortItemsResponse,
};

use crate::error::ApiError;

/// Boxed future returned by the API traits.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Container-level requests of a collection widget.
pub trait CollectionApi: Send + Sync {
    fn create_container(&self) -> ApiFuture<'_, CreateContainerResponse>;

    fn delete_container(&self, request: DeleteContainerRequest) -> ApiFuture<'_, EmptyResponse>;

    fn delete_item(&self, request: ItemRequest) -> ApiFuture<'_, EmptyResponse>;

    fn sort_items(&self, request: SortItemsRequest) -> ApiFuture<'_, SortItemsResponse>;

    /// Fetches the edit form of an item.
    fn fetch_change_form(&self, request: ItemRequest) -> ApiFuture<'_, ChangeFormResponse>;

    /// Submits the edit form of an item.
    fn submit_change_form(
        &self,
        request: ItemRequest,
        fields: Vec<(String, String)>,
    ) -> ApiFuture<'_, ChangeItemResponse>;
}

/// Requests of a single-file field.
pub trait FieldApi: Send + Sync {
    fn delete_file(&self, request: FileRequest) -> ApiFuture<'_, EmptyResponse>;

    fn fetch_file_form(&self, request: FileRequest) -> ApiFuture<'_, ChangeFormResponse>;

    fn submit_file_form(
        &self,
        request: FileRequest,
        fields: Vec<(String, String)>,
    ) -> ApiFuture<'_, ChangeItemResponse>;
}
