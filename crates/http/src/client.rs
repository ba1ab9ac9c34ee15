//! Upload service client.
//!
//! Async HTTP client using `reqwest`. Reconciliation requests are sent as
//! urlencoded forms, chunks as multipart forms; every request carries the
//! widget's extra parameters.

use std::future::Future;
use std::pin::Pin;

use attache_collection::{ApiError, ApiFuture, CollectionApi, Endpoints, FieldApi};
use attache_protocol::constants;
use attache_protocol::envelope::{EnvelopeError, error_messages, parse_response};
use attache_protocol::messages::{
    ChangeFormResponse, ChangeItemResponse, ChunkReply, CreateContainerResponse,
    DeleteContainerRequest, EmptyResponse, FileRequest, ItemRequest, SortItemsRequest,
    SortItemsResponse,
};
use attache_uploader::{ChunkRequest, Transport, TransportError};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::HttpConfig;

/// Errors from the upload service client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// 2xx response that carried errors, or could not be decoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl From<Error> for TransportError {
    fn from(e: Error) -> Self {
        match e {
            Error::Http(e) => TransportError::Network(e.to_string()),
            Error::Api { status, body } => TransportError::Status {
                status,
                errors: error_messages(body.as_bytes()),
            },
            Error::Envelope(EnvelopeError::Rejected {
                errors,
                prevent_retry,
            }) => TransportError::Rejected {
                errors,
                prevent_retry,
            },
            Error::Envelope(e @ EnvelopeError::Json(_)) => TransportError::Network(e.to_string()),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Http(e) => ApiError::Network(e.to_string()),
            Error::Api { status, body } => ApiError::Status {
                status,
                errors: error_messages(body.as_bytes()),
            },
            Error::Envelope(EnvelopeError::Rejected { errors, .. }) => {
                ApiError::Rejected { errors }
            }
            Error::Envelope(e @ EnvelopeError::Json(_)) => ApiError::Decode(e.to_string()),
        }
    }
}

type Fields = Vec<(String, String)>;

/// Client for one widget's endpoints.
pub struct HttpClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    base_url: String,
}

impl HttpClient {
    pub fn new(endpoints: Endpoints, config: &HttpConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoints,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url, endpoint)
        }
    }

    /// Widget parameters followed by `fields`.
    fn with_params(&self, fields: Fields) -> Fields {
        self.endpoints
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(fields)
            .collect()
    }

    /// Checks the status and decodes the envelope.
    async fn read<T: DeserializeOwned>(url: &str, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        Ok(parse_response(&body)?)
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, fields: Fields) -> Result<T, Error> {
        let url = self.url(endpoint);
        debug!(%url, "POST");
        let resp = self
            .http
            .post(&url)
            .form(&self.with_params(fields))
            .send()
            .await?;
        Self::read(&url, resp).await
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, fields: Fields) -> Result<T, Error> {
        let url = self.url(endpoint);
        debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .query(&self.with_params(fields))
            .send()
            .await?;
        Self::read(&url, resp).await
    }

    /// Sends one chunk as a multipart form.
    pub async fn upload_chunk(&self, request: ChunkRequest) -> Result<ChunkReply, Error> {
        let url = self.url(&self.endpoints.upload_url);
        let mime = if request.mime.is_empty() {
            "application/octet-stream"
        } else {
            request.mime.as_str()
        };
        let file = Part::bytes(request.data.to_vec())
            .file_name(request.file_name.clone())
            .mime_str(mime)?;

        let mut form = Form::new();
        for (name, value) in self.with_params(Vec::new()) {
            form = form.text(name, value);
        }
        for (name, value) in request.header.form_fields() {
            form = form.text(name, value);
        }
        form = form.part(constants::FILE_FIELD, file);

        debug!(
            %url,
            uuid = %request.header.uuid,
            chunk = request.header.chunk_index,
            total = request.header.total_chunk_count,
            "uploading chunk"
        );
        let resp = self.http.post(&url).multipart(form).send().await?;
        Self::read(&url, resp).await
    }

    pub async fn create_container(&self) -> Result<CreateContainerResponse, Error> {
        self.post(&self.endpoints.create_url, Vec::new()).await
    }

    pub async fn delete_container(
        &self,
        request: DeleteContainerRequest,
    ) -> Result<EmptyResponse, Error> {
        let fields = vec![(
            constants::COLLECTION_ID_FIELD.to_string(),
            request.collection_id.to_string(),
        )];
        self.post(&self.endpoints.delete_url, fields).await
    }

    pub async fn delete_item(&self, request: ItemRequest) -> Result<EmptyResponse, Error> {
        self.post(&self.endpoints.delete_item_url, item_fields(&request))
            .await
    }

    pub async fn sort_items(&self, request: SortItemsRequest) -> Result<SortItemsResponse, Error> {
        let fields = vec![
            (
                constants::COLLECTION_ID_FIELD.to_string(),
                request.collection_id.to_string(),
            ),
            ("orderList".to_string(), request.order_list),
        ];
        self.post(&self.endpoints.sort_url, fields).await
    }

    pub async fn fetch_change_form(&self, request: ItemRequest) -> Result<ChangeFormResponse, Error> {
        self.get(&self.endpoints.change_url, item_fields(&request))
            .await
    }

    pub async fn submit_change_form(
        &self,
        request: ItemRequest,
        fields: Fields,
    ) -> Result<ChangeItemResponse, Error> {
        let mut all = item_fields(&request);
        all.extend(fields);
        self.post(&self.endpoints.change_url, all).await
    }

    pub async fn delete_file(&self, request: FileRequest) -> Result<EmptyResponse, Error> {
        self.post(&self.endpoints.delete_url, file_fields(&request))
            .await
    }

    pub async fn fetch_file_form(&self, request: FileRequest) -> Result<ChangeFormResponse, Error> {
        self.get(&self.endpoints.change_url, file_fields(&request))
            .await
    }

    pub async fn submit_file_form(
        &self,
        request: FileRequest,
        fields: Fields,
    ) -> Result<ChangeItemResponse, Error> {
        let mut all = file_fields(&request);
        all.extend(fields);
        self.post(&self.endpoints.change_url, all).await
    }
}

fn item_fields(request: &ItemRequest) -> Fields {
    vec![
        (
            constants::COLLECTION_ID_FIELD.to_string(),
            request.collection_id.to_string(),
        ),
        ("itemId".to_string(), request.item_id.to_string()),
        ("itemType".to_string(), request.item_type.to_string()),
    ]
}

fn file_fields(request: &FileRequest) -> Fields {
    vec![("instanceId".to_string(), request.instance_id.to_string())]
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl Transport for HttpClient {
    fn send_chunk(
        &self,
        request: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkReply, TransportError>> + Send + '_>> {
        Box::pin(async move { Ok(self.upload_chunk(request).await?) })
    }
}

impl CollectionApi for HttpClient {
    fn create_container(&self) -> ApiFuture<'_, CreateContainerResponse> {
        Box::pin(async move { Ok(HttpClient::create_container(self).await?) })
    }

    fn delete_container(&self, request: DeleteContainerRequest) -> ApiFuture<'_, EmptyResponse> {
        Box::pin(async move { Ok(HttpClient::delete_container(self, request).await?) })
    }

    fn delete_item(&self, request: ItemRequest) -> ApiFuture<'_, EmptyResponse> {
        Box::pin(async move { Ok(HttpClient::delete_item(self, request).await?) })
    }

    fn sort_items(&self, request: SortItemsRequest) -> ApiFuture<'_, SortItemsResponse> {
        Box::pin(async move { Ok(HttpClient::sort_items(self, request).await?) })
    }

    fn fetch_change_form(&self, request: ItemRequest) -> ApiFuture<'_, ChangeFormResponse> {
        Box::pin(async move { Ok(HttpClient::fetch_change_form(self, request).await?) })
    }

    fn submit_change_form(
        &self,
        request: ItemRequest,
        fields: Fields,
    ) -> ApiFuture<'_, ChangeItemResponse> {
        Box::pin(async move { Ok(HttpClient::submit_change_form(self, request, fields).await?) })
    }
}

impl FieldApi for HttpClient {
    fn delete_file(&self, request: FileRequest) -> ApiFuture<'_, EmptyResponse> {
        Box::pin(async move { Ok(HttpClient::delete_file(self, request).await?) })
    }

    fn fetch_file_form(&self, request: FileRequest) -> ApiFuture<'_, ChangeFormResponse> {
        Box::pin(async move { Ok(HttpClient::fetch_file_form(self, request).await?) })
    }

    fn submit_file_form(
        &self,
        request: FileRequest,
        fields: Fields,
    ) -> ApiFuture<'_, ChangeItemResponse> {
        Box::pin(async move { Ok(HttpClient::submit_file_form(self, request, fields).await?) })
    }
}
