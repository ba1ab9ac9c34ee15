//! Form field names used by the chunked upload endpoint.

/// Multipart field carrying the raw chunk bytes.
pub const FILE_FIELD: &str = "file";

/// Per-file identity shared by every chunk of one upload.
pub const UUID_FIELD: &str = "uuid";

/// Zero-based index of the chunk being sent.
pub const CHUNK_INDEX_FIELD: &str = "chunkIndex";

/// Total number of chunks the server should expect for the file.
pub const TOTAL_CHUNK_COUNT_FIELD: &str = "totalChunkCount";

/// Target container, omitted while the container is unassigned.
pub const COLLECTION_ID_FIELD: &str = "collectionId";

/// Requested ordinal of the item inside its container.
pub const ORDER_FIELD: &str = "order";
