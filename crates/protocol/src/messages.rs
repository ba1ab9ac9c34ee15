use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants;
use crate::types::{ContainerId, ItemId, ItemPayload, ItemType, OrderMap};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Metadata sent alongside every chunk of an upload.
///
/// The server reassembles a file from its chunks by `uuid` and `chunk_index`,
/// so chunk-level retries never corrupt the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkHeader {
    pub uuid: Uuid,
    pub chunk_index: u32,
    pub total_chunk_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<ContainerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl ChunkHeader {
    /// Flattens the header into multipart text fields.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (constants::UUID_FIELD, self.uuid.to_string()),
            (constants::CHUNK_INDEX_FIELD, self.chunk_index.to_string()),
            (
                constants::TOTAL_CHUNK_COUNT_FIELD,
                self.total_chunk_count.to_string(),
            ),
        ];
        if let Some(id) = self.collection_id {
            fields.push((constants::COLLECTION_ID_FIELD, id.to_string()));
        }
        if let Some(order) = self.order {
            fields.push((constants::ORDER_FIELD, order.to_string()));
        }
        fields
    }

    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 >= self.total_chunk_count
    }
}

/// Deletes a whole container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteContainerRequest {
    pub collection_id: ContainerId,
}

/// Addresses one item of a container (delete, change form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub collection_id: ContainerId,
    pub item_id: ItemId,
    pub item_type: ItemType,
}

/// Persists a new item order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortItemsRequest {
    pub collection_id: ContainerId,
    /// Comma-separated item ids in display order.
    pub order_list: String,
}

impl SortItemsRequest {
    pub fn new(collection_id: ContainerId, ids: &[ItemId]) -> Self {
        let order_list = ids
            .iter()
            .map(ItemId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            collection_id,
            order_list,
        }
    }
}

/// Addresses the instance bound to a single-file field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub instance_id: ItemId,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Acknowledgement without data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyResponse {}

/// Returned by the create endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateContainerResponse {
    #[serde(alias = "collectionId")]
    pub collection_id: ContainerId,
}

/// Returned by the sort endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortItemsResponse {
    #[serde(default)]
    pub order_map: OrderMap,
}

/// Edit form markup for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFormResponse {
    pub form: String,
}

/// Result of submitting an edit form.
///
/// Either the refreshed display fields, or per-field validation errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeItemResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub file_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_errors: Option<HashMap<String, Vec<String>>>,
}

/// Reply to one chunk.
///
/// Intermediate chunks are acknowledged with `{}`; the final chunk carries
/// the confirmed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkReply {
    Item(Box<ItemPayload>),
    Ack(EmptyResponse),
}

impl ChunkReply {
    pub fn into_item(self) -> Option<ItemPayload> {
        match self {
            Self::Item(item) => Some(*item),
            Self::Ack(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::parse_response;

    fn header(chunk_index: u32, total: u32) -> ChunkHeader {
        ChunkHeader {
            uuid: Uuid::nil(),
            chunk_index,
            total_chunk_count: total,
            collection_id: None,
            order: Some(4),
        }
    }

    #[test]
    fn chunk_header_form_fields() {
        let fields = header(1, 3).form_fields();
        let names: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["uuid", "chunkIndex", "totalChunkCount", "order"]);
        assert_eq!(fields[1].1, "1");
    }

    #[test]
    fn chunk_header_includes_collection_when_known() {
        let mut h = header(0, 1);
        h.collection_id = Some(12);
        assert!(h.form_fields().contains(&("collectionId", "12".to_string())));
    }

    #[test]
    fn chunk_header_last() {
        assert!(!header(0, 2).is_last());
        assert!(header(1, 2).is_last());
        assert!(header(0, 1).is_last());
    }

    #[test]
    fn sort_request_joins_ids() {
        let req = SortItemsRequest::new(9, &[3, 1, 2]);
        assert_eq!(req.order_list, "3,1,2");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"orderList\":\"3,1,2\""));
        assert!(json.contains("\"collectionId\":9"));
    }

    #[test]
    fn item_request_field_names() {
        let req = ItemRequest {
            collection_id: 1,
            item_id: 2,
            item_type: ItemType::Image,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"collectionId":1,"itemId":2,"itemType":"image"}"#);
    }

    #[test]
    fn chunk_reply_ack_and_item() {
        let ack: ChunkReply = parse_response(b"{}").unwrap();
        assert!(ack.into_item().is_none());

        let item: ChunkReply =
            parse_response(br#"{"id":4,"itemType":"image","name":"a.png"}"#).unwrap();
        assert_eq!(item.into_item().unwrap().id, 4);
    }

    #[test]
    fn sort_response_missing_map_is_empty() {
        let resp: SortItemsResponse = parse_response(b"{}").unwrap();
        assert!(resp.order_map.is_empty());
    }

    #[test]
    fn change_item_form_errors() {
        let resp: ChangeItemResponse =
            parse_response(br#"{"form_errors":{"title":["Required"]}}"#).unwrap();
        assert_eq!(resp.form_errors.unwrap()["title"], vec!["Required".to_string()]);
    }
}
