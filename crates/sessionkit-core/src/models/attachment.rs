use serde::{Deserialize, Serialize};

use super::numeric_id;

/// Stored file metadata behind an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(deserialize_with = "numeric_id")]
    pub id: i64,
    pub key: String,
    pub filename: String,
    pub content_type: Option<String>,
    #[serde(default)]
    pub byte_size: i64,
    pub checksum: Option<String>,
    pub created_at: Option<String>,
}

/// An uploaded file registered against a record (e.g. a user's avatar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(deserialize_with = "numeric_id")]
    pub id: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub blob: Option<Blob>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
