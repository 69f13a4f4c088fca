use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub row_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Metadata captured from an upload before the dataset exists.
#[derive(Clone, Debug)]
pub struct NewDataset {
    pub user_id: Uuid,
    pub name: String,
    pub filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// Who is asking to see a dataset.
#[derive(Clone, Copy, Debug)]
pub struct Viewer {
    pub user_id: Uuid,
    pub is_admin: bool,
}
