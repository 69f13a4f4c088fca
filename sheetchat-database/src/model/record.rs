use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored spreadsheet row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: i64,
    pub index: u64,
    pub data: Map<String, Value>,
}

/// A row waiting to be inserted.
#[derive(Clone, Debug)]
pub struct NewRecord {
    pub index: u64,
    pub data: Map<String, Value>,
}
