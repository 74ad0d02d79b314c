use serde::{Deserialize, Serialize};

/// One row of the metadata store: who submitted a batch and where it was archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializeRecord {
    pub id: i64,
    pub user_id: String,
    pub folder_path: String,
    pub created_at: String,
}
