use serde::{Deserialize, Serialize};

/// JSON body returned when an upload is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub message: String,
    /// Stable tag such as `schema_mismatch` or `parse_error`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_headers: Vec<String>,
}
