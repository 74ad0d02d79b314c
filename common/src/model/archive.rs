use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where one successful run left its artifacts.
///
/// `canonical_folder_name` is `<stem>-<ingestion millis>` and is the value handed
/// to the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub canonical_folder_name: String,
    pub original_file_path: PathBuf,
    pub report_file_path: PathBuf,
}
