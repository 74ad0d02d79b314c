pub mod serialize;

use crate::pipeline::cleanup::RetryPolicy;
use crate::pipeline::PipelineSettings;
use crate::store::MetadataStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared by every worker; registered once with `App::app_data`.
pub struct AppState {
    pub pipeline: PipelineSettings,
    pub staging_root: PathBuf,
    pub cleanup: RetryPolicy,
    pub max_upload_bytes: usize,
    pub store: Arc<dyn MetadataStore>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::path::Path;
    use std::time::Duration;

    /// State rooted in `dir`, expecting three-row batches.
    pub(crate) fn state(dir: &Path) -> AppState {
        AppState {
            pipeline: PipelineSettings {
                expected_count: 3,
                archive_root: dir.join("archive"),
                ..PipelineSettings::default()
            },
            staging_root: dir.join("archive").join("temp"),
            cleanup: RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
            max_upload_bytes: 1024 * 1024,
            store: Arc::new(SqliteStore::open(dir.join("serialize.sqlite")).unwrap()),
        }
    }
}
