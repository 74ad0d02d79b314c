use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classified failure of one pipeline run. The first one raised halts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("CSV file has missing or incorrect headers: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("cannot derive a LITHO range from file name '{0}'")]
    MalformedFilename(String),

    #[error("failed to parse the CSV file: {0}")]
    Parse(#[from] csv::Error),

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Lookup of an archive entry that is not there. The upload path never
    /// raises it; a vanished staged upload is an `Io` failure.
    #[allow(dead_code)]
    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to render PDF report: {0}")]
    Render(#[from] lopdf::Error),
}

impl PipelineError {
    pub fn io(context: &'static str, path: &Path, source: io::Error) -> Self {
        PipelineError::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable tag used in JSON bodies and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SchemaMismatch { .. } => "schema_mismatch",
            PipelineError::MalformedFilename(_) => "malformed_filename",
            PipelineError::Parse(_) => "parse_error",
            PipelineError::Io { .. } => "io_error",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Render(_) => "render_error",
        }
    }

    /// Schema entries that failed validation; empty for every other kind.
    pub fn missing_headers(&self) -> &[String] {
        match self {
            PipelineError::SchemaMismatch { missing } => missing,
            _ => &[],
        }
    }

    /// Whether the failure is the uploader's fault rather than the server's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::SchemaMismatch { .. }
                | PipelineError::MalformedFilename(_)
                | PipelineError::Parse(_)
        )
    }
}

/// Staged upload artifacts that could not be removed within the retry budget.
#[derive(Debug, Error)]
#[error("could not remove {} after {attempts} attempts: {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    pub attempts: u32,
    #[source]
    pub source: io::Error,
}
