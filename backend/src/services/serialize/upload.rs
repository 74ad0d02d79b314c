//! # Batch Upload Service
//!
//! Backend logic for `POST /api/serialize/upload`: one answer-sheet CSV in, one
//! discrepancy report out.
//!
//! ## Workflow
//!
//! 1.  **HTTP Request**: `process` receives a `multipart/form-data` body with a
//!     `userId` text field and a single `file` field, in either order.
//!
//! 2.  **Staging**: `receive` streams the file into a fresh
//!     `<staging_root>/<uuid>/` directory, rejecting names that do not end in
//!     `.csv` and bodies over the configured size limit.
//!
//! 3.  **Pipeline**: `upload_and_serialize` hands the staged file to
//!     `pipeline::run` on a blocking thread. Schema check, range derivation,
//!     analysis, report rendering and archiving all happen there.
//!
//! 4.  **Metadata**: the archive folder is recorded in the `MetadataStore`
//!     against the submitter. If the record cannot be written the archive
//!     folder is removed again, so every archived run has a record.
//!
//! 5.  **HTTP Response**: the report bytes go back with the archive folder name
//!     in `X-Serialize-Folder`. Any failure answers with an `UploadFailure`
//!     JSON body and schedules removal of the staged files with retries.

use crate::pipeline::cleanup::{cleanup_upload, RetryPolicy};
use crate::pipeline::error::PipelineError;
use crate::pipeline::{self, PipelineInput, PipelineOutcome};
use crate::services::serialize::FOLDER_HEADER;
use crate::services::AppState;
use crate::store::StoreError;
use actix_multipart::{Multipart, MultipartError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::Local;
use common::requests::UploadFailure;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum UploadError {
    #[error("{0}")]
    BadRequest(String),
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("pipeline task did not finish: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl UploadError {
    fn bad_request(message: impl Into<String>) -> Self {
        UploadError::BadRequest(message.into())
    }

    fn multipart(e: MultipartError) -> Self {
        UploadError::Multipart(e.to_string())
    }

    fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| UploadError::Io { context, source }
    }

    fn kind(&self) -> &'static str {
        match self {
            UploadError::BadRequest(_) | UploadError::Multipart(_) => "bad_request",
            UploadError::Pipeline(e) => e.kind(),
            UploadError::Store(_) => "store_error",
            UploadError::Io { .. } => "io_error",
            UploadError::Join(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            UploadError::BadRequest(_) | UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
            UploadError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn failure(&self) -> UploadFailure {
        let missing_headers = match self {
            UploadError::Pipeline(e) => e.missing_headers().to_vec(),
            _ => Vec::new(),
        };
        UploadFailure {
            message: self.to_string(),
            kind: self.kind().to_string(),
            missing_headers,
        }
    }
}

/// Files written for one request, removed again if the request fails.
#[derive(Debug)]
struct StagedUpload {
    dir: PathBuf,
    file: Option<PathBuf>,
}

/// Actix web handler for the `POST /api/serialize/upload` endpoint.
///
/// Stages the upload, runs it through `upload_and_serialize` and turns the
/// outcome into a response. On failure the staged files are cleaned up in the
/// background after the response has been built.
///
/// # Arguments
/// * `payload` - The multipart body carrying `userId` and `file`.
/// * `state` - Shared pipeline settings, staging root and metadata store.
///
/// # Returns
/// - `200 OK` with the rendered report as body and the archive folder in `X-Serialize-Folder`.
/// - `400 Bad Request` with an `UploadFailure` when the upload itself is at fault.
/// - `500 Internal Server Error` with an `UploadFailure` otherwise.
pub async fn process(payload: Multipart, state: web::Data<AppState>) -> HttpResponse {
    let mut staged = StagedUpload {
        dir: state.staging_root.join(Uuid::new_v4().to_string()),
        file: None,
    };

    match upload_and_serialize(payload, &state, &mut staged).await {
        Ok(outcome) => {
            if let Err(e) = fs::remove_dir(&staged.dir) {
                debug!("staging dir {} not removed: {}", staged.dir.display(), e);
            }
            HttpResponse::Ok()
                .content_type(outcome.report.format.content_type())
                .insert_header((FOLDER_HEADER, outcome.entry.canonical_folder_name))
                .body(outcome.report.bytes)
        }
        Err(e) => {
            if e.status().is_client_error() {
                warn!("upload rejected ({}): {}", e.kind(), e);
            } else {
                error!("upload failed ({}): {}", e.kind(), e);
            }
            spawn_cleanup(staged, state.cleanup);
            HttpResponse::build(e.status()).json(e.failure())
        }
    }
}

/// Receives the upload, runs the pipeline and records the archived run.
///
/// # Arguments
/// * `payload` - The multipart body, drained by `receive`.
/// * `state` - Source of the pipeline settings and the metadata store.
/// * `staged` - Filled in with whatever was written to the staging dir, so the
///   caller can clean up after a failure.
///
/// # Returns
/// The `PipelineOutcome` of an archived and recorded run, or the first
/// `UploadError` raised along the way.
async fn upload_and_serialize(
    payload: Multipart,
    state: &AppState,
    staged: &mut StagedUpload,
) -> Result<PipelineOutcome, UploadError> {
    let (user_id, file_name) = receive(payload, staged, state.max_upload_bytes).await?;
    let upload_path = staged
        .file
        .clone()
        .ok_or_else(|| UploadError::bad_request("Missing file"))?;

    let input = PipelineInput {
        upload_path,
        file_name,
        submitted_by: user_id,
        ingested_at: Local::now(),
    };
    let settings = state.pipeline.clone();
    let store = Arc::clone(&state.store);

    let handle = tokio::task::spawn_blocking(move || -> Result<PipelineOutcome, UploadError> {
        let outcome = pipeline::run(&settings, &input)?;
        match store.record(&input.submitted_by, &outcome.entry.canonical_folder_name) {
            Ok(record) => {
                info!("recorded run {} for user {}", record.id, record.user_id);
                Ok(outcome)
            }
            Err(e) => {
                let folder = settings.archive_root.join(&outcome.entry.canonical_folder_name);
                match fs::remove_dir_all(&folder) {
                    Ok(()) => warn!("removed unrecorded archive folder {}", folder.display()),
                    Err(remove_err) => error!(
                        "unrecorded archive folder {} left behind: {}",
                        folder.display(),
                        remove_err
                    ),
                }
                Err(e.into())
            }
        }
    });
    handle.await?
}

/// Drains the multipart body, writing the `file` field into the staging dir.
///
/// Returns `(userId, original file name)`.
async fn receive(
    mut payload: Multipart,
    staged: &mut StagedUpload,
    max_bytes: usize,
) -> Result<(String, String), UploadError> {
    let mut user_id: Option<String> = None;
    let mut file_name: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(UploadError::multipart)?;
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match field_name.as_deref() {
            Some("userId") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    bytes.extend_from_slice(&chunk.map_err(UploadError::multipart)?);
                }
                let text = String::from_utf8(bytes)
                    .map_err(|_| UploadError::bad_request("userId is not valid UTF-8"))?;
                user_id = Some(text.trim().to_string());
            }

            Some("file") => {
                if staged.file.is_some() {
                    return Err(UploadError::bad_request("Only one file may be uploaded"));
                }
                let raw_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                let name = Path::new(&raw_name)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| UploadError::bad_request("The file must have a name"))?;
                if !name.to_ascii_lowercase().ends_with(".csv") {
                    return Err(UploadError::bad_request("The file must end with .csv"));
                }

                fs::create_dir_all(&staged.dir).map_err(UploadError::io("cannot create staging dir"))?;
                let path = staged.dir.join(&name);
                let file = File::create(&path).map_err(UploadError::io("cannot stage upload"))?;
                staged.file = Some(path);

                let mut writer = BufWriter::new(file);
                let mut written = 0usize;
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(UploadError::multipart)?;
                    written += chunk.len();
                    if written > max_bytes {
                        return Err(UploadError::bad_request(format!(
                            "The file exceeds the {} MB upload limit",
                            max_bytes / (1024 * 1024)
                        )));
                    }
                    writer
                        .write_all(&chunk)
                        .map_err(UploadError::io("cannot stage upload"))?;
                }
                writer.flush().map_err(UploadError::io("cannot stage upload"))?;
                debug!("staged {} ({} bytes)", name, written);
                file_name = Some(name);
            }

            _ => {}
        }
    }

    let user_id = user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| UploadError::bad_request("Missing userId"))?;
    let file_name = file_name.ok_or_else(|| UploadError::bad_request("Missing file"))?;
    Ok((user_id, file_name))
}

/// Best effort; the response has already been decided.
fn spawn_cleanup(staged: StagedUpload, policy: RetryPolicy) {
    tokio::task::spawn_blocking(move || {
        match cleanup_upload(staged.file.as_deref(), &staged.dir, policy) {
            Ok(attempts) => debug!(
                "cleaned up {} after {} attempt(s)",
                staged.dir.display(),
                attempts
            ),
            Err(e) => error!("staged upload left behind: {}", e),
        }
    });
}
