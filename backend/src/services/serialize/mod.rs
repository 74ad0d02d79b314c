//! HTTP surface of the answer-sheet pipeline.
//!
//! The provided routes are:
//! - `POST /api/serialize/upload`: multipart upload with a `userId` text field and a `file`
//!   field holding the `.csv` batch, in either order. The file is staged under
//!   `<workRoot>/temp/<uuid>/`, run through the pipeline on a blocking thread and, on success,
//!   recorded in the metadata store. The response body is the rendered report (text or PDF)
//!   and the `X-Serialize-Folder` header names the archive folder. A rejected upload gets a
//!   JSON `UploadFailure` and its staged files are removed in the background.
//!
//! - `GET /api/serialize/getall`: every recorded run, oldest first, as JSON.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod get_all;
mod upload;

const API_PATH: &str = "/api/serialize";

/// Response header carrying the canonical archive folder of a successful upload.
pub const FOLDER_HEADER: &str = "X-Serialize-Folder";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/upload", post().to(upload::process))
        .route("/getall", get().to(get_all::process))
}
