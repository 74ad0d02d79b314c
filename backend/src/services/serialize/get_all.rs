//! # Serialize Record Listing Service
//!
//! Backend logic for `GET /api/serialize/getall`, the history of archived runs.
//!
//! ## Workflow
//!
//! 1.  **HTTP Request**: `process` receives the GET request; it takes no parameters.
//!
//! 2.  **Store Query**: `get_all` asks the shared `MetadataStore` for every
//!     `SerializeRecord`, oldest first. Each record names the submitter and the
//!     archive folder an upload landed in.
//!
//! 3.  **HTTP Response**: the records are returned as a JSON array, empty when
//!     nothing has been processed yet. A store failure answers
//!     `503 Service Unavailable`.

use crate::services::AppState;
use crate::store::StoreError;
use actix_web::{web, HttpResponse, Responder};
use common::model::serialize::SerializeRecord;
use log::error;

/// Actix web handler for the `GET /api/serialize/getall` endpoint.
///
/// # Arguments
/// * `state` - Shared application state holding the metadata store.
///
/// # Returns
/// - `200 OK` with a JSON array of `SerializeRecord`s on success.
/// - `503 Service Unavailable` with an error message if the store cannot be read.
pub async fn process(state: web::Data<AppState>) -> impl Responder {
    match get_all(&state) {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            error!("listing serialize records failed: {}", e);
            HttpResponse::ServiceUnavailable().body(format!("Error retrieving records: {}", e))
        }
    }
}

/// Fetches every recorded run from the metadata store.
///
/// # Arguments
/// * `state` - Application state whose `store` is queried.
///
/// # Returns
/// The records in insertion order, or the `StoreError` raised by the store.
pub fn get_all(state: &AppState) -> Result<Vec<SerializeRecord>, StoreError> {
    state.store.list()
}
