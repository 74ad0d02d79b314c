mod config;
mod pipeline;
mod services;
mod store;

use crate::config::AppConfig;
use crate::services::AppState;
use crate::store::SqliteStore;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    std::fs::create_dir_all(config.staging_root())?;
    let store = SqliteStore::open(&config.db_path).map_err(io::Error::other)?;

    let url = format!("http://{}:{}", config.host, config.port);
    info!(
        "Server running at {} (archive root {}, {:?} reports, {} rows per batch)",
        url,
        config.work_root.display(),
        config.pipeline.report_format,
        config.pipeline.expected_count
    );

    let state = web::Data::new(AppState {
        pipeline: config.pipeline.clone(),
        staging_root: config.staging_root(),
        cleanup: config.cleanup,
        max_upload_bytes: config.max_upload_bytes,
        store: Arc::new(store),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(services::serialize::configure_routes())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
