pub mod middleware;
pub mod routes;

use crate::{config::Config, storage::ImageStore, uploads::UploadService};
use actix_web::{web, App, HttpServer};
use std::sync::Arc;

pub use middleware::ProcessTime;
pub use routes::configure;

/// Shared by every handler through `web::Data`.
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: UploadService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ImageStore>) -> Self {
        let uploads = UploadService::new(store, config.storage.clone());
        Self {
            config: Arc::new(config),
            uploads,
        }
    }
}

/// Runs the HTTP server until it receives a shutdown signal.
pub async fn run(state: AppState) -> std::io::Result<()> {
    let bind = (state.config.server.host.clone(), state.config.server.port);
    let store = state.uploads.store().clone();
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(ProcessTime)
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await?;

    log::info!("👋 Server stopped, closing storage");
    store.close().await;
    Ok(())
}
