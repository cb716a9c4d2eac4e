use actix_web::middleware::{Compress, DefaultHeaders};
use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use crate::api::{AppStartTime, VisitorExtractor, api_scope};
use crate::services::ViewService;
use crate::storage::StorageFactory;

use super::shutdown;

pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let config = crate::config::get_config();

    let storage = StorageFactory::create().await.map_err(|e| {
        tracing::error!("Server startup failed: {}", e);
        e
    })?;
    let view_service = Arc::new(ViewService::from_config(storage.clone()));
    let extractor = web::Data::new(VisitorExtractor::from_config());

    let route_prefix = config.api.route_prefix.clone();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    // Clone db reference before storage moves into HttpServer closure
    let db_for_shutdown = storage.get_db().clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(view_service.clone()))
            .app_data(extractor.clone())
            .app_data(web::Data::new(app_start_time.clone()))
            .service(api_scope(&route_prefix))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = shutdown::listen_for_shutdown(db_for_shutdown) => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
