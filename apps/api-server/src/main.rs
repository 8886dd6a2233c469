//! # Murmur API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Murmur API Server on {}:{}",
        config.host,
        config.port
    );

    let state = web::Data::new(AppState::new(&config).await);

    let media_mount = config.media.local_mount();
    if let Some(mount) = &media_mount {
        // The file service resolves its root once, so it has to exist up front.
        std::fs::create_dir_all(&mount.dir)?;
        tracing::info!(path = %mount.path, dir = %mount.dir.display(), "Serving local media");
    }

    HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(handlers::configure_routes)
            .configure(|cfg| handlers::configure_media(cfg, media_mount.as_ref()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
