//! Evidence Binder - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use evidence_binder_backend::{
    api::{self, AppState},
    config::Config,
    db,
    error::Result,
    services::{ledger_service::PgLedger, scheduler_service},
    storage::filesystem::FilesystemStorage,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(?config, "Starting Evidence Binder");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    db::run_migrations(&db_pool).await?;
    tracing::info!("Database migrations complete");

    let storage = FilesystemStorage::new(&config.storage_path);
    storage.ensure_dir().await?;
    tracing::info!(path = %config.storage_path, "Artifact storage ready");

    let ledger = Arc::new(PgLedger::new(db_pool.clone()));
    let state = Arc::new(AppState::new(
        config.clone(),
        db_pool,
        Arc::new(storage),
        ledger,
    )?);

    scheduler_service::spawn_all(state.retention_service.clone(), &config);

    let app = api::routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
