use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use tether_core::config::TetherConfig;
use tether_core::db::sqlite::SqliteRepository;
use tether_core::db::DatabasePool;
use tether_core::group::GroupCatalog;

/// Run the `serve` command: start the API server.
pub async fn run(config_path: &str, port: u16) -> anyhow::Result<()> {
    let config = TetherConfig::load(Path::new(config_path))?;
    config.validate()?;

    let db_path = config
        .tether
        .database
        .path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("SQLite path not configured"))?;
    let connect_str = format!("sqlite:{}?mode=rwc", db_path);
    let pool = DatabasePool::new_sqlite(&connect_str).await?;

    let repo = match pool {
        DatabasePool::Sqlite(p) => SqliteRepository::new(p),
    };
    let repo = Arc::new(repo);

    let catalog = GroupCatalog::load(Path::new(&config.tether.groups_path))?;
    info!(groups = catalog.len(), "group catalog loaded");

    let state = Arc::new(tether_web::AppState::new(repo, config, catalog));
    let app = tether_web::router(state)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    println!("Tether API listening on http://{}", addr);
    info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
