mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use missive_api::pages::Pages;
use missive_api::{AppState, AppStateInner, SessionConfig};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "missive=debug,missive_api=debug,missive_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = missive_db::Database::open(&config.db_path)?;
    let pages = Pages::new()?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        pages,
        session: SessionConfig {
            secret: config.secret.clone(),
            ttl_days: config.session_days,
            secure_cookies: config.secure_cookies,
        },
    });

    let app = missive_api::router(state, &config.static_dir);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Missive listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
