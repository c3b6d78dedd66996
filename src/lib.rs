//! Three-option polls with one vote per voter and a runner-up winner rule.
//!
//! Polls and votes live in a single SQLite file. A voter is identified by the
//! `X-Forwarded-For` header, or the peer address when the header is absent.
//! Closing a poll is reserved to the identity that created it.
//!
//! ```sh
//! RUST_LOG=info DATABASE_URL=sqlite://second_game.db PORT=22222 cargo run
//! ```
use std::net::SocketAddr;

use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod id;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;

use config::Config;
use error::ServerError;
use state::AppState;

pub async fn start_server() -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Opening database...");
    let state = AppState::from_config(&config).await?;

    let app = routes::create_routes(state);

    let address = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
