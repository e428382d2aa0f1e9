//! Server startup.

use crowdshield_core::{Error, Result};

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Bind and serve until the process is stopped.
pub async fn run(config: ServerConfig) -> Result<()> {
    let bind_addr = config.http.bind_addr;
    let state = AppState::new(config);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind {}: {}", bind_addr, e)))?;
    tracing::info!(%bind_addr, "CrowdShield backend listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Config(format!("server error: {}", e)))?;

    Ok(())
}
