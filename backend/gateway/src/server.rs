//! Main HTTP server: shared state, routing, and the serve loop.

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderMap},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use sshpair_security::{PairingService, SudoGrantService};

use crate::install_script::{self, host_without_port, is_valid_host};
use crate::{health_api, install_api, pairing_api, sudo_api};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub pairing: Arc<PairingService>,
    pub grants: Arc<SudoGrantService>,
    /// Port advertised in one-liners.
    pub port: u16,
    /// Overrides the request `Host` header in one-liners.
    pub advertise_host: Option<String>,
}

impl GatewayState {
    /// Base URL accepters should use: the configured advertise host, else the
    /// request's `Host` header, else `localhost`.
    pub fn public_base(&self, headers: &HeaderMap) -> String {
        let host = self
            .advertise_host
            .clone()
            .or_else(|| {
                headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .map(|h| host_without_port(h).to_string())
            })
            .filter(|h| is_valid_host(h))
            .unwrap_or_else(|| "localhost".to_string());
        install_script::base_url(&host, self.port)
    }
}

/// Build the API router without binding it.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/status", get(pairing_api::get_status))
        .route("/api/resolve/:code", get(pairing_api::resolve_code))
        .route("/api/pairing/:token", post(pairing_api::submit_key))
        .route("/api/publickey", get(pairing_api::get_public_key))
        .route("/api/reset", post(pairing_api::reset))
        .route("/api/grant-sudo", post(sudo_api::grant_sudo))
        .route("/api/install/:token", get(install_api::install_script))
        .route("/api/health", get(health_api::get_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server and runs until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("sshpair listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("sshpair stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
}
