//! # Statbot HTTP Server
//!
//! File: cli/src/commands/serve/server_logic.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Binds the listener and runs the axum application for `statbot serve`:
//! - port fallback when the requested port is taken
//! - request tracing and optional permissive CORS
//! - graceful shutdown on Ctrl+C or SIGTERM
//!
//! ## Examples
//!
//! ```rust
//! let service = Arc::new(chat::build_service(&config)?);
//! server_logic::run_server(&config.server, service).await?;
//! ```
//!
use super::routes;
use crate::chat::ChatService;
use crate::core::config::ServerSection;
use crate::core::error::Result;
use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

/// Consecutive ports tried when the configured one is busy.
const MAX_PORT_ATTEMPTS: u16 = 10;

/// # Run HTTP Server (`run_server`)
///
/// Binds to the configured host (falling forward to the next free port when
/// needed), prints the connection details and serves until a shutdown signal
/// arrives.
///
/// ## Errors
///
/// Returns an error if no port can be bound within `MAX_PORT_ATTEMPTS`
/// attempts or if the server itself fails.
pub async fn run_server(server: &ServerSection, service: Arc<ChatService>) -> Result<()> {
    let listener = bind_available_port(server.host, server.port, MAX_PORT_ATTEMPTS).await?;
    let addr = listener
        .local_addr()
        .context("Failed to read the bound listener address")?;

    let reference = match service.reference_rows() {
        Some(rows) => format!("{} rows", rows),
        None => "none (answering without reference data)".to_string(),
    };
    let app = create_app(service, server.enable_cors);

    println!("\n=================================================================");
    println!("🤖 Statbot is listening");
    println!("🌐 Local URL:         http://localhost:{}", addr.port());
    println!("⚙️  Binding to address: {}", addr);
    println!("📚 Reference data:    {}", reference);
    println!("🔒 CORS enabled:      {}", server.enable_cors);
    println!("=================================================================\n");
    println!("Server starting! Press Ctrl+C to stop.");

    info!("Starting Statbot server on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    println!("\nServer shutdown complete.");
    Ok(())
}

/// # Shutdown Signal (`shutdown_signal`)
///
/// Resolves on Ctrl+C, or on SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
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

/// # Bind Available Port (`bind_available_port`)
///
/// Binds `host:start_port`, moving on to the following ports while the
/// current one is unavailable. The bound listener is returned so the port
/// cannot be taken between the check and the server start. Port `0` lets
/// the OS choose.
async fn bind_available_port(
    host: IpAddr,
    start_port: u16,
    max_attempts: u16,
) -> Result<TcpListener> {
    let mut current_port = start_port;

    for attempt in 0..max_attempts {
        let addr = SocketAddr::new(host, current_port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if attempt > 0 {
                    info!(
                        "Port {} was unavailable, bound to port {} instead.",
                        start_port, current_port
                    );
                }
                return Ok(listener);
            }
            Err(e) => {
                warn!(
                    "Attempt {}: Port {} on host {} is unavailable (Error: {}). Trying next port...",
                    attempt + 1,
                    current_port,
                    host,
                    e
                );
                current_port = match current_port.checked_add(1) {
                    Some(next) if start_port != 0 => next,
                    _ => break,
                };
            }
        }
    }

    anyhow::bail!(
        "Could not find an available port on host {} starting from port {} after trying {} ports.",
        host,
        start_port,
        max_attempts
    )
}

/// # Create Axum Application (`create_app`)
///
/// Mounts the chat routes on a router sharing `service`, wrapped in request
/// tracing and (optionally) permissive CORS.
pub fn create_app(service: Arc<ChatService>, enable_cors: bool) -> Router {
    let cors_layer = if enable_cors {
        info!("CORS middleware enabled (permissive).");
        CorsLayer::permissive()
    } else {
        info!("CORS middleware disabled.");
        CorsLayer::new()
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default())
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(routes::index))
        .route("/chat", post(routes::chat))
        .route("/health", get(routes::health))
        .with_state(service)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(cors_layer),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_bind_available_port_os_assigned() -> Result<()> {
        let host: IpAddr = Ipv4Addr::LOCALHOST.into();
        let listener = bind_available_port(host, 0, 3).await?;
        assert_ne!(listener.local_addr()?.port(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_bind_available_port_start_occupied() -> Result<()> {
        let host: IpAddr = Ipv4Addr::LOCALHOST.into();

        // Occupy an OS-assigned port, then ask for that exact port.
        let occupied = TcpListener::bind(SocketAddr::new(host, 0)).await?;
        let start_port = occupied.local_addr()?.port();

        match bind_available_port(host, start_port, 5).await {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                assert!(port > start_port);
                assert!(port < start_port.saturating_add(5));
            }
            // The following ports may all be taken on a busy machine.
            Err(e) => assert!(e.to_string().contains("Could not find an available port")),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_signal_creation() {
        let shutdown_future = shutdown_signal();
        drop(shutdown_future);
    }
}
