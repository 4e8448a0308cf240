//! # Statbot Chat Server
//!
//! File: cli/src/commands/serve/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `statbot serve` exposes the chat pipeline over HTTP.
//!
//! ## Architecture
//!
//! - `routes.rs`: request handlers and session cookie handling
//! - `server_logic.rs`: router assembly, port binding and shutdown
//!
//! ## Examples
//!
//! ```bash
//! # Serve on the configured address (127.0.0.1:5000 by default)
//! statbot serve
//!
//! # Listen on all interfaces with a different dataset
//! statbot serve --host 0.0.0.0 --port 8080 --data ./faq.csv
//! ```
//!
//! Server startup flow:
//! 1. Load configuration and apply command-line overrides
//! 2. Read the API key and load the reference table
//! 3. Bind (with port fallback) and serve until Ctrl+C or SIGTERM
//!
use super::CommonArgs;
use crate::chat;
use crate::core::config::{self, ConfigOverrides};
use crate::core::error::Result;
use clap::Args;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

/// Request handlers for the chat endpoint.
pub mod routes;

/// Axum server setup and lifecycle.
pub mod server_logic;

/// Arguments for `statbot serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, e.g. `0.0.0.0` for all interfaces.
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on. The next free port is used if it is taken.
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Do not send CORS headers.
    #[arg(long)]
    pub no_cors: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl ServeArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host,
            port: self.port,
            data: self.common.data.clone(),
            no_cors: self.no_cors,
        }
    }
}

/// # Handle Serve Command (`handle_serve`)
///
/// Builds the effective configuration and the chat service, then runs the
/// server until shutdown.
///
/// ## Errors
///
/// Fails on invalid configuration, a missing `GEMINI_API_KEY`, or when no
/// port can be bound. A missing dataset only produces a warning.
pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    info!("Handling serve command with args: {:?}", args);

    let config = config::load_config(args.common.config.as_deref())?
        .with_overrides(&args.overrides())?;
    info!("Effective server config: {:?}", config.server);

    let service = Arc::new(chat::build_service(&config)?);
    server_logic::run_server(&config.server, service).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_from_args() {
        let args = ServeArgs {
            host: Some("0.0.0.0".parse().unwrap()),
            port: None,
            no_cors: true,
            common: CommonArgs {
                config: None,
                data: Some(PathBuf::from("faq.csv")),
            },
        };
        let overrides = args.overrides();
        assert_eq!(overrides.host, Some("0.0.0.0".parse().unwrap()));
        assert_eq!(overrides.port, None);
        assert_eq!(overrides.data, Some(PathBuf::from("faq.csv")));
        assert!(overrides.no_cors);
    }
}
