//! # Statbot Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module loads, merges and validates the Statbot configuration. Settings
//! come from several layers, in order of precedence:
//! 1. Explicit command-line flags (`--host`, `--port`, `--data`, `--no-cors`)
//! 2. Project file: `--config <path>`, or `statbot.toml` in the working directory
//! 3. User file: `~/.config/statbot/config.toml` (platform equivalent elsewhere)
//! 4. Default values defined in the code
//!
//! The Gemini API key is never read from a config file. It comes from the
//! `GEMINI_API_KEY` environment variable, which `main` may populate from a
//! local `.env` file before any command runs.
//!
//! ## Examples
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [data]
//! path = "~/statbot/Questions_Answer.csv"
//!
//! [session]
//! idle_timeout_secs = 3600
//! ```
//!
//! ```rust
//! let cfg = config::load_config(args.config.as_deref())?
//!     .with_overrides(&overrides);
//! let key = config::read_credential(config::API_KEY_ENV)?;
//! ```
//!
use crate::core::error::{Result, StatbotError};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Name of the project-level configuration file looked up in the working directory.
pub const PROJECT_CONFIG_FILENAME: &str = "statbot.toml";

/// Default Gemini REST endpoint (model name and method are appended per call).
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

/// Network settings for `statbot serve`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: IpAddr,
    pub port: u16,
    pub enable_cors: bool,
}

/// Location of the reference table.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DataSection {
    /// Path to the CSV file (can use ~). Expanded during loading.
    pub path: PathBuf,
}

/// Lifetime of in-memory chat histories.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    /// Histories idle for longer than this are dropped. `0` keeps them forever.
    pub idle_timeout_secs: u64,
}

/// Transport settings for the outbound generation call.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSection {
    pub api_base: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_port() -> u16 {
    5000
}
fn default_data_path() -> PathBuf {
    PathBuf::from("data/Questions_Answer.csv")
}
fn default_idle_timeout_secs() -> u64 {
    24 * 60 * 60
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
        }
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Values given explicitly on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub data: Option<PathBuf>,
    pub no_cors: bool,
}

impl Config {
    /// Applies command-line overrides on top of the file-based configuration.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(data) = &overrides.data {
            self.data.path = data.clone();
        }
        if overrides.no_cors {
            self.server.enable_cors = false;
        }
        finalize(self)
    }
}

/// Loads the merged user + project configuration.
///
/// `explicit` is the `--config` path. When given, the file must exist; when
/// absent, `statbot.toml` in the working directory is used if present.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config(explicit)?;
    let merged = merge_configs(user_config.unwrap_or_default(), project_config);
    let config = finalize(merged)?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

/// Reads a required secret from the environment.
///
/// Blank values count as missing.
pub fn read_credential(var: &str) -> std::result::Result<String, StatbotError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(StatbotError::MissingCredential {
            var: var.to_string(),
        }),
    }
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "Statbot", "statbot") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config(explicit: Option<&Path>) -> Result<Option<Config>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(anyhow!(StatbotError::Config(format!(
                "Config file '{}' does not exist.",
                path.display()
            ))));
        }
        info!("Loading configuration from: {}", path.display());
        return load_config_from_path(path).map(Some);
    }

    let candidate = std::env::current_dir()
        .context("Failed to get current directory")?
        .join(PROJECT_CONFIG_FILENAME);
    if candidate.is_file() {
        info!("Loading project configuration from: {}", candidate.display());
        load_config_from_path(&candidate).map(Some)
    } else {
        debug!("No {} in the working directory.", PROJECT_CONFIG_FILENAME);
        Ok(None)
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Field-wise merge: a project value wins whenever it differs from the default.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = Config::default();

    fn pick<T: PartialEq>(project: T, user: T, default: &T) -> T {
        if &project != default {
            project
        } else {
            user
        }
    }

    Config {
        server: ServerSection {
            host: pick(project.server.host, user.server.host, &defaults.server.host),
            port: pick(project.server.port, user.server.port, &defaults.server.port),
            enable_cors: pick(
                project.server.enable_cors,
                user.server.enable_cors,
                &defaults.server.enable_cors,
            ),
        },
        data: DataSection {
            path: pick(project.data.path, user.data.path, &defaults.data.path),
        },
        session: SessionSection {
            idle_timeout_secs: pick(
                project.session.idle_timeout_secs,
                user.session.idle_timeout_secs,
                &defaults.session.idle_timeout_secs,
            ),
        },
        generation: GenerationSection {
            api_base: pick(
                project.generation.api_base,
                user.generation.api_base,
                &defaults.generation.api_base,
            ),
            connect_timeout_secs: pick(
                project.generation.connect_timeout_secs,
                user.generation.connect_timeout_secs,
                &defaults.generation.connect_timeout_secs,
            ),
            timeout_secs: pick(
                project.generation.timeout_secs,
                user.generation.timeout_secs,
                &defaults.generation.timeout_secs,
            ),
        },
    }
}

fn finalize(mut config: Config) -> Result<Config> {
    expand_config_paths(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn expand_config_paths(config: &mut Config) {
    let raw = config.data.path.to_string_lossy().into_owned();
    let expanded = shellexpand::tilde(&raw).into_owned();
    if expanded != raw {
        debug!("Expanded data path: {}", expanded);
    }
    config.data.path = PathBuf::from(expanded);
}

fn validate_config(config: &Config) -> Result<()> {
    if config.data.path.as_os_str().is_empty() {
        return Err(anyhow!(StatbotError::Config(
            "data.path cannot be empty.".to_string()
        )));
    }
    let api_base = &config.generation.api_base;
    if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
        return Err(anyhow!(StatbotError::Config(format!(
            "generation.api_base must be an http(s) URL, got '{}'.",
            api_base
        ))));
    }
    if config.generation.timeout_secs == 0 || config.generation.connect_timeout_secs == 0 {
        return Err(anyhow!(StatbotError::Config(
            "generation timeouts must be greater than 0.".to_string()
        )));
    }
    Ok(())
}
