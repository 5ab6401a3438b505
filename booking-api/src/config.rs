//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `BOOKING_`, nested keys separated by `__`,
//!    e.g. `BOOKING_DATABASE__URL`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/booking-api/config.toml
//! 4. System directory: /etc/booking-api/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

const ENV_PREFIX: &str = "BOOKING_";
const CONFIG_DIR: &str = "booking-api";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token validation configuration
    pub auth: AuthConfig,

    /// Per-endpoint-class request deadlines
    #[serde(default)]
    pub deadlines: DeadlineConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Seconds in-flight requests get to drain after a shutdown signal
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// Bearer token validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer
    pub token_secret: String,

    /// Expected `iss` claim, if any
    #[serde(default)]
    pub issuer: Option<String>,
}

/// Request deadlines in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineConfig {
    /// Single-entity reads
    #[serde(default = "default_read_ms")]
    pub read_ms: u64,

    /// Filtered list reads
    #[serde(default = "default_list_ms")]
    pub list_ms: u64,

    /// Writes
    #[serde(default = "default_write_ms")]
    pub write_ms: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            read_ms: default_read_ms(),
            list_ms: default_list_ms(),
            write_ms: default_write_ms(),
        }
    }
}

impl DeadlineConfig {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn list(&self) -> Duration {
        Duration::from_millis(self.list_ms)
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS mode: permissive, restrictive or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    1
}

fn default_read_ms() -> u64 {
    1000
}

fn default_list_ms() -> u64 {
    2000
}

fn default_write_ms() -> u64 {
    3000
}

fn default_body_limit_mb() -> usize {
    1
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Config files are merged lowest priority first; environment variables
    /// override all of them.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Skips the search path; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(CONFIG_DIR).join("config.toml"));

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "booking-api".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                environment: default_environment(),
                shutdown_grace_secs: default_shutdown_grace(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/booking".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connection_timeout_secs: default_connection_timeout(),
                max_retries: default_max_retries(),
                retry_delay_secs: default_retry_delay(),
            },
            auth: AuthConfig {
                token_secret: String::new(),
                issuer: None,
            },
            deadlines: DeadlineConfig::default(),
            middleware: MiddlewareConfig::default(),
        }
    }
}
