use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, TickerError};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const SINK_BUFFER: usize = 32; // queued frames per subscriber before it counts as slow
pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const SHUTDOWN_GRACE_SECS: u64 = 10; // forced exit after SIGINT/SIGTERM

/// Deployment environment. Gates the manual tick trigger and error detail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// Unprefixed variables honoured for deployments that predate `TICKER_*`.
/// The prefixed form wins when both are set.
const PLAIN_ENV: &[&str] = &["PORT", "NODE_ENV", "CORS_ORIGIN", "LOG_LEVEL"];

/// Top-level config (ticker.toml + TICKER_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub environment: Environment,
    /// Allowed CORS origin. `*` allows any origin (without credentials).
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Fallback log filter level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for `combined.log` and `error.log`. Empty disables file logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            environment: Environment::default(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_cors_origin() -> String {
    DEFAULT_CORS_ORIGIN.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

impl TickerConfig {
    /// Load config from defaults, a TOML file, the plain `PORT`, `NODE_ENV`,
    /// `CORS_ORIGIN` and `LOG_LEVEL` variables, then TICKER_* env vars.
    ///
    /// A `.env` file in the working directory (or a parent) is applied to
    /// the process environment first. The TOML path is resolved as:
    ///   1. Explicit path argument
    ///   2. `TICKER_CONFIG` env var
    ///   3. `./ticker.toml`
    ///
    /// A missing TOML file is not an error.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("TICKER_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: TickerConfig = Figment::from(Serialized::defaults(TickerConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::raw().only(PLAIN_ENV).map(|key| {
                match key.as_str().to_ascii_lowercase().as_str() {
                    "node_env" => "environment".into(),
                    other => other.to_string().into(),
                }
            }))
            .merge(Env::prefixed("TICKER_").ignore(&["config"]))
            .extract()?;

        Ok(config)
    }

    /// Listen address; `bind` must be a literal IPv4 or IPv6 address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| TickerError::Config(format!("invalid bind address {:?}: {e}", self.bind)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// File log directory, `None` when file logging is disabled.
    pub fn log_dir(&self) -> Option<&str> {
        Some(self.log_dir.trim()).filter(|d| !d.is_empty())
    }
}

fn default_config_path() -> String {
    "ticker.toml".to_string()
}
