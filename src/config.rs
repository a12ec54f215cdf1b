use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub notifications: NotificationSettings,
    pub photos: PhotoSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 secret shared with the token issuer
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    pub endpoint: String,
    #[serde(default = "default_notification_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotificationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Selector reruns after losing a pending-attempt race
    #[serde(default = "default_max_selection_retries")]
    pub max_selection_retries: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            max_selection_retries: default_max_selection_retries(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl MatchingSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_notification_timeout_secs() -> u64 { 5 }
fn default_max_selection_retries() -> u32 { 3 }
fn default_request_timeout_ms() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Configuration file (config/default.toml)
    /// 2. Local overrides (config/local.toml)
    /// 3. Environment variables (prefixed with SPARK__)
    /// 4. DATABASE_URL, when set
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SPARK__SERVER__PORT -> server.port
            .add_source(environment());

        with_database_url_override(builder)?.build()?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment());

        with_database_url_override(builder)?.build()?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SPARK")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn with_database_url_override(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => builder.set_override("database.url", url),
        Err(_) => Ok(builder),
    }
}
