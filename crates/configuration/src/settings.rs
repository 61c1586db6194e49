use crate::error::ConfigError;
use chrono::FixedOffset;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing values fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub services: ServicesConfig,
    pub telegram: TelegramConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

/// Where the HTTP API listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Locations of the external recognition and persistence services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Endpoint that turns a meter photo into `{ meterNumber, reading }`.
    pub recognition_url: Option<String>,
    /// Endpoint that stores readings. Without it readings live in memory only.
    pub persistence_url: Option<String>,
    /// The user the persisted readings belong to.
    pub user_id: String,
    pub request_timeout_secs: u64,
}

/// Telegram notifications sent after a reading is saved.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: String,
    pub chat_id: String,
    pub api_base: String,
    /// Upper bound for one `sendMessage` call, so a hung Bot API cannot stall notifications.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Offset from UTC, in minutes, used for the date and time columns.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, e.g. `info` or `web_server=debug,info`.
    pub filter: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            recognition_url: None,
            persistence_url: None,
            user_id: "default_user".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Checks cross-field rules that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must not be 0".into()));
        }
        if self.services.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "services.request_timeout_secs must be positive".into(),
            ));
        }
        if self.services.user_id.trim().is_empty() {
            return Err(ConfigError::ValidationError("services.user_id must not be empty".into()));
        }
        if self.telegram.enabled && (self.telegram.token.is_empty() || self.telegram.chat_id.is_empty()) {
            return Err(ConfigError::ValidationError(
                "telegram.enabled requires telegram.token and telegram.chat_id".into(),
            ));
        }
        if self.telegram.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("telegram.timeout_secs must be positive".into()));
        }
        self.export.display_offset()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            ConfigError::ValidationError(format!("server.host is not an IP address: {}", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExportConfig {
    pub fn display_offset(&self) -> Result<FixedOffset, ConfigError> {
        if !(-1439..=1439).contains(&self.utc_offset_minutes) {
            return Err(ConfigError::ValidationError(format!(
                "export.utc_offset_minutes must lie within -1439..=1439, got {}",
                self.utc_offset_minutes
            )));
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::ValidationError("export.utc_offset_minutes is out of range".into())
        })
    }
}
