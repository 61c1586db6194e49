use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, ExportConfig, LoggingConfig, ServerConfig, ServicesConfig, TelegramConfig,
};

/// Prefix for environment overrides, e.g. `METER__TELEGRAM__TOKEN`.
const ENV_PREFIX: &str = "METER";

/// Command-line arguments for locating the configuration file.
#[cfg(feature = "clap")]
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Path to the TOML configuration file. A missing file means all defaults.
    #[arg(long, short, default_value = "config.toml")]
    pub config: std::path::PathBuf,
}

/// Loads the application configuration.
///
/// This function is the primary entry point for this crate. It reads the TOML
/// file at `path` if it exists, layers `METER__`-prefixed environment variables
/// on top, deserializes the result into our strongly-typed `Config` struct and
/// validates it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    finish(builder)
}

/// Loads configuration from TOML text only, without consulting the environment.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml));

    finish(builder)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Config, ConfigError> {
    let config = builder.build()?.try_deserialize::<Config>()?;
    config.validate()?;
    tracing::debug!(?config.server, "Configuration loaded.");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = load_config_from_str("").unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.services.user_id, "default_user");
        assert_eq!(config.services.request_timeout().as_secs(), 10);
        assert!(!config.telegram.enabled);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.timeout().as_secs(), 10);
        assert_eq!(config.export.utc_offset_minutes, 0);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let config = load_config_from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [services]
            recognition_url = "http://ocr.local/recognize"
            persistence_url = "http://db.local/readings"
            user_id = "flat-12"

            [telegram]
            enabled = true
            token = "123:abc"
            chat_id = "-1001234567890"

            [export]
            utc_offset_minutes = 180
            "#,
        )
        .unwrap();

        assert_eq!(config.server.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.services.recognition_url.as_deref(), Some("http://ocr.local/recognize"));
        assert_eq!(config.services.user_id, "flat-12");
        assert!(config.telegram.enabled);
        assert_eq!(config.export.display_offset().unwrap().local_minus_utc(), 10800);
    }

    #[test]
    fn enabled_telegram_requires_credentials() {
        let err = load_config_from_str("[telegram]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let err = load_config_from_str("[export]\nutc_offset_minutes = 1440\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(load_config_from_str("[services]\nrequest_timeout_secs = 0\n").is_err());
        assert!(load_config_from_str("[telegram]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("definitely/not/here.toml")).unwrap();
        assert_eq!(config.services.user_id, "default_user");
    }
}
