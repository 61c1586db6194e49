use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file or a `METER__*` variable could not be read or parsed.
    #[error("Failed to load meter tracker configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    /// A value parsed but is unusable, e.g. a zero port or an out-of-range offset.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
