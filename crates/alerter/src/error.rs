use thiserror::Error;

/// Failures while delivering a reading notification.
#[derive(Error, Debug)]
pub enum AlerterError {
    #[error("Could not reach the Telegram Bot API: {0}")]
    Request(#[from] reqwest::Error),

    /// The Bot API answered with a non-success status; holds the response body.
    #[error("Telegram rejected the notification: {0}")]
    ApiError(String),
}
