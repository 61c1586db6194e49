use crate::error::AlerterError;
use configuration::TelegramConfig;
use core_types::Reading;
use events::WsMessage;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::broadcast;
pub mod error;

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `Ok(None)` if notifications are disabled or the token or chat_id is
    /// missing, allowing the system to run without alerting. Every request is
    /// bounded by `config.timeout()`.
    pub fn new(config: &TelegramConfig) -> Result<Option<Self>, AlerterError> {
        if !config.enabled {
            tracing::info!("Telegram notifications are disabled.");
            return Ok(None);
        }
        if config.token.is_empty() || config.chat_id.is_empty() {
            tracing::warn!("Telegram alerter is not configured (missing token or chat_id).");
            return Ok(None);
        }
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Some(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        }))
    }

    /// Sends an HTML formatted message to the configured chat.
    pub async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "HTML",
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError(error_text));
        }

        Ok(())
    }

    /// Announces a newly saved reading.
    pub async fn notify_reading(&self, reading: &Reading) -> Result<(), AlerterError> {
        self.send_message(&format_reading_message(reading)).await
    }
}

/// A long-running service that listens to the store's broadcast channel and
/// sends a Telegram message for every newly added reading.
///
/// A failed send is logged and the service moves on; the reading itself has
/// already been saved and is never affected.
pub async fn run_alerter_service(alerter: TelegramAlerter, mut event_rx: broadcast::Receiver<WsMessage>) {
    tracing::info!("Alerter service started. Listening for new readings.");

    loop {
        match event_rx.recv().await {
            Ok(WsMessage::ReadingAdded(reading)) => {
                if let Err(e) = alerter.notify_reading(&reading).await {
                    tracing::error!(error = ?e, id = %reading.id, "Failed to send Telegram notification.");
                }
            }
            // Updates, deletions and snapshots are not announced.
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Alerter service lagged, skipped {} messages.", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Broadcast channel closed. Alerter service shutting down.");
                break;
            }
        }
    }
}

/// Builds the notification text for a saved reading.
pub fn format_reading_message(reading: &Reading) -> String {
    format!(
        "⚡️ <b>New meter reading</b>\n\n📊 Meter: <code>{}</code>\n🔢 Reading: <b>{}</b> kWh",
        escape_html(&reading.meter_number),
        reading.value
    )
}

/// Escapes the characters that have special meaning in Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
