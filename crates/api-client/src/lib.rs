//! # Meter Tracker API Client
//!
//! HTTP clients for the external collaborators: the recognition service that reads
//! a meter photo and the persistence service that stores readings per user.
//! Every failure on this boundary surfaces as an `ApiError`.

use crate::error::ApiError;
use async_trait::async_trait;
use core_types::{NewReading, Reading};
use serde::de::DeserializeOwned;

pub mod error;
pub mod persistence;
pub mod recognition;
pub mod responses;

// --- Public API ---
pub use persistence::HttpPersistenceClient;
pub use recognition::HttpRecognitionClient;
pub use responses::{ReadingRecord, RecognitionResult};

/// The interface to an image recognition service.
/// Implementations can be swapped for fakes in tests.
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Sends a base64 encoded image (a `data:` URL is fine) and returns the raw result.
    async fn recognize(&self, image: &str) -> Result<RecognitionResult, ApiError>;
}

/// The interface to the reading persistence service.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Fetches all readings stored for `user_id`. Records that fail validation are skipped.
    async fn list(&self, user_id: &str) -> Result<Vec<Reading>, ApiError>;

    /// Stores a reading; the service assigns the id and timestamp.
    async fn create(&self, user_id: &str, reading: &NewReading) -> Result<Reading, ApiError>;

    /// Removes a stored reading.
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// Reads a response body and decodes it, turning non-2xx statuses into `ApiError::ApiError`.
async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;
    decode_body(status.as_u16(), &text)
}

fn decode_body<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, ApiError> {
    if (200..300).contains(&status) {
        serde_json::from_str::<T>(text).map_err(|e| ApiError::Deserialization(e.to_string()))
    } else {
        let message = serde_json::from_str::<responses::ErrorResponse>(text)
            .map(|body| body.error)
            .unwrap_or_else(|_| text.to_string());
        Err(ApiError::ApiError { status, message })
    }
}

fn build_http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
