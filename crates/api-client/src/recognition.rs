use crate::error::ApiError;
use crate::responses::RecognitionResult;
use crate::{RecognitionClient, build_http_client, decode_response};
use async_trait::async_trait;
use configuration::ServicesConfig;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
}

/// A recognition client that posts `{"image": ...}` to a single endpoint.
#[derive(Debug, Clone)]
pub struct HttpRecognitionClient {
    client: reqwest::Client,
    url: String,
}

impl HttpRecognitionClient {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url: url.into(),
        })
    }

    /// Builds a client from the `[services]` section.
    pub fn from_config(config: &ServicesConfig) -> Result<Self, ApiError> {
        let url = config
            .recognition_url
            .as_deref()
            .ok_or(ApiError::NotConfigured("recognition"))?;
        Self::new(url, config.request_timeout())
    }
}

#[async_trait]
impl RecognitionClient for HttpRecognitionClient {
    async fn recognize(&self, image: &str) -> Result<RecognitionResult, ApiError> {
        tracing::debug!(url = %self.url, bytes = image.len(), "Sending image for recognition.");
        let response = self
            .client
            .post(&self.url)
            .json(&RecognizeRequest { image })
            .send()
            .await?;
        decode_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};
    use std::time::Duration;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn recognize_posts_image_and_decodes_result() {
        let app = Router::new().route(
            "/ocr",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["image"], "aGVsbG8=");
                Json(json!({ "meterNumber": "EM123V", "reading": 4821 }))
            }),
        );
        let base = serve(app).await;

        let client = HttpRecognitionClient::new(format!("{base}/ocr"), Duration::from_secs(5)).unwrap();
        let result = client.recognize("aGVsbG8=").await.unwrap();

        assert_eq!(result.meter_number, "EM123V");
        assert_eq!(result.reading, 4821.0);
    }

    #[test]
    fn from_config_requires_url() {
        let config = ServicesConfig::default();
        assert!(matches!(
            HttpRecognitionClient::from_config(&config),
            Err(ApiError::NotConfigured("recognition"))
        ));
    }
}
