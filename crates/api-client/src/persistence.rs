use crate::error::ApiError;
use crate::responses::{CreateReadingRequest, CreatedReadingResponse, ReadingListResponse};
use crate::{PersistenceClient, build_http_client, decode_response};
use async_trait::async_trait;
use configuration::ServicesConfig;
use core_types::{NewReading, Reading};
use serde::Deserialize;

/// A client for the readings service: `GET ?userId=`, `POST` and `DELETE ?id=`
/// against a single URL.
#[derive(Debug, Clone)]
pub struct HttpPersistenceClient {
    client: reqwest::Client,
    url: String,
}

impl HttpPersistenceClient {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url: url.into(),
        })
    }

    /// Builds a client from the `[services]` section.
    pub fn from_config(config: &ServicesConfig) -> Result<Self, ApiError> {
        let url = config
            .persistence_url
            .as_deref()
            .ok_or(ApiError::NotConfigured("persistence"))?;
        Self::new(url, config.request_timeout())
    }
}

#[async_trait]
impl PersistenceClient for HttpPersistenceClient {
    async fn list(&self, user_id: &str) -> Result<Vec<Reading>, ApiError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("userId", user_id)])
            .send()
            .await?;
        let body: ReadingListResponse = decode_response(response).await?;

        let total = body.readings.len();
        let readings: Vec<Reading> = body
            .readings
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match Reading::try_from(record) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping invalid persisted reading.");
                    None
                }
            })
            .collect();

        if readings.len() < total {
            tracing::warn!(kept = readings.len(), total, "Some persisted readings were skipped.");
        }
        Ok(readings)
    }

    async fn create(&self, user_id: &str, reading: &NewReading) -> Result<Reading, ApiError> {
        let request = CreateReadingRequest {
            meter_number: &reading.meter_number,
            reading: reading.value,
            photo_url: reading.photo.as_deref(),
            user_id,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        let body: CreatedReadingResponse = decode_response(response).await?;
        Reading::try_from(body.reading)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        #[derive(Deserialize)]
        struct DeleteResponse {
            #[serde(default)]
            success: bool,
        }

        let response = self
            .client
            .delete(&self.url)
            .query(&[("id", id)])
            .send()
            .await?;
        let body: DeleteResponse = decode_response(response).await?;
        if !body.success {
            return Err(ApiError::InvalidData(format!("delete of {id} was not acknowledged")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode,
        routing::get,
    };
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Calls = Arc<Mutex<Vec<String>>>;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/readings")
    }

    fn fake_service(calls: Calls) -> Router {
        Router::new()
            .route(
                "/readings",
                get(|State(calls): State<Calls>, Query(q): Query<HashMap<String, String>>| async move {
                    calls.lock().unwrap().push(format!("GET {}", q["userId"]));
                    Json(json!({ "readings": [
                        { "id": "2", "meterNumber": "EM-1", "reading": 12850, "photoUrl": null,
                          "timestamp": "2024-10-15T09:30:00.000001" },
                        { "id": "1", "meterNumber": "EM-1", "reading": 12340, "photoUrl": "p.jpg",
                          "timestamp": "2024-10-01T10:00:00+00:00" }
                    ]}))
                })
                .post(|State(calls): State<Calls>, Json(body): Json<Value>| async move {
                    calls.lock().unwrap().push(format!("POST {}", body["userId"].as_str().unwrap()));
                    (
                        StatusCode::CREATED,
                        Json(json!({ "reading": {
                            "id": "3",
                            "meterNumber": body["meterNumber"],
                            "reading": body["reading"],
                            "photoUrl": body["photoUrl"],
                            "timestamp": "2024-10-20T08:00:00"
                        }})),
                    )
                })
                .delete(|State(calls): State<Calls>, Query(q): Query<HashMap<String, String>>| async move {
                    calls.lock().unwrap().push(format!("DELETE {}", q["id"]));
                    if q["id"] == "missing" {
                        (StatusCode::BAD_REQUEST, Json(json!({ "error": "id is required" })))
                    } else {
                        (StatusCode::OK, Json(json!({ "success": true })))
                    }
                }),
            )
            .with_state(calls)
    }

    #[tokio::test]
    async fn list_create_and_delete_speak_the_service_contract() {
        let calls: Calls = Arc::default();
        let url = serve(fake_service(calls.clone())).await;
        let client = HttpPersistenceClient::new(url, Duration::from_secs(5)).unwrap();

        let listed = client.list("flat-12").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "2");
        assert_eq!(listed[1].photo.as_deref(), Some("p.jpg"));

        let new = NewReading::new("EM-1", 13000.0, None).unwrap();
        let created = client.create("flat-12", &new).await.unwrap();
        assert_eq!(created.id, "3");
        assert_eq!(created.value, 13000);

        client.delete("3").await.unwrap();
        let err = client.delete("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::ApiError { status: 400, .. }));

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["GET flat-12", "POST flat-12", "DELETE 3", "DELETE missing"]);
    }

    #[tokio::test]
    async fn list_skips_invalid_records_and_keeps_the_rest() {
        let app = Router::new().route(
            "/readings",
            get(|| async {
                Json(json!({ "readings": [
                    { "id": "2", "meterNumber": "EM-1", "reading": 12850,
                      "timestamp": "2024-10-15T09:30:00" },
                    { "id": "1", "meterNumber": "EM-1", "reading": 12340.5,
                      "timestamp": "2024-10-01T10:00:00" },
                    { "id": "0", "meterNumber": "  ", "reading": 100,
                      "timestamp": "2024-09-01T10:00:00" }
                ]}))
            }),
        );
        let url = serve(app).await;
        let client = HttpPersistenceClient::new(url, Duration::from_secs(5)).unwrap();

        let listed = client.list("flat-12").await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "2");
        assert_eq!(listed[0].value, 12850);
    }
}
