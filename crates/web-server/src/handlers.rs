use crate::{AppState, error::AppError};
use analytics::{HistoryRow, StatisticsReport, export_file_name};
use api_client::error::ApiError;
use axum::{
    Json,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use core_types::{NewReading, Reading};
use events::WsMessage;
use reading_store::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingBody {
    pub meter_number: String,
    pub reading: f64,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeBody {
    /// Base64 image data, optionally as a `data:` URL.
    pub image: String,
    /// Where the photo is hosted, if the client uploaded it somewhere.
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadingBody {
    pub meter_number: String,
    pub reading: f64,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub count: usize,
}

/// # GET /api/readings
/// The history view: newest first, each row with its delta.
pub async fn list_readings(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryRow>> {
    Json(state.store.read().await.history_view())
}

/// # POST /api/readings
/// Records a manually entered reading.
pub async fn create_reading(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReadingBody>,
) -> Result<(StatusCode, Json<Reading>), AppError> {
    let new = NewReading::new(&body.meter_number, body.reading, body.photo_url)?;
    let reading = save_new_reading(&state, new).await?;
    Ok((StatusCode::CREATED, Json(reading)))
}

/// # POST /api/readings/recognize
/// Sends a photo to the recognition service and records the result.
pub async fn recognize_reading(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecognizeBody>,
) -> Result<(StatusCode, Json<Reading>), AppError> {
    let recognition = state
        .recognition
        .as_ref()
        .ok_or(ApiError::NotConfigured("recognition"))?;

    let result = recognition.recognize(&body.image).await?;
    tracing::info!(meter = %result.meter_number, value = result.reading, "Meter photo recognized.");

    let new = result.into_new_reading(body.photo_url)?;
    let reading = save_new_reading(&state, new).await?;
    Ok((StatusCode::CREATED, Json(reading)))
}

/// # POST /api/readings/reload
/// Replaces the in-memory readings with the persisted snapshot.
pub async fn reload_readings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, AppError> {
    let count = state.reload().await?;
    Ok(Json(ReloadResponse { count }))
}

/// # PATCH /api/readings/:id
pub async fn update_reading(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateReadingBody>,
) -> Result<Json<Reading>, AppError> {
    let updated = state
        .store
        .write()
        .await
        .update_reading(&id, body.reading, &body.meter_number)?;
    Ok(Json(updated))
}

/// # DELETE /api/readings/:id
/// With persistence configured, the remote copy is removed first so a failed
/// remote call leaves both sides unchanged.
pub async fn delete_reading(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    if state.store.read().await.get(&id).is_none() {
        return Err(StoreError::NotFound(id).into());
    }
    if let Some(persistence) = &state.persistence {
        persistence.delete(&id).await?;
    }
    state.store.write().await.delete_reading(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// # GET /api/statistics
pub async fn get_statistics(State(state): State<Arc<AppState>>) -> Json<StatisticsReport> {
    Json(state.store.read().await.statistics())
}

/// # GET /api/export
/// Downloads the readings as `;`-delimited UTF-8 text for spreadsheets.
pub async fn export_readings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let text = state.store.read().await.export()?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(Utc::now().date_naive())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    ))
}

/// # GET /ws
/// Streams store events to the client as JSON text frames.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>, // State must come before WebSocketUpgrade
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let events = state.store.read().await.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

/// Saves through persistence when configured, otherwise records locally.
async fn save_new_reading(state: &AppState, new: NewReading) -> Result<Reading, AppError> {
    match &state.persistence {
        Some(persistence) => {
            let saved = persistence.create(&state.user_id, &new).await?;
            Ok(state.store.write().await.insert(saved)?)
        }
        None => Ok(state.store.write().await.record(new)),
    }
}

async fn handle_socket(mut socket: WebSocket, mut events: broadcast::Receiver<WsMessage>) {
    tracing::info!("[WS] New client connected.");
    if !send_event(&mut socket, &WsMessage::Connected).await {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !send_event(&mut socket, &event).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[WS] Client lagged, skipped {} events.", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("[WS] Client disconnected.");
                    break;
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "[WS] Error.");
                    break;
                }
                // The socket is push-only; anything the client sends is ignored.
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::info!("[WS] Connection closed.");
}

/// Returns `false` once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &WsMessage) -> bool {
    match event.to_json() {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "[WS] Failed to encode event.");
            true
        }
    }
}
