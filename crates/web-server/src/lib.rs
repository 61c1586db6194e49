use analytics::AnalyticsEngine;
use api_client::{
    HttpPersistenceClient, HttpRecognitionClient, PersistenceClient, RecognitionClient,
    error::ApiError,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use configuration::settings::Config;
use reading_store::ReadingStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
///
/// The store is the single owner of the readings; handlers take the write lock
/// only for the duration of a command and never across a collaborator call.
pub struct AppState {
    pub store: RwLock<ReadingStore>,
    pub recognition: Option<Arc<dyn RecognitionClient>>,
    pub persistence: Option<Arc<dyn PersistenceClient>>,
    pub user_id: String,
}

impl AppState {
    /// Builds the state from configuration. Unconfigured services stay `None`.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let engine = AnalyticsEngine::with_display_offset(config.export.display_offset()?);

        let recognition: Option<Arc<dyn RecognitionClient>> = match config.services.recognition_url {
            Some(_) => Some(Arc::new(HttpRecognitionClient::from_config(&config.services)?)),
            None => {
                tracing::warn!("No recognition service configured; photo uploads are disabled.");
                None
            }
        };
        let persistence: Option<Arc<dyn PersistenceClient>> = match config.services.persistence_url {
            Some(_) => Some(Arc::new(HttpPersistenceClient::from_config(&config.services)?)),
            None => {
                tracing::warn!("No persistence service configured; readings are kept in memory only.");
                None
            }
        };

        Ok(Self {
            store: RwLock::new(ReadingStore::new(engine)),
            recognition,
            persistence,
            user_id: config.services.user_id.clone(),
        })
    }

    /// Replaces the store's contents with the persisted snapshot.
    pub async fn reload(&self) -> Result<usize, ApiError> {
        let persistence = self
            .persistence
            .as_ref()
            .ok_or(ApiError::NotConfigured("persistence"))?;
        let readings = persistence.list(&self.user_id).await?;
        Ok(self.store.write().await.replace_all(readings))
    }
}

/// Assembles the application routes around a shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/readings",
            get(handlers::list_readings).post(handlers::create_reading),
        )
        .route("/api/readings/recognize", post(handlers::recognize_reading))
        .route("/api/readings/reload", post(handlers::reload_readings))
        .route(
            "/api/readings/:id",
            patch(handlers::update_reading).delete(handlers::delete_reading),
        )
        .route("/api/statistics", get(handlers::get_statistics))
        .route("/api/export", get(handlers::export_readings))
        .route("/ws", get(handlers::websocket_handler))
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 50)) // Photos arrive base64 encoded.
}

/// The main function to configure and run the web server.
pub async fn run_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    tracing::info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
