// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::recognize::{recognize_debug_handler, recognize_handler, reset_handler};
use crate::config::{NodeConfig, StabilizationConfig};
use crate::recognition::{StreamStore, StreamStoreConfig, SymbolTable};
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{ClassifierManager, SignClassifier};

#[derive(Clone)]
pub struct AppState {
    pub classifier_manager: ClassifierManager,
    pub streams: Arc<StreamStore>,
    pub symbols: SymbolTable,
    pub inference_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn from_config(config: &NodeConfig, classifier_manager: ClassifierManager) -> Self {
        Self {
            classifier_manager,
            streams: Arc::new(StreamStore::new(
                config.stream_store(),
                config.stabilization(),
            )),
            symbols: SymbolTable::arabic(),
            inference_timeout: config.inference_timeout(),
            cors_origins: config.cors_origins.clone(),
        }
    }

    /// Placeholder-mode state with default settings
    pub fn new_for_test() -> Self {
        Self {
            classifier_manager: ClassifierManager::placeholder(),
            streams: Arc::new(StreamStore::new(
                StreamStoreConfig::default(),
                StabilizationConfig::default(),
            )),
            symbols: SymbolTable::arabic(),
            inference_timeout: Duration::from_secs(5),
            cors_origins: vec!["*".to_string()],
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SignClassifier>) -> Self {
        self.classifier_manager = ClassifierManager::with_classifier(classifier);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model_loaded: bool,
    pub model_version: String,
    pub active_streams: usize,
    /// Frames processed by the live streams
    pub total_frames: u64,
    /// Live streams that have stabilized on a symbol
    pub stable_streams: usize,
    pub version: String,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/sign/recognize", post(recognize_handler))
        .route("/api/sign/recognize-debug", post(recognize_debug_handler))
        .route("/api/sign/reset", post(reset_handler))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

pub async fn start_server(config: NodeConfig, classifier_manager: ClassifierManager) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config, classifier_manager));
    let cleanup = spawn_cleanup_task(state.streams.clone());
    let app = create_app(state);

    let addr = config
        .listen_addr()
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("🚀 Sign recognition API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop idle recognition streams
pub fn spawn_cleanup_task(streams: Arc<StreamStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(streams.cleanup_interval());
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = streams.cleanup_expired().await;
            if removed > 0 {
                tracing::info!("🧹 Removed {} idle recognition streams", removed);
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({"message": "Sila Sign Language Recognition API is running!"}))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let metrics = state.streams.metrics().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "sign-recognition".to_string(),
        model_loaded: state.classifier_manager.is_loaded(),
        model_version: state.classifier_manager.model_version(),
        active_streams: metrics.active_streams,
        total_frames: metrics.total_frames,
        stable_streams: metrics.stable_streams,
        version: crate::version::VERSION.to_string(),
    })
}

async fn version_handler() -> impl IntoResponse {
    Json(crate::version::get_version_info())
}
