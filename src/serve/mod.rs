//! HTTP prediction endpoint
//!
//! `POST /predict` scores one feature object; `OPTIONS /predict` answers CORS
//! preflights. The predictor is loaded before the listener is bound and shared
//! read-only across requests.

pub mod error;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Method};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::predictor::Predictor;
pub use error::ServeError;

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            model_path: PathBuf::from("ensemble_model.json"),
        }
    }
}

/// Shared application state passed to every handler.
pub struct AppState {
    pub predictor: Predictor,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/predict", post(predict).options(preflight))
        .layer(cors)
        .with_state(state)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ServeError> {
    let Json(body) = body.map_err(|rejection| ServeError::InvalidRequest(rejection.body_text()))?;
    let features = state.predictor.validate_features(&body)?;
    let prediction = state.predictor.predict_vector(&features)?;
    tracing::debug!(probability = prediction.probability, class = prediction.class, "prediction served");
    Ok(Json(json!({ "prediction": prediction.probability })))
}

async fn preflight() -> Json<Value> {
    Json(json!({}))
}

/// Load the model, bind, and serve until Ctrl-C.
pub async fn run(config: ServeConfig) -> Result<()> {
    let predictor = Predictor::load(&config.model_path)?;
    let state = Arc::new(AppState { predictor });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "prediction server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    tracing::info!("prediction server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
