pub mod anchors;
pub mod ml;
pub mod motos;
pub mod tags;

use crate::auth::{AuthService, LoginRequest};
use crate::config::{Config, PaginationConfig};
use crate::database::Database;
use crate::error::ApiError;
use crate::estimator::DistanceEstimator;
use anyhow::{anyhow, Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::net::TcpListener;

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub estimator: Arc<DistanceEstimator>,
    pub auth: Arc<AuthService>,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(db: Database, estimator: DistanceEstimator, config: &Config) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            estimator: Arc::new(estimator),
            auth: Arc::new(AuthService::new(config.auth.clone())),
            pagination: config.pagination.clone(),
        }
    }

    /// Run one store call with the connection locked
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T, ApiError> {
        let db = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow!("database lock poisoned")))?;
        f(&db).map_err(ApiError::from)
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.auth)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/ml/estimate-distance", post(ml::estimate_distance))
        .route("/api/v1/motos", get(motos::list).post(motos::create))
        .route(
            "/api/v1/motos/{id}",
            get(motos::get).put(motos::update).delete(motos::delete),
        )
        .route("/api/v1/tags", get(tags::list).post(tags::create))
        .route(
            "/api/v1/tags/{id}",
            get(tags::get).put(tags::update).delete(tags::delete),
        )
        .route("/api/v1/anchors", get(anchors::list).post(anchors::create))
        .route(
            "/api/v1/anchors/{id}",
            get(anchors::get).put(anchors::update).delete(anchors::delete),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(bind_addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!("Listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server exited with error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Received Ctrl+C, shutting down...");
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    utc: DateTime<Utc>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Healthy",
        utc: Utc::now(),
    })
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let Json(request) = payload?;
    let token = state.auth.login(&request)?;
    info!("User '{}' logged in", request.username);
    Ok(Json(token))
}
