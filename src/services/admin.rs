//! Read-only admin HTTP surface.
//!
//! Exposes the latest bot status, recent posts, analyzed news, the posting
//! schedule and the content pools. The only write is the schedule update,
//! which also signals the scheduler engine to re-read its job table.

use crate::domain::{BotStatus, ContentItem, ContentKind, NewsItem, Post};
use crate::scheduler::normalize_schedule;
use crate::store::Store;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared state for the admin router
pub struct AdminState {
    store: Arc<dyn Store>,
    reschedule: Arc<Notify>,
    started_at: DateTime<Utc>,
}

/// Admin API server
pub struct AdminServer {
    state: Arc<AdminState>,
    port: u16,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: i64,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct StatusResponse {
    current: Option<BotStatus>,
}

#[derive(Deserialize)]
struct PostsQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct NewsQuery {
    hours: Option<i64>,
}

#[derive(Serialize)]
struct ScheduleResponse {
    schedule: String,
}

#[derive(Deserialize)]
struct SchedulePayload {
    schedule: String,
}

#[derive(Serialize)]
struct PriceResponse {
    price: Option<f64>,
    timestamp: Option<DateTime<Utc>>,
    price_24h_ago: Option<f64>,
}

type HandlerError = (StatusCode, String);

fn internal(err: impl std::fmt::Display) -> HandlerError {
    error!("Admin API store error: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

impl AdminServer {
    pub fn new(store: Arc<dyn Store>, reschedule: Arc<Notify>, port: u16) -> Self {
        Self {
            state: Arc::new(AdminState {
                store,
                reschedule,
                started_at: Utc::now(),
            }),
            port,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/status", get(status))
            .route("/api/posts", get(posts))
            .route("/api/news", get(news))
            .route("/api/price", get(price))
            .route("/api/schedule", get(get_schedule).post(set_schedule))
            .route("/api/quotes", get(quotes))
            .route("/api/jokes", get(jokes))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.state))
    }

    /// Serve until the process exits.
    pub async fn serve(&self) -> crate::error::Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Admin API listening on {addr}");
        axum::serve(listener, self.router())
            .await
            .map_err(crate::error::BuzzError::Io)?;
        Ok(())
    }
}

async fn health(State(state): State<Arc<AdminState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: (now - state.started_at).num_seconds(),
        timestamp: now,
    })
}

async fn status(
    State(state): State<Arc<AdminState>>,
) -> Result<Json<StatusResponse>, HandlerError> {
    let current = state.store.latest_bot_status().await.map_err(internal)?;
    Ok(Json(StatusResponse { current }))
}

async fn posts(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<Vec<Post>>, HandlerError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let posts = state.store.recent_posts(limit).await.map_err(internal)?;
    Ok(Json(posts))
}

async fn news(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<NewsItem>>, HandlerError> {
    let hours = query.hours.unwrap_or(24).clamp(1, 24 * 7);
    let items = state
        .store
        .recent_analyzed_news(hours)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

async fn price(State(state): State<Arc<AdminState>>) -> Result<Json<PriceResponse>, HandlerError> {
    let latest = state.store.latest_price().await.map_err(internal)?;
    let day_ago = state.store.price_at_24h_ago().await.map_err(internal)?;
    Ok(Json(PriceResponse {
        price: latest.as_ref().map(|t| t.price),
        timestamp: latest.map(|t| t.timestamp),
        price_24h_ago: day_ago,
    }))
}

async fn get_schedule(
    State(state): State<Arc<AdminState>>,
) -> Result<Json<ScheduleResponse>, HandlerError> {
    let schedule = state
        .store
        .schedule_config()
        .await
        .map_err(internal)?
        .unwrap_or_default();
    Ok(Json(ScheduleResponse { schedule }))
}

async fn set_schedule(
    State(state): State<Arc<AdminState>>,
    Json(payload): Json<SchedulePayload>,
) -> Result<Json<ScheduleResponse>, HandlerError> {
    let normalized = normalize_schedule(&payload.schedule);
    if normalized.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "schedule must contain at least one valid HH:MM time".to_string(),
        ));
    }
    state
        .store
        .set_schedule_config(&normalized)
        .await
        .map_err(internal)?;
    info!(schedule = %normalized, "Schedule updated via admin API, requesting reschedule");
    state.reschedule.notify_one();
    Ok(Json(ScheduleResponse {
        schedule: normalized,
    }))
}

async fn quotes(
    State(state): State<Arc<AdminState>>,
) -> Result<Json<Vec<ContentItem>>, HandlerError> {
    let items = state
        .store
        .list_content(ContentKind::Quote)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

async fn jokes(
    State(state): State<Arc<AdminState>>,
) -> Result<Json<Vec<ContentItem>>, HandlerError> {
    let items = state
        .store
        .list_content(ContentKind::Joke)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}
