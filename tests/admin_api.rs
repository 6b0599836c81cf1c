//! Admin API surface tests over the in-memory router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use btcbuzzbot::domain::{ContentKind, ContentType};
use btcbuzzbot::services::AdminServer;
use btcbuzzbot::store::{SqliteStore, Store, DEFAULT_SCHEDULE};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::util::ServiceExt;

async fn setup() -> (axum::Router, Arc<dyn Store>, Arc<Notify>) {
    let sqlite = SqliteStore::connect_in_memory().await.unwrap();
    sqlite.init_schema().await.unwrap();
    let store: Arc<dyn Store> = Arc::new(sqlite);
    let reschedule = Arc::new(Notify::new());
    let server = AdminServer::new(Arc::clone(&store), Arc::clone(&reschedule), 0);
    (server.router(), store, reschedule)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _store, _reschedule) = setup().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn posts_and_schedule_are_readable() {
    let (app, store, _reschedule) = setup().await;
    store
        .log_post("42", "BTC: $50,000.00", 50_000.0, 1.0, ContentType::News)
        .await
        .unwrap();
    store
        .add_content(ContentKind::Quote, "HODL", "motivational")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/posts?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let posts = body_json(response).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);
    assert_eq!(posts[0]["tweet_id"], "42");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/schedule")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let schedule = body_json(response).await;
    assert_eq!(schedule["schedule"], DEFAULT_SCHEDULE);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/quotes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let quotes = body_json(response).await;
    assert_eq!(quotes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn schedule_update_normalizes_and_signals_reschedule() {
    let (app, store, reschedule) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/schedule")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"schedule": "19:00,7:0"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["schedule"], "07:00,19:00");

    assert_eq!(
        store.schedule_config().await.unwrap().as_deref(),
        Some("07:00,19:00")
    );
    // The engine handle was notified.
    tokio::time::timeout(Duration::from_millis(100), reschedule.notified())
        .await
        .expect("reschedule signal not delivered");

    // Garbage input is rejected and leaves the stored row alone.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/schedule")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"schedule": "banana"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        store.schedule_config().await.unwrap().as_deref(),
        Some("07:00,19:00")
    );
}
