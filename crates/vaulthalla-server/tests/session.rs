//! Integration tests for the session probe against a live local upstream.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use vaulthalla_server::build_router;
use vaulthalla_server::config::ServerConfig;
use vaulthalla_server::state::AppState;

// ── Helpers ──────────────────────────────────────────────────────────

/// Upstream origin that accepts exactly `refresh=good` or `sid=good`.
async fn upstream_session(headers: HeaderMap) -> Response {
    match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        Some("refresh=good" | "sid=good") => Json(json!({
            "user": { "id": 1, "name": "admin", "email": "admin@vh.local" }
        }))
        .into_response(),
        Some("refresh=plain") => "session ok".into_response(),
        Some("refresh=slow") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK.into_response()
        }
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn spawn_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/auth/session", get(upstream_session));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// An address nothing is listening on.
async fn dead_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn probe(upstream_url: String) -> Router {
    let config = ServerConfig {
        upstream_url,
        probe_timeout: Duration::from_millis(500),
        ..ServerConfig::default()
    };
    build_router(Arc::new(AppState::new(&config).unwrap()))
}

async fn get_session(app: Router, cookie: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri("/api/auth/session");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    let resp = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── Session probe ────────────────────────────────────────────────────

#[tokio::test]
async fn valid_session_echoes_upstream_body() {
    let app = probe(spawn_upstream().await);

    let (status, body) = get_session(app, Some("theme=dark; refresh=good")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "admin");
    assert_eq!(body["user"]["email"], "admin@vh.local");
}

#[tokio::test]
async fn missing_cookie_is_unauthorized_without_calling_upstream() {
    let app = probe(dead_upstream().await);

    let (status, body) = get_session(app, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "no session cookie");
}

#[tokio::test]
async fn rejected_session_is_unauthorized() {
    let app = probe(spawn_upstream().await);

    let (status, body) = get_session(app, Some("refresh=expired")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn unreachable_upstream_is_unauthorized() {
    let app = probe(dead_upstream().await);

    let (status, body) = get_session(app, Some("refresh=good")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "session could not be verified");
}

#[tokio::test]
async fn slow_upstream_times_out_as_unauthorized() {
    let app = probe(spawn_upstream().await);

    let (status, _) = get_session(app, Some("refresh=slow")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_json_upstream_body_is_unauthorized() {
    let app = probe(spawn_upstream().await);

    let (status, _) = get_session(app, Some("refresh=plain")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn custom_cookie_name_is_forwarded_as_configured() {
    let config = ServerConfig {
        upstream_url: spawn_upstream().await,
        session_cookie: "sid".to_owned(),
        ..ServerConfig::default()
    };
    let app = build_router(Arc::new(AppState::new(&config).unwrap()));

    let (status, body) = get_session(app.clone(), Some("refresh=good")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "no session cookie");

    let (status, body) = get_session(app, Some("theme=dark; sid=good")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], 1);
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let app = probe(dead_upstream().await);

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}
