//! In-process router tests
//!
//! These run without a database: the pool connects lazily and every case
//! here is rejected by authentication, authorization or validation before a
//! query is issued.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use library_server::{
    api,
    config::AppConfig,
    models::{Role, UserClaims},
    repository::Repository,
    services::Services,
    AppState,
};

fn app() -> Router {
    let config = AppConfig::default();
    let pool = PgPoolOptions::new()
        .min_connections(0)
        .connect_lazy(&config.database.url)
        .expect("lazy pool");
    let services = Services::new(
        Repository::new(pool),
        config.auth.clone(),
        config.borrowing.clone(),
    );
    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

fn token(role: Role) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = UserClaims {
        sub: "reader".to_string(),
        user_id: 42,
        role,
        exp: now + 3600,
        iat: now,
    };
    claims
        .create_token(&AppConfig::default().auth.jwt_secret)
        .expect("token")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(request(Method::GET, "/api/v1/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = send(request(Method::GET, "/api/v1/books", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let (status, _) = send(request(Method::GET, "/api/v1/books", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_normal_user_cannot_create_category() {
    let token = token(Role::NormalUser);
    let (status, body) = send(request(
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "name": "Poetry" })),
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_normal_user_cannot_approve_request() {
    let token = token(Role::NormalUser);
    let (status, _) = send(request(
        Method::POST,
        "/api/v1/borrowing-requests/1/approve",
        Some(&token),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_normal_user_cannot_list_users() {
    let token = token(Role::NormalUser);
    let (status, _) = send(request(Method::GET, "/api/v1/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_normal_user_cannot_read_activity_log() {
    let token = token(Role::NormalUser);
    let (status, _) = send(request(Method::GET, "/api/v1/activity-logs", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_category_name_is_rejected() {
    let token = token(Role::SuperUser);
    let (status, body) = send(request(
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "name": "" })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_blank_names_are_rejected() {
    let token = token(Role::SuperUser);
    let (status, body) = send(request(
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "name": "   " })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = send(request(
        Method::POST,
        "/api/v1/books",
        Some(&token),
        Some(json!({ "title": "\t ", "quantity": 1 })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_borrowing_request_is_rejected() {
    let token = token(Role::NormalUser);
    let (status, _) = send(request(
        Method::POST,
        "/api/v1/borrowing-requests",
        Some(&token),
        Some(json!({ "book_ids": [] })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_negative_quantity_is_rejected() {
    let token = token(Role::SuperUser);
    let (status, _) = send(request(
        Method::POST,
        "/api/v1/books",
        Some(&token),
        Some(json!({ "title": "Dune", "quantity": -1 })),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
