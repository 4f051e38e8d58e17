// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for routing and the request pipeline

mod fixtures;

use api::ServerConfig;
use axum::http::StatusCode;
use fixtures::start;
use serde_json::{Value, json};

#[tokio::test]
async fn root_describes_the_service() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let body: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["message"], "Welcome to Backend API");
    assert_eq!(body["environment"], "testing");
    assert_eq!(body["endpoints"]["api"], "/api");
    assert_eq!(body["endpoints"]["documentation"], "/api-docs");

    token.cancel();
}

#[tokio::test]
async fn api_index_reports_version() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let body: Value = reqwest::get(format!("http://{addr}/api"))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["message"], "Backend API");
    assert_eq!(body["version"], "v1");
    assert!(body.get("environment").is_none());

    token.cancel();
}

#[tokio::test]
async fn users_list_is_empty() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/users"))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["ratelimit-limit"], "10000");
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["data"], json!([]));
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "limit": 10, "total": 0, "pages": 0})
    );

    token.cancel();
}

#[tokio::test]
async fn unknown_api_endpoint_lists_available_ones() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/orders"))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"]["message"], "API endpoint /api/v1/orders not found");
    assert_eq!(body["error"]["status"], 404);
    assert_eq!(
        body["error"]["availableEndpoints"],
        json!({"health": "/api/health", "users": "/api/v1/users"})
    );

    token.cancel();
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let response = reqwest::get(format!("http://{addr}/nonexistent"))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"]["message"], "Route /nonexistent not found");
    assert_eq!(body["error"]["method"], "GET");

    token.cancel();
}

#[tokio::test]
async fn unsupported_version_is_rejected() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let response = reqwest::get(format!("http://{addr}/api/v3/users"))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"]["supportedVersions"], json!(["v1"]));

    token.cancel();
}

#[tokio::test]
async fn write_without_json_is_rejected() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let response = reqwest::Client::new()
        .put(format!("http://{addr}/api/v1/users/1"))
        .body("name=x")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"]["message"], "Content-Type must be application/json");
    assert_eq!(body["error"]["received"], "none");

    token.cancel();
}

#[tokio::test]
async fn pipeline_headers_on_every_response() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let response = reqwest::get(format!("http://{addr}/nonexistent"))
        .await
        .expect("Failed to send request");

    let headers = response.headers();
    assert!(headers.contains_key("x-request-id"));
    assert!(headers.contains_key("x-response-time"));
    assert_eq!(headers["x-api-version"], "v1");
    assert_eq!(headers["cache-control"], "no-cache, no-store, must-revalidate");
    assert!(!headers.contains_key("x-powered-by"));

    token.cancel();
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    let body: Value = reqwest::get(format!("http://{addr}/api-docs/openapi.json"))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("json body");

    assert!(body["paths"]["/api/health"].is_object());
    assert!(body["components"]["securitySchemes"]["bearerAuth"].is_object());

    token.cancel();
}

#[tokio::test]
async fn metrics_are_exposed() {
    let (addr, token) = start(ServerConfig::for_testing()).await;

    reqwest::get(format!("http://{addr}/api/health/simple"))
        .await
        .expect("Failed to send request");
    let text = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .expect("Failed to send request")
        .text()
        .await
        .expect("text body");

    assert!(text.contains("http_requests_total"));

    token.cancel();
}
