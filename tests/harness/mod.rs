// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the intake router end to end.

#![allow(dead_code)]

pub mod generators;
pub mod metrics;
pub mod stores;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use waitlist_intake::{
    config::{IntakeConfig, RateLimitConfig},
    router,
    store::{StoreProvider, SubmissionStore},
    AppState,
};

pub const ALLOWED_ORIGIN: &str = "https://waitlist.example.com";
pub const SALT: &str = "integration-salt";

/// Router over an already constructed store.
pub fn app(store: Arc<dyn SubmissionStore>) -> Router {
    app_with_provider(StoreProvider::with_store(store))
}

pub fn app_with_provider(provider: StoreProvider) -> Router {
    let state = AppState::new(IntakeConfig::default(), RateLimitConfig::new(SALT), provider);
    router(Arc::new(state))
}

/// Collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn allow_origin(&self) -> Option<&str> {
        self.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    pub fn code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

/// JSON request from `address` with an optional `Origin`.
pub fn request(method: &str, origin: Option<&str>, address: &str, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", address);
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn submit(origin: Option<&str>, address: &str, body: &str) -> Request<Body> {
    request("POST", origin, address, body)
}

pub fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "content-type,x-client-info",
        )
        .body(Body::empty())
        .unwrap()
}

pub fn phone_body(phone: &str) -> String {
    serde_json::json!({ "phone_number": phone }).to_string()
}
