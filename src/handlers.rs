// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handler for the waitlist intake endpoint.
//!
//! One handler serves every path. Per request: origin gate, method check,
//! body validation, store acquisition, daily cap check, insert.

use crate::config::{Config, IntakeConfig, RateLimitConfig};
use crate::error::{IntakeError, Result};
use crate::limiter::{client_address, RateLimitResult, RateLimiter};
use crate::models::{SubmissionRequest, SubmissionResponse};
use crate::origin::OriginGate;
use crate::store::StoreProvider;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, info};

/// Header reporting submissions left today for the caller's source.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Shared application state.
pub struct AppState {
    pub gate: OriginGate,
    pub limiter: RateLimiter,
    pub store: StoreProvider,
    pub intake: IntakeConfig,
}

impl AppState {
    pub fn new(intake: IntakeConfig, rate_limit: RateLimitConfig, store: StoreProvider) -> Self {
        Self {
            gate: OriginGate::new(intake.allowed_origins.iter().cloned()),
            limiter: RateLimiter::new(rate_limit),
            store,
            intake,
        }
    }

    /// State for a loaded configuration. The store is not constructed
    /// until the first request that needs it.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.intake.clone(),
            config.rate_limit.clone(),
            StoreProvider::from_config(config.store.clone()),
        )
    }
}

/// Build the service: the intake handler on every path, wrapped by
/// tracing, CORS and panic recovery (outermost first).
pub fn router(state: Arc<AppState>) -> Router {
    let cors = state.gate.cors_layer();

    Router::new()
        .fallback(intake)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}

/// Intake endpoint. Every outcome is a well-formed response.
pub async fn intake(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&state, &method, &headers, &body).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                error!(error = %err, details = ?err.details(), "Intake failed");
            } else {
                info!(status = err.status().as_u16(), code = err.code(), "Intake rejected");
            }
            err.to_response(state.intake.expose_error_details)
        }
    }
}

async fn handle(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response> {
    // The CORS layer answers every OPTIONS before it gets here. Kept so
    // the handler holds the same rule when served without that layer.
    if *method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }

    if !state.gate.is_allowed(OriginGate::request_origin(headers)) {
        return Err(IntakeError::Forbidden);
    }

    if *method != Method::POST {
        return Err(IntakeError::MethodNotAllowed);
    }

    let request = parse_body(body)?;
    if request.phone_number().is_none() {
        return Err(IntakeError::MissingPhoneNumber);
    }

    let store = state.store.get().await.map_err(IntakeError::StoreUnavailable)?;

    let source_hash = state.limiter.source_hash(&client_address(headers));
    debug!(source_hash = %source_hash, "Processing submission");

    let remaining = match state
        .limiter
        .check(store.as_ref(), &source_hash, Utc::now())
        .await
        .map_err(IntakeError::RateLimitCheck)?
    {
        RateLimitResult::Allowed { remaining } => remaining,
        RateLimitResult::Limited {
            reason,
            retry_after,
        } => {
            info!(
                source_hash = %source_hash,
                reason = %reason,
                retry_after_secs = retry_after.as_secs(),
                "Submission rate limited"
            );
            return Err(IntakeError::RateLimited {
                reason,
                retry_after,
            });
        }
    };

    let submission = request
        .into_new_submission(source_hash, Utc::now())
        .ok_or(IntakeError::MissingPhoneNumber)?;

    let stored = store.insert(submission).await.map_err(|e| {
        if e.is_conflict() {
            IntakeError::Duplicate
        } else {
            IntakeError::Insert(e)
        }
    })?;

    info!(source_hash = %stored.source_hash, remaining, "Submission accepted");

    Ok((
        StatusCode::OK,
        [(RATE_LIMIT_REMAINING, remaining.to_string())],
        Json(SubmissionResponse::accepted(stored)),
    )
        .into_response())
}

/// An empty body reads as `{}`.
fn parse_body(body: &[u8]) -> Result<SubmissionRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SubmissionRequest::default());
    }
    serde_json::from_slice(body).map_err(IntakeError::InvalidBody)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(panic = %detail, "Handler panicked");
    IntakeError::Internal(detail).into_response()
}
