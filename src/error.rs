// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the intake handler.

use crate::limiter::RateLimitReason;
use crate::store::StoreError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Every way an intake request can fail.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Invalid JSON body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Phone number is required")]
    MissingPhoneNumber,

    #[error("{reason}")]
    RateLimited {
        reason: RateLimitReason,
        retry_after: Duration,
    },

    #[error("This number is already on the waitlist!")]
    Duplicate,

    #[error("Failed to check rate limit")]
    RateLimitCheck(#[source] StoreError),

    #[error("Service temporarily unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("Failed to join waitlist")]
    Insert(#[source] StoreError),

    #[error("Internal server error")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidBody(_) | Self::MissingPhoneNumber => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::RateLimitCheck(_)
            | Self::StoreUnavailable(_)
            | Self::Insert(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden => "FORBIDDEN",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::InvalidBody(_) => "INVALID_BODY",
            Self::MissingPhoneNumber => "PHONE_REQUIRED",
            Self::RateLimited { reason, .. } => reason.code(),
            Self::Duplicate => "DUPLICATE",
            Self::RateLimitCheck(_) => "RATE_LIMIT_CHECK_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Insert(_) => "INSERT_FAILED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Underlying cause, for operators.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::RateLimitCheck(e) | Self::StoreUnavailable(e) | Self::Insert(e) => {
                Some(e.to_string())
            }
            Self::Internal(detail) => Some(detail.clone()),
            _ => None,
        }
    }

    /// Build the response, optionally exposing [`IntakeError::details`].
    pub fn to_response(&self, expose_details: bool) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
            details: if expose_details { self.details() } else { None },
        };

        let mut response = (self.status(), Json(body)).into_response();
        if let Self::RateLimited { retry_after, .. } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        }
        response
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
