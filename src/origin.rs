// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Origin Gate.
//!
//! Matches the browser-declared `Origin` against a static allow-list by
//! exact string equality and builds the CORS layer applied to every
//! response, including errors and preflights.

use axum::http::{HeaderMap, HeaderValue};
use std::collections::HashSet;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::debug;

/// Preflight cache lifetime.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Static origin allow-list.
#[derive(Debug, Clone)]
pub struct OriginGate {
    allowed: HashSet<String>,
}

impl OriginGate {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: origins.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact match only. No wildcard, scheme or subdomain folding.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        let allowed = origin.is_some_and(|o| self.allowed.contains(o));
        debug!(origin = ?origin, allowed, "Origin check");
        allowed
    }

    /// The request's `Origin` header, if it is valid UTF-8.
    pub fn request_origin(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(axum::http::header::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    /// CORS layer for every response.
    ///
    /// `Access-Control-Allow-Origin` is only set when the request origin
    /// is on the list. Preflight methods and headers are mirrored from
    /// the request, so a preflight always succeeds.
    pub fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .max_age(PREFLIGHT_MAX_AGE)
    }
}
