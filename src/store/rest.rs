// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! PostgREST client for the submission table.

use super::{classify_insert_failure, StoreError, SubmissionStore};
use crate::config::{Secret, StoreBackend, StoreConfig};
use crate::models::{NewSubmission, Submission};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header::CONTENT_RANGE, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<String>,
}

impl PostgrestError {
    fn describe(self) -> (Option<String>, String) {
        let message = match self.details {
            Some(details) if !details.is_empty() => format!("{} ({})", self.message, details),
            _ => self.message,
        };
        (self.code, message)
    }
}

/// Submission store reached over the PostgREST HTTP dialect.
pub struct RestStore {
    endpoint: String,
    api_key: Secret,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base = match &config.backend {
            StoreBackend::Rest(url) => url,
            StoreBackend::Memory => {
                return Err(StoreError::Client("store backend is not a REST endpoint".to_string()))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;

        Ok(Self {
            endpoint: format!(
                "{}/rest/v1/{}",
                base.as_str().trim_end_matches('/'),
                config.table
            ),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.expose())
            .bearer_auth(self.api_key.expose())
    }
}

#[async_trait]
impl SubmissionStore for RestStore {
    async fn count_since(&self, source_hash: &str, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Millis, true);

        // HEAD with an exact count: the total comes back in Content-Range
        let response = self
            .authorized(self.client.head(&self.endpoint))
            .query(&[
                ("select", "*".to_string()),
                ("source_hash", format!("eq.{source_hash}")),
                ("created_at", format!("gte.{since}")),
            ])
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                code: None,
                message: status.canonical_reason().unwrap_or("count failed").to_string(),
            });
        }

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Decode("missing Content-Range header".to_string()))?;

        let count = parse_content_range_total(range)?;
        debug!(source_hash, count, "Counted submissions");
        Ok(count)
    }

    async fn insert(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let response = self
            .authorized(self.client.post(&self.endpoint))
            .header("Prefer", "return=representation")
            .json(&submission)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let rows: Vec<Submission> = response
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            return rows
                .into_iter()
                .next()
                .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let error: PostgrestError = serde_json::from_str(&body).unwrap_or_else(|_| PostgrestError {
            message: body.clone(),
            ..Default::default()
        });
        let (code, message) = error.describe();
        Err(classify_insert_failure(status.as_u16(), code, message))
    }
}

/// Parse the total from a `Content-Range` value such as `0-2/3` or `*/0`.
fn parse_content_range_total(value: &str) -> Result<u64, StoreError> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| StoreError::Decode(format!("unparseable Content-Range {value:?}")))
}
