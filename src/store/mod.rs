// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission Store collaborator.
//!
//! The store is external. This module defines the two operations the
//! intake handler needs from it, a PostgREST client, a process-local
//! implementation, and the lazy per-process provider.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::models::{NewSubmission, Submission};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

/// Postgres SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint hit on insert
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected store response: {0}")]
    Decode(String),

    #[error("Store client unavailable: {0}")]
    Client(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Operations the intake handler needs from the Submission Store.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Count submissions with `source_hash` created at or after `since`.
    /// Implementations must not transfer rows.
    async fn count_since(&self, source_hash: &str, since: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Insert a submission and return the stored record. A uniqueness
    /// violation is reported as [`StoreError::Conflict`].
    async fn insert(&self, submission: NewSubmission) -> Result<Submission, StoreError>;
}

/// Classify a failed insert. Prefers the structured SQLSTATE, then the
/// HTTP status, then falls back to matching the message text.
pub fn classify_insert_failure(status: u16, code: Option<String>, message: String) -> StoreError {
    let lowered = message.to_lowercase();
    let conflict = code.as_deref() == Some(UNIQUE_VIOLATION)
        || status == 409
        || lowered.contains("duplicate")
        || lowered.contains("unique");

    if conflict {
        StoreError::Conflict(message)
    } else {
        StoreError::Rejected {
            status,
            code,
            message,
        }
    }
}

/// Build a store for the configured backend.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn SubmissionStore>, StoreError> {
    match &config.backend {
        StoreBackend::Rest(url) => {
            info!(host = ?url.host_str(), table = %config.table, "Connecting to REST store");
            Ok(Arc::new(RestStore::new(config)?))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

type StoreFactory = Box<dyn Fn() -> Result<Arc<dyn SubmissionStore>, StoreError> + Send + Sync>;

/// Lazily constructs the store on first use and caches it for the
/// process. A failed construction is not cached.
pub struct StoreProvider {
    factory: StoreFactory,
    store: OnceCell<Arc<dyn SubmissionStore>>,
}

impl StoreProvider {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SubmissionStore>, StoreError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            store: OnceCell::new(),
        }
    }

    pub fn from_config(config: StoreConfig) -> Self {
        Self::new(move || connect(&config))
    }

    /// Provider around an already constructed store.
    pub fn with_store(store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            factory: Box::new(|| Err(StoreError::Client("factory not set".to_string()))),
            store: OnceCell::new_with(Some(store)),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn SubmissionStore>, StoreError> {
        self.store
            .get_or_try_init(|| async { (self.factory)() })
            .await
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.store.initialized()
    }
}
