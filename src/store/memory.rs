// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Process-local submission store.

use super::{StoreError, SubmissionStore};
use crate::models::{NewSubmission, Submission};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// In-memory store enforcing a unique `phone_number`, like the
/// production table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submissions.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn count_since(&self, source_hash: &str, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let rows = self.rows.read().await;
        let count = rows
            .iter()
            .filter(|row| row.source_hash == source_hash && row.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn insert(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.phone_number == submission.phone_number) {
            return Err(StoreError::Conflict(
                "duplicate key value violates unique constraint on phone_number".to_string(),
            ));
        }

        let stored = Submission::from(submission);
        rows.push(stored.clone());
        Ok(stored)
    }
}
