// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Store doubles for dependency failure scenarios.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use waitlist_intake::{
    models::{NewSubmission, Submission},
    store::{MemoryStore, StoreError, SubmissionStore},
};

/// Which store operation misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    CountFails,
    InsertFails,
    CountPanics,
}

/// Memory store with an injected fault.
pub struct FaultyStore {
    fault: Fault,
    inner: MemoryStore,
    pub inserts: AtomicUsize,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            inner: MemoryStore::new(),
            inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SubmissionStore for FaultyStore {
    async fn count_since(&self, source_hash: &str, since: DateTime<Utc>) -> Result<u64, StoreError> {
        match self.fault {
            Fault::CountFails => Err(StoreError::Rejected {
                status: 503,
                code: None,
                message: "Service Unavailable".to_string(),
            }),
            Fault::CountPanics => panic!("count query exploded"),
            Fault::InsertFails => self.inner.count_since(source_hash, since).await,
        }
    }

    async fn insert(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::InsertFails => Err(StoreError::Rejected {
                status: 400,
                code: Some("23502".to_string()),
                message: "null value in column \"source_hash\"".to_string(),
            }),
            _ => self.inner.insert(submission).await,
        }
    }
}
