// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tally for request floods.

use axum::http::StatusCode;
use std::collections::HashMap;

/// Counts responses by status, overall and per caller address.
#[derive(Debug, Default)]
pub struct OutcomeTally {
    by_status: HashMap<StatusCode, usize>,
    by_address: HashMap<String, HashMap<StatusCode, usize>>,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, address: &str, status: StatusCode) {
        *self.by_status.entry(status).or_insert(0) += 1;
        *self
            .by_address
            .entry(address.to_string())
            .or_default()
            .entry(status)
            .or_insert(0) += 1;
    }

    pub fn count(&self, status: StatusCode) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn count_for(&self, address: &str, status: StatusCode) -> usize {
        self.by_address
            .get(address)
            .and_then(|m| m.get(&status))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_status.values().sum()
    }
}
