// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist Intake
//!
//! A single-endpoint service that accepts phone-number submissions for a
//! waitlist:
//!
//! - Origin allow-list (exact match), CORS on every response
//! - Per-source daily cap keyed by a salted hash of the caller address
//! - Insert into an external Submission Store with duplicate detection

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod models;
pub mod origin;
pub mod store;

pub use config::Config;
pub use error::IntakeError;
pub use handlers::{router, AppState};
pub use limiter::{RateLimitResult, RateLimiter};
pub use origin::OriginGate;
pub use store::{StoreError, StoreProvider, SubmissionStore};
