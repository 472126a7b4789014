// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-source daily submission cap.
//!
//! The caller's network address is reduced to a salted, truncated
//! SHA-256 hash. Accepted submissions carrying that hash since midnight
//! UTC are counted in the store; nothing is kept in process.

use crate::config::RateLimitConfig;
use crate::store::{StoreError, SubmissionStore};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Address used when no forwarding header identifies the caller.
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Length of the hex source hash.
pub const SOURCE_HASH_LEN: usize = 16;

/// Headers consulted for the caller address, in order.
const ADDRESS_HEADERS: [&str; 3] = ["x-forwarded-for", "cf-connecting-ip", "x-real-ip"];

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Submissions left today, counting this one
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Reason for rate limiting
        reason: RateLimitReason,
        /// Time until the window resets
        retry_after: Duration,
    },
}

/// Reason for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Source hash reached the daily cap
    DailyCapReached { limit: u32 },
}

impl RateLimitReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DailyCapReached { .. } => "RATE_LIMIT_IP",
        }
    }
}

impl std::fmt::Display for RateLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyCapReached { limit } => write!(
                f,
                "Too many submissions from this network. The limit is {limit} per day and resets at midnight UTC."
            ),
        }
    }
}

/// Store-backed daily rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    /// First 16 hex characters of SHA-256(address ‖ salt).
    pub fn source_hash(&self, address: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(address.as_bytes());
        hasher.update(self.config.salt.expose().as_bytes());
        let mut hash = hex::encode(hasher.finalize());
        hash.truncate(SOURCE_HASH_LEN);
        hash
    }

    /// Count today's submissions for `source_hash` and decide.
    pub async fn check(
        &self,
        store: &dyn SubmissionStore,
        source_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, StoreError> {
        let count = store.count_since(source_hash, window_start(now)).await?;
        let limit = u64::from(self.config.daily_limit);

        if count >= limit {
            debug!(source_hash, count, limit, "Daily cap reached");
            return Ok(RateLimitResult::Limited {
                reason: RateLimitReason::DailyCapReached {
                    limit: self.config.daily_limit,
                },
                retry_after: reset_in(now),
            });
        }

        Ok(RateLimitResult::Allowed {
            remaining: (limit - count - 1) as u32,
        })
    }
}

/// Caller address from forwarding headers.
///
/// Checks the first `X-Forwarded-For` entry, then `CF-Connecting-IP`,
/// then `X-Real-IP`, and falls back to [`UNKNOWN_ADDRESS`].
pub fn client_address(headers: &HeaderMap) -> String {
    ADDRESS_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim())
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_ADDRESS)
        .to_string()
}

/// Midnight UTC of `now`'s day.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Time until the next midnight UTC.
pub fn reset_in(now: DateTime<Utc>) -> Duration {
    let next = window_start(now) + ChronoDuration::days(1);
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSubmission;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn limiter(limit: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            daily_limit: limit,
            ..RateLimitConfig::new("test-salt")
        })
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    async fn insert(store: &MemoryStore, phone: &str, hash: &str, at: DateTime<Utc>) {
        store
            .insert(NewSubmission {
                phone_number: phone.to_string(),
                country_code: None,
                ip_country: None,
                device_id: None,
                source_hash: hash.to_string(),
                created_at: at,
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_source_hash_shape() {
        let hash = limiter(3).source_hash("203.0.113.7");
        assert_eq!(hash.len(), SOURCE_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(hash, "203.0.113.7");
    }

    #[test]
    fn test_source_hash_deterministic() {
        let a = limiter(3);
        let b = limiter(3);
        assert_eq!(a.source_hash("203.0.113.7"), b.source_hash("203.0.113.7"));
        assert_ne!(a.source_hash("203.0.113.7"), a.source_hash("203.0.113.8"));
    }

    #[test]
    fn test_source_hash_depends_on_salt() {
        let other = RateLimiter::new(RateLimitConfig::new("another-salt"));
        assert_ne!(
            limiter(3).source_hash("203.0.113.7"),
            other.source_hash("203.0.113.7")
        );
    }

    #[test]
    fn test_source_hash_known_value() {
        // sha256("abc") = ba7816bf8f01cfea...
        let limiter = RateLimiter::new(RateLimitConfig::new("c"));
        assert_eq!(limiter.source_hash("ab"), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_client_address_precedence() {
        assert_eq!(
            client_address(&headers(&[
                ("x-forwarded-for", "198.51.100.1, 10.0.0.1"),
                ("cf-connecting-ip", "198.51.100.2"),
                ("x-real-ip", "198.51.100.3"),
            ])),
            "198.51.100.1"
        );
        assert_eq!(
            client_address(&headers(&[
                ("cf-connecting-ip", "198.51.100.2"),
                ("x-real-ip", "198.51.100.3"),
            ])),
            "198.51.100.2"
        );
        assert_eq!(
            client_address(&headers(&[("x-real-ip", "198.51.100.3")])),
            "198.51.100.3"
        );
        assert_eq!(client_address(&HeaderMap::new()), UNKNOWN_ADDRESS);
    }

    #[test]
    fn test_client_address_skips_blank_values() {
        assert_eq!(
            client_address(&headers(&[
                ("x-forwarded-for", " "),
                ("x-real-ip", "198.51.100.3"),
            ])),
            "198.51.100.3"
        );
    }

    #[test]
    fn test_window_start_and_reset() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 30, 0).unwrap();
        assert_eq!(
            window_start(now),
            Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
        );
        assert_eq!(reset_in(now), Duration::from_secs(5 * 3600 + 30 * 60));

        let midnight = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert_eq!(window_start(midnight), midnight);
        assert_eq!(reset_in(midnight), Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_daily_cap() {
        let limiter = limiter(3);
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let hash = limiter.source_hash("203.0.113.7");

        for (i, expected_remaining) in [2u32, 1, 0].into_iter().enumerate() {
            match limiter.check(&store, &hash, now).await.unwrap() {
                RateLimitResult::Allowed { remaining } => assert_eq!(remaining, expected_remaining),
                other => panic!("request {} should be allowed, got {other:?}", i + 1),
            }
            insert(&store, &format!("+1555000{i}"), &hash, now).await;
        }

        match limiter.check(&store, &hash, now).await.unwrap() {
            RateLimitResult::Limited { reason, retry_after } => {
                assert_eq!(reason.code(), "RATE_LIMIT_IP");
                assert_eq!(retry_after, Duration::from_secs(12 * 3600));
            }
            other => panic!("should be limited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_yesterday_not_counted() {
        let limiter = limiter(1);
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 5).unwrap();
        let hash = limiter.source_hash("203.0.113.7");

        insert(&store, "+15550001", &hash, now - ChronoDuration::seconds(10)).await;

        assert!(matches!(
            limiter.check(&store, &hash, now).await.unwrap(),
            RateLimitResult::Allowed { remaining: 0 }
        ));
    }
}
