// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the waitlist intake service.
//!
//! Loaded once at startup from environment variables. Missing required
//! values fail the process before it binds a socket.

use axum::http::HeaderValue;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Store URL value that selects the process-local store.
pub const MEMORY_STORE: &str = "memory";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Configuration for the intake service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    pub bind_addr: String,

    /// Submission store connection
    pub store: StoreConfig,

    /// Origin allow-list and response policy
    pub intake: IntakeConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

/// Where and how to reach the Submission Store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Admin credential sent with every store call
    pub api_key: Secret,
    /// Table holding submissions (default: waitlist)
    pub table: String,
    /// Per-call timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgREST-compatible HTTP endpoint
    Rest(Url),
    /// Process-local store, for development and tests
    Memory,
}

/// Request handling policy.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Exact origins allowed to submit
    pub allowed_origins: Vec<String>,

    /// Include underlying error text in 500 bodies (default: false)
    pub expose_error_details: bool,
}

/// Per-source daily cap.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Accepted submissions per source hash per UTC day (default: 3)
    pub daily_limit: u32,

    /// Salt mixed into the source hash
    pub salt: Secret,
}

/// A configuration value that must not show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://waitlist.example.com".to_string(),
        "https://www.waitlist.example.com".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_daily_limit() -> u32 {
    3
}

fn default_table() -> String {
    "waitlist".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            expose_error_details: false,
        }
    }
}

impl StoreConfig {
    /// Process-local store with default table settings.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            api_key: Secret::new(""),
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RateLimitConfig {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            daily_limit: default_daily_limit(),
            salt: Secret::new(salt),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let store_url = required("WAITLIST_STORE_URL")?;
        let api_key = required("WAITLIST_STORE_KEY")?;
        let salt = required("SOURCE_HASH_SALT")?;

        let backend = parse_backend(store_url.trim())?;

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(list) => parse_origins(&list)?,
            None => default_allowed_origins(),
        };

        let daily_limit = match get("DAILY_SUBMISSION_LIMIT") {
            Some(v) => parse_number::<u32>("DAILY_SUBMISSION_LIMIT", &v)?,
            None => default_daily_limit(),
        };
        if daily_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "DAILY_SUBMISSION_LIMIT",
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs = match get("STORE_TIMEOUT_SECS") {
            Some(v) => parse_number::<u64>("STORE_TIMEOUT_SECS", &v)?,
            None => default_timeout_secs(),
        };

        let expose_error_details = match get("EXPOSE_ERROR_DETAILS") {
            Some(v) => parse_bool("EXPOSE_ERROR_DETAILS", &v)?,
            None => false,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(default_bind_addr),
            store: StoreConfig {
                backend,
                api_key: Secret::new(api_key),
                table: get("WAITLIST_TABLE").unwrap_or_else(default_table),
                timeout_secs,
            },
            intake: IntakeConfig {
                allowed_origins,
                expose_error_details,
            },
            rate_limit: RateLimitConfig {
                daily_limit,
                salt: Secret::new(salt),
            },
        })
    }
}

fn parse_backend(value: &str) -> Result<StoreBackend, ConfigError> {
    if value.eq_ignore_ascii_case(MEMORY_STORE) {
        return Ok(StoreBackend::Memory);
    }

    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        key: "WAITLIST_STORE_URL",
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(StoreBackend::Rest(url)),
        other => Err(ConfigError::Invalid {
            key: "WAITLIST_STORE_URL",
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

fn parse_origins(list: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::Invalid {
            key: "ALLOWED_ORIGINS",
            reason: "no origins listed".to_string(),
        });
    }

    // Every origin is later echoed back as a header value
    for origin in &origins {
        if origin == "*" {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_ORIGINS",
                reason: "wildcard origin is not allowed".to_string(),
            });
        }
        HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
            key: "ALLOWED_ORIGINS",
            reason: format!("{origin:?} is not a valid header value"),
        })?;
    }

    Ok(origins)
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("{value:?} is not a number"),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("{value:?} is not a boolean"),
        }),
    }
}
