// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist Intake Service
//!
//! Accepts waitlist phone-number submissions from an allow-listed site,
//! caps each caller network at a few accepted submissions per UTC day,
//! and stores accepted submissions in an external Submission Store.
//!
//! ## Configuration
//!
//! Read once at startup from environment variables (a `.env` file is
//! honoured). The process exits if a required value is missing:
//!
//! - `WAITLIST_STORE_URL`: Store base URL, or `memory` (required)
//! - `WAITLIST_STORE_KEY`: Store admin credential (required)
//! - `SOURCE_HASH_SALT`: Salt for the caller source hash (required)
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `ALLOWED_ORIGINS`: Comma-separated origin allow-list
//! - `DAILY_SUBMISSION_LIMIT`: Accepted submissions per source per day (default: 3)
//! - `WAITLIST_TABLE`: Store table (default: waitlist)
//! - `STORE_TIMEOUT_SECS`: Store call timeout (default: 10)
//! - `EXPOSE_ERROR_DETAILS`: Include store errors in 500 bodies (default: false)

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use waitlist_intake::{
    config::{Config, StoreBackend},
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env().context("Invalid configuration")?;
    let backend = match &config.store.backend {
        StoreBackend::Rest(_) => "rest",
        StoreBackend::Memory => "memory",
    };
    info!(
        bind_addr = %config.bind_addr,
        allowed_origins = ?config.intake.allowed_origins,
        daily_limit = config.rate_limit.daily_limit,
        store = backend,
        "Starting waitlist intake"
    );

    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    // Start server
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid BIND_ADDR {:?}", config.bind_addr))?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
