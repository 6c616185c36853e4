// ABOUTME: Structured logging setup for the grounding engine
// ABOUTME: Env-filtered tracing subscriber with a compact default format
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Logging configuration
//!
//! The engine logs structured events through `tracing`: match decisions at
//! debug, clamp events and degradations at warn, and per-pass summaries
//! (portion tiers, grounding counts, confidence) at info. Hosts that embed
//! the crate can install their own subscriber instead; `init` is for
//! standalone use.

use crate::errors::{AppError, AppResult};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber filtered by `RUST_LOG` (default `info`)
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed
pub fn init() -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::config(format!("failed to install tracing subscriber: {e}")))
}
