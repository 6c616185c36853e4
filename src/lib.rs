// ABOUTME: Main library entry point for the food grounding engine
// ABOUTME: Grounds noisy ingredient mentions into deterministic, auditable nutrition facts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

#![deny(unsafe_code)]

//! # Food Grounder
//!
//! A grounding and validation engine that turns loosely-specified food
//! ingredient mentions ("diet cola", "2 cups basmati rice (med)") into
//! deterministic, auditable nutrition facts. Upstream estimation is noisy;
//! downstream calorie ledgers need exact, defensible numbers with
//! provenance. This crate is the part in between.
//!
//! ## Pipeline
//!
//! 1. **Normalize** - transliterate, translate, alias-fold each name, and
//!    extract the critical modifiers (diet/zero, fat tier, lean-%)
//! 2. **Resolve portions** - ordered trust tiers from explicit grams down
//!    to a clamped last-resort default
//! 3. **Match** - multi-strategy search against the food database with
//!    structure-aware ranking; near-ties that disagree semantically come
//!    back as *ambiguous*, never as a silent guess
//! 4. **Scale & aggregate** - pure `per100 * grams / 100` arithmetic
//! 5. **Validate** - macro-energy consistency, portion bounds, combo sanity
//!    rules, and a bounded confidence score
//!
//! ## Example
//!
//! ```rust,no_run
//! use food_grounder::config::GroundingConfig;
//! use food_grounder::engine::Grounder;
//! use food_grounder::external::usda::UsdaClient;
//! use food_grounder::models::RawIngredient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), food_grounder::errors::AppError> {
//! let config = GroundingConfig::default();
//! let search = Arc::new(UsdaClient::new(config.usda.clone())?);
//! let grounder = Grounder::new(config, search, None)?;
//!
//! let items = vec![
//!     RawIngredient::estimated("diet cola")?.with_portion_label("large"),
//!     RawIngredient::from_user("basmati rice", 180.0)?,
//! ];
//! let result = grounder.ground(items).await?;
//! println!(
//!     "{} kcal at confidence {:.2}",
//!     result.totals.kcal_display, result.validation.confidence
//! );
//! # Ok(())
//! # }
//! ```

/// Cache port and in-memory provider
pub mod cache;

/// Engine configuration
pub mod config;

/// Grounding orchestrator
pub mod engine;

/// Unified error handling
pub mod errors;

/// Ports to external collaborators
pub mod external;

/// Structured logging setup
pub mod logging;

/// Multi-strategy food matcher
pub mod matcher;

/// Core data model
pub mod models;

/// Ingredient name normalization
pub mod normalize;

/// Tiered portion resolution
pub mod portion;

/// Portion scaling and aggregation
pub mod scale;

/// Plausibility validation and confidence scoring
pub mod validation;
