// ABOUTME: Configuration for the grounding engine components
// ABOUTME: Matcher scoring weights, portion resolution, validation thresholds, and USDA API settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Grounding Engine Configuration
//!
//! Every tunable of the engine lives here: candidate scoring weights,
//! acceptance thresholds, plausibility tolerances, confidence penalties, and
//! the USDA `FoodData` Central client settings. All defaults reproduce the
//! calibrated production values; overriding individual fields is the intended
//! way to experiment.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the grounding engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// Candidate matching and scoring settings
    pub matcher: MatcherConfig,
    /// Portion resolution settings
    pub portion: PortionConfig,
    /// Plausibility validation and confidence settings
    pub validation: ValidationConfig,
    /// USDA `FoodData` Central API settings
    pub usda: UsdaApiConfig,
    /// Orchestrator concurrency settings
    pub orchestrator: OrchestratorConfig,
}

impl GroundingConfig {
    /// Validate cross-field consistency
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when weights or bounds are inconsistent
    pub fn validate(&self) -> Result<(), AppError> {
        let w = self.matcher.bm25_weight + self.matcher.sequence_weight;
        if (w - 1.0).abs() > 1e-9 {
            return Err(AppError::config(format!(
                "bm25_weight + sequence_weight must sum to 1.0, got {w}"
            )));
        }
        if !(0.0..=1.0).contains(&self.matcher.close_ratio) {
            return Err(AppError::config("close_ratio must be within [0, 1]"));
        }
        if self.validation.min_confidence >= self.validation.max_confidence {
            return Err(AppError::config(
                "min_confidence must be below max_confidence",
            ));
        }
        if self.orchestrator.max_concurrency == 0 {
            return Err(AppError::config("max_concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Matcher scoring and acceptance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Weight of the BM25-like token score in the blend (default 0.75)
    pub bm25_weight: f64,
    /// Weight of the sequence-similarity score in the blend (default 0.25)
    pub sequence_weight: f64,
    /// BM25 term-frequency saturation parameter (default 1.2)
    pub bm25_k1: f64,
    /// BM25 length-normalization parameter (default 0.75)
    pub bm25_b: f64,
    /// Penalty weight for description tokens absent from the query
    pub extra_token_penalty: f64,
    /// Penalty weight for query tokens absent from the description
    pub missing_token_penalty: f64,
    /// Bonus per data-source preference rank (curated > branded)
    pub data_source_bonus_step: f64,
    /// Minimum accepted score for strategies 1 and 2
    pub min_score: f64,
    /// Looser minimum score for the head-words strategy
    pub min_score_loose: f64,
    /// Competitors within this fraction of the top score count as "close"
    pub close_ratio: f64,
    /// Max kcal/100 g for a candidate claiming a diet/zero label
    pub diet_kcal_max_per_100: f64,
    /// Max fat g/100 g for a candidate claiming a lean label
    pub lean_fat_max_per_100: f64,
    /// Min protein g/100 g for a candidate claiming to be protein powder
    pub powder_protein_min_per_100: f64,
    /// Sodium mg/100 g above which a candidate is treated as non-food
    pub nonfood_sodium_mg_per_100: f64,
    /// Carb g/100 g that, with zero protein, marks a spice-blend profile
    pub nonfood_carb_g_per_100: f64,
    /// Version tag for cache-key invalidation when matching logic changes
    pub version: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            bm25_weight: 0.75,
            sequence_weight: 0.25,
            bm25_k1: 1.2,
            bm25_b: 0.75,
            extra_token_penalty: 0.08,
            missing_token_penalty: 0.12,
            data_source_bonus_step: 0.05,
            min_score: 0.35,
            min_score_loose: 0.25,
            close_ratio: 0.9,
            diet_kcal_max_per_100: 20.0,
            lean_fat_max_per_100: 15.0,
            powder_protein_min_per_100: 50.0,
            nonfood_sodium_mg_per_100: 5000.0,
            nonfood_carb_g_per_100: 40.0,
            version: "match-v2".to_owned(),
        }
    }
}

/// Portion resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortionConfig {
    /// Last-resort default weight when nothing resolves (grams)
    pub default_grams: f64,
    /// Category-heuristic usage rate (percent) above which a warning is logged
    pub heuristic_rate_warn_pct: f64,
}

impl Default for PortionConfig {
    fn default() -> Self {
        Self {
            default_grams: 100.0,
            heuristic_rate_warn_pct: 20.0,
        }
    }
}

/// Validation thresholds and confidence penalty composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Allowed relative deviation for the 4/4/9 macro-energy check
    pub macro_tolerance: f64,
    /// Base confidence before penalties
    pub base_confidence: f64,
    /// Scale applied to the fallback-item ratio penalty
    pub fallback_penalty_scale: f64,
    /// Cap on the total fallback penalty
    pub fallback_penalty_cap: f64,
    /// Flat penalty when the macro-energy check fails
    pub macro_failure_penalty: f64,
    /// Penalty per portion-bound warning
    pub portion_warning_penalty: f64,
    /// Cap on the total portion-warning penalty
    pub portion_penalty_cap: f64,
    /// Extra penalty per high-severity portion warning
    pub high_severity_penalty: f64,
    /// Penalty per combo-sanity warning (smaller per item, capped higher)
    pub combo_warning_penalty: f64,
    /// Cap on the total combo-sanity penalty
    pub combo_penalty_cap: f64,
    /// Confidence floor - never reported as total failure
    pub min_confidence: f64,
    /// Confidence ceiling - never reported as certain
    pub max_confidence: f64,
    /// Max kcal/100 mL tolerated for a diet/zero beverage
    pub diet_beverage_kcal_max_per_100_ml: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            macro_tolerance: 0.10,
            base_confidence: 0.8,
            fallback_penalty_scale: 0.5,
            fallback_penalty_cap: 0.3,
            macro_failure_penalty: 0.1,
            portion_warning_penalty: 0.05,
            portion_penalty_cap: 0.2,
            high_severity_penalty: 0.05,
            combo_warning_penalty: 0.03,
            combo_penalty_cap: 0.25,
            min_confidence: 0.1,
            max_confidence: 0.95,
            diet_beverage_kcal_max_per_100_ml: 20.0,
        }
    }
}

/// USDA `FoodData` Central API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdaApiConfig {
    /// USDA API key (free from <https://fdc.nal.usda.gov/api-key-signup.html>)
    pub api_key: String,
    /// Base URL for USDA `FoodData` Central
    pub base_url: String,
    /// Number of candidates requested per search
    pub page_size: u32,
    /// API request timeout (seconds)
    pub timeout_secs: u64,
    /// Rate limit: requests per minute
    pub rate_limit_per_minute: u32,
}

impl Default for UsdaApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_owned(),
            page_size: 25,
            timeout_secs: 10,
            rate_limit_per_minute: 30,
        }
    }
}

/// Orchestrator concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Max ingredients grounded concurrently
    pub max_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}
