// ABOUTME: Core data model for the grounding engine
// ABOUTME: RawIngredient, FoodCandidate, GroundedItem, ScaledItem, and result payload types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Data model for ingredient grounding
//!
//! The types here enforce the audit invariants of the pipeline at
//! construction time: an ingredient amount can only originate from an
//! audited source, and a fallback or ambiguous grounding can never carry
//! nutrients that downstream code could mistake for trusted data.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// USDA nutrient numbers used by the engine
pub mod nutrient {
    /// Energy (kcal)
    pub const ENERGY_KCAL: u32 = 1008;
    /// Protein (g)
    pub const PROTEIN_G: u32 = 1003;
    /// Total lipid / fat (g)
    pub const FAT_G: u32 = 1004;
    /// Carbohydrate, by difference (g)
    pub const CARB_G: u32 = 1005;
    /// Sodium (mg)
    pub const SODIUM_MG: u32 = 1093;
}

/// Where an ingredient (and in particular its amount) came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IngredientSource {
    /// Stated directly by the user
    User,
    /// Produced by the upstream estimator
    Estimator,
    /// Filled in by the portion resolver
    Resolver,
    /// Derived from search output - never trusted to carry an amount
    Search,
}

impl IngredientSource {
    /// Whether this source is audited enough to state a gram amount
    #[must_use]
    pub const fn may_state_amount(self) -> bool {
        matches!(self, Self::User | Self::Estimator | Self::Resolver)
    }
}

/// A loosely-specified ingredient mention awaiting grounding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIngredient {
    /// Ingredient name as supplied upstream
    pub name: String,
    /// Portion weight in grams, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Unit for `amount` - always grams in this core
    pub unit: String,
    /// Provenance of this ingredient and its amount
    pub source: IngredientSource,
    /// Coarse portion description ("large", "2 cups", "300g", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portion_label: Option<String>,
    /// Free-form notes, often carrying brand context ("McDonald's")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RawIngredient {
    /// Create an ingredient, enforcing the audited-amount invariant
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a positive amount is stated by a source
    /// that is not allowed to state one
    pub fn new(
        name: impl Into<String>,
        amount: Option<f64>,
        source: IngredientSource,
    ) -> AppResult<Self> {
        if let Some(grams) = amount {
            if grams > 0.0 && !source.may_state_amount() {
                return Err(AppError::invalid_input(format!(
                    "amount of {grams} g may not originate from source {source:?}"
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            amount,
            unit: "g".to_owned(),
            source,
            portion_label: None,
            notes: None,
        })
    }

    /// Ingredient named by the upstream estimator, weight unknown
    ///
    /// # Errors
    ///
    /// Never fails for a missing amount; kept fallible for signature symmetry
    pub fn estimated(name: impl Into<String>) -> AppResult<Self> {
        Self::new(name, None, IngredientSource::Estimator)
    }

    /// Ingredient with a user-stated gram weight
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `grams` is not positive
    pub fn from_user(name: impl Into<String>, grams: f64) -> AppResult<Self> {
        if grams <= 0.0 {
            return Err(AppError::invalid_input("user-stated grams must be positive"));
        }
        Self::new(name, Some(grams), IngredientSource::User)
    }

    /// Attach a portion label ("large", "2 scoops", ...)
    #[must_use]
    pub fn with_portion_label(mut self, label: impl Into<String>) -> Self {
        self.portion_label = Some(label.into());
        self
    }

    /// Attach free-form notes (brand context etc.)
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Record a weight decided by the portion resolver
    pub fn set_resolved_amount(&mut self, grams: f64) {
        self.amount = Some(grams);
        self.source = IngredientSource::Resolver;
    }
}

/// A record returned by the external food search API (read-only here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodCandidate {
    /// `FoodData` Central ID - opaque, round-trippable for attribution
    pub fdc_id: u64,
    /// Food description
    pub description: String,
    /// Data type (e.g. "Survey (FNDDS)", "SR Legacy", "Branded")
    pub data_type: String,
    /// Nutrient amounts per 100 units, keyed by USDA nutrient number
    pub nutrients: HashMap<u32, f64>,
}

impl FoodCandidate {
    /// Look up a nutrient amount per 100 units
    #[must_use]
    pub fn nutrient(&self, id: u32) -> Option<f64> {
        self.nutrients.get(&id).copied()
    }
}

/// Macronutrients per 100 g (or 100 mL for beverages)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroProfile {
    /// Energy (kcal)
    pub kcal: f64,
    /// Protein (g)
    pub protein_g: f64,
    /// Carbohydrate (g)
    pub carb_g: f64,
    /// Fat (g)
    pub fat_g: f64,
}

impl MacroProfile {
    /// Extract macros from a candidate, back-filling energy with the 4/4/9
    /// rule when the record carries macros but no energy field
    #[must_use]
    pub fn from_candidate(candidate: &FoodCandidate) -> Self {
        let mut profile = Self {
            kcal: candidate.nutrient(nutrient::ENERGY_KCAL).unwrap_or(0.0),
            protein_g: candidate.nutrient(nutrient::PROTEIN_G).unwrap_or(0.0),
            carb_g: candidate.nutrient(nutrient::CARB_G).unwrap_or(0.0),
            fat_g: candidate.nutrient(nutrient::FAT_G).unwrap_or(0.0),
        };
        if profile.kcal == 0.0 && !profile.is_zero() {
            profile.kcal = profile.macro_kcal();
        }
        profile
    }

    /// Energy implied by the macros alone (4p + 4c + 9f)
    #[must_use]
    pub fn macro_kcal(&self) -> f64 {
        self.fat_g
            .mul_add(9.0, self.protein_g.mul_add(4.0, self.carb_g * 4.0))
    }

    /// Whether every field is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.kcal == 0.0 && self.protein_g == 0.0 && self.carb_g == 0.0 && self.fat_g == 0.0
    }
}

/// How an ingredient was grounded
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// A single database record was accepted
    Matched,
    /// No acceptable record; nutrients are zero
    Fallback,
    /// Near-tied candidates disagree; caller must clarify
    Ambiguous,
}

/// A scored candidate kept as part of the explainability trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// `FoodData` Central ID
    pub fdc_id: u64,
    /// Candidate description
    pub description: String,
    /// Final blended score
    pub score: f64,
}

/// An ingredient grounded against the food database
///
/// Immutable after creation. Construct through [`GroundedItem::matched`],
/// [`GroundedItem::fallback`], or [`GroundedItem::ambiguous`] so the
/// zero-nutrient invariant for non-matched sources always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedItem {
    /// Original ingredient name
    pub name: String,
    /// Name after canonicalization, as sent to the search API
    pub normalized_name: String,
    /// Identifier of the accepted record, when matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<u64>,
    /// Grounding outcome
    pub source: MatchSource,
    /// Macros per 100 g of the accepted record (zero unless matched)
    pub per100: MacroProfile,
    /// Top scored candidates (≤ 3), persisted for audit
    pub top_candidates: Vec<ScoredCandidate>,
}

impl GroundedItem {
    /// An accepted match
    #[must_use]
    pub fn matched(
        name: impl Into<String>,
        normalized_name: impl Into<String>,
        match_id: u64,
        per100: MacroProfile,
        mut top_candidates: Vec<ScoredCandidate>,
    ) -> Self {
        top_candidates.truncate(3);
        Self {
            name: name.into(),
            normalized_name: normalized_name.into(),
            match_id: Some(match_id),
            source: MatchSource::Matched,
            per100,
            top_candidates,
        }
    }

    /// A zero-nutrient fallback
    #[must_use]
    pub fn fallback(name: impl Into<String>, normalized_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            normalized_name: normalized_name.into(),
            match_id: None,
            source: MatchSource::Fallback,
            per100: MacroProfile::default(),
            top_candidates: Vec::new(),
        }
    }

    /// An ambiguous result carrying candidates for clarification
    #[must_use]
    pub fn ambiguous(
        name: impl Into<String>,
        normalized_name: impl Into<String>,
        mut top_candidates: Vec<ScoredCandidate>,
    ) -> Self {
        top_candidates.truncate(3);
        Self {
            name: name.into(),
            normalized_name: normalized_name.into(),
            match_id: None,
            source: MatchSource::Ambiguous,
            per100: MacroProfile::default(),
            top_candidates,
        }
    }
}

/// An ingredient scaled to its resolved portion weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledItem {
    /// Ingredient name
    pub name: String,
    /// Resolved portion weight (grams)
    pub grams: f64,
    /// Energy (kcal) for the portion
    pub kcal: f64,
    /// Protein (g) for the portion
    pub protein_g: f64,
    /// Carbohydrate (g) for the portion
    pub carb_g: f64,
    /// Fat (g) for the portion
    pub fat_g: f64,
    /// Grounding outcome of the underlying item
    pub source: MatchSource,
    /// Identifier of the accepted record, when matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<u64>,
}

/// Aggregated nutrition totals with provenance breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Total energy (kcal), full precision
    pub kcal: f64,
    /// Total protein (g), full precision
    pub protein_g: f64,
    /// Total carbohydrate (g), full precision
    pub carb_g: f64,
    /// Total fat (g), full precision
    pub fat_g: f64,
    /// Energy rounded for display
    pub kcal_display: i64,
    /// Protein rounded for display
    pub protein_display: i64,
    /// Carbohydrate rounded for display
    pub carb_display: i64,
    /// Fat rounded for display
    pub fat_display: i64,
    /// Number of items aggregated
    pub item_count: usize,
    /// Items grounded against the database
    pub matched_count: usize,
    /// Items that degraded to zero-nutrient fallback
    pub fallback_count: usize,
    /// Items returned as ambiguous
    pub ambiguous_count: usize,
}

/// Attribution entry linking an item to its database record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    /// Ingredient name
    pub name: String,
    /// Database record identifier
    pub match_id: u64,
}

/// Explainability entry: candidates considered and the pick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explainability {
    /// Ingredient name
    pub name: String,
    /// Top scored candidates (≤ 3)
    pub top_candidates: Vec<ScoredCandidate>,
    /// Identifier of the selected record, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_id: Option<u64>,
}

/// How many ingredients each trust tier resolved
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PortionMetrics {
    /// Tier 1: explicit audited amounts passed through
    pub explicit: usize,
    /// Tier 2: brand+size or deterministic unit-label resolutions
    pub brand_size: usize,
    /// Tier 3: category heuristics
    pub category_heuristic: usize,
    /// Tier 4: last-resort defaults
    pub unresolved: usize,
}

impl PortionMetrics {
    /// Total ingredients observed
    #[must_use]
    pub const fn total(&self) -> usize {
        self.explicit + self.brand_size + self.category_heuristic + self.unresolved
    }

    /// Category-heuristic usage rate in percent
    #[must_use]
    pub fn heuristic_rate_pct(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.category_heuristic as f64 / total as f64) * 100.0
    }
}
