// ABOUTME: Tiered portion resolution from ingredient names, labels, and brand context
// ABOUTME: Brand+size tables, unit-label parsing, category heuristics, and sanity clamping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Portion Resolver
//!
//! Converts a named portion into a deterministic gram weight through ordered
//! trust tiers, first match wins:
//!
//! 1. Explicit stated weight from an audited source (user/estimator)
//! 2. Brand+size lookup and deterministic unit labels (grams, mL, fl oz,
//!    scoops, tablespoons - volumes converted through a density table)
//! 3. Category heuristics (burger, fries, beverage, rice)
//! 4. Last-resort fixed default, counted as unresolved
//!
//! Every resolved weight - including tier 1 - is clamped to category-specific
//! bounds so a "500 g of fries" outlier cannot survive. Clamping is logged,
//! never silent. Tier counts are recorded in [`PortionMetrics`]; a high
//! category-heuristic rate means the trusted tiers are under-covering
//! traffic and should trend down.

use crate::config::PortionConfig;
use crate::models::{IngredientSource, PortionMetrics, RawIngredient};
use crate::normalize::{canonicalize_portion_label, detect_brand};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Brand + item (+ optional size) portion weights in grams
const BRAND_SIZE_PORTIONS: &[(&str, &str, Option<&str>, f64)] = &[
    ("mcdonalds", "cheeseburger", None, 119.0),
    ("mcdonalds", "hamburger", None, 100.0),
    ("mcdonalds", "big mac", None, 219.0),
    ("mcdonalds", "quarter pounder", None, 198.0),
    ("mcdonalds", "mcdouble", None, 170.0),
    ("mcdonalds", "fries", Some("small"), 71.0),
    ("mcdonalds", "fries", Some("medium"), 111.0),
    ("mcdonalds", "fries", Some("large"), 154.0),
    ("mcdonalds", "cola", Some("small"), 336.0),
    ("mcdonalds", "cola", Some("medium"), 567.0),
    ("mcdonalds", "cola", Some("large"), 851.0),
];

/// Beverage density (g/mL); default 1.0 for unknown liquids
const BEVERAGE_DENSITY: &[(&str, f64)] = &[
    ("milk", 1.03),
    ("juice", 1.04),
    ("soda", 1.04),
    ("cola", 1.04),
    ("water", 1.0),
];

/// Grams per scoop for powder products
const SCOOP_GRAMS: f64 = 30.0;

/// Milliliters per tablespoon
const TBSP_ML: f64 = 15.0;

/// Milliliters per fluid ounce
const OZ_ML: f64 = 29.5735;

static GRAMS_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*g(?:rams?)?(?:\s|$)").ok());
static KG_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*kg").ok());
static ML_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*ml").ok());
static LITER_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*l(?:iters?)?(?:\s|$)").ok());
static OZ_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:fl\s*)?oz").ok());
static SCOOP_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*scoops?").ok());
static TBSP_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:tbsp|tablespoons?|tbs)").ok());

/// Food category used for portion clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortionCategory {
    /// Burgers and similar handhelds
    Burger,
    /// Fried potato sides
    Fries,
    /// Drinks by the glass or cup
    Beverage,
    /// Sandwiches and wraps
    Sandwich,
    /// A single pizza slice
    PizzaSlice,
    /// Cooked rice portions
    Rice,
    /// A piece of chicken (breast, thigh, ...)
    ChickenPiece,
    /// Salads
    Salad,
}

impl PortionCategory {
    /// Sanity bounds in grams for a single portion of this category
    #[must_use]
    pub const fn bounds(self) -> (f64, f64) {
        match self {
            Self::Burger => (80.0, 250.0),
            Self::Fries => (50.0, 200.0),
            Self::Beverage => (200.0, 1000.0),
            Self::Sandwich => (100.0, 350.0),
            Self::PizzaSlice => (80.0, 150.0),
            Self::Rice => (100.0, 300.0),
            Self::ChickenPiece => (80.0, 250.0),
            Self::Salad => (150.0, 400.0),
        }
    }

    /// Detect the clamping category for an ingredient name
    #[must_use]
    pub fn detect(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let any = |kws: &[&str]| kws.iter().any(|kw| lower.contains(kw));

        if any(&["burger"]) {
            Some(Self::Burger)
        } else if any(&["fries", "fry"]) {
            Some(Self::Fries)
        } else if any(&[
            "cola", "soda", "pop", "drink", "juice", "tea", "coffee", "water", "latte",
        ]) {
            // Syrups, sauces, and condiments are not beverages
            if any(&["syrup", "sauce", "ketchup", "mayo", "dressing", "condiment"]) {
                None
            } else {
                Some(Self::Beverage)
            }
        } else if any(&["sandwich", "wrap"]) {
            Some(Self::Sandwich)
        } else if lower.contains("pizza") && lower.contains("slice") {
            Some(Self::PizzaSlice)
        } else if lower.contains("rice") {
            Some(Self::Rice)
        } else if lower.contains("chicken")
            && any(&["piece", "breast", "thigh", "drumstick", "wing"])
        {
            Some(Self::ChickenPiece)
        } else if lower.contains("salad") {
            Some(Self::Salad)
        } else {
            None
        }
    }
}

/// Coarse portion size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Size {
    Small,
    Medium,
    Large,
}

impl Size {
    /// Detect a size word; the portion label outranks name/notes text
    fn detect(label: Option<&str>, name_and_notes: &str) -> Option<Self> {
        if let Some(label) = label {
            if let Some(size) = Self::from_text(label) {
                return Some(size);
            }
        }
        Self::from_text(name_and_notes)
    }

    fn from_text(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("small") || lower.contains("tall") {
            Some(Self::Small)
        } else if lower.contains("large") || lower.contains("grande") || lower.contains("venti") {
            Some(Self::Large)
        } else if lower.contains("medium") {
            Some(Self::Medium)
        } else {
            None
        }
    }
}

/// Density (g/mL) for an ingredient, defaulting to water
fn density_for(name: &str) -> f64 {
    let lower = name.to_lowercase();
    BEVERAGE_DENSITY
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(1.0, |(_, density)| *density)
}

/// Density lookup shared with the validator's per-100-mL normalization
#[must_use]
pub fn beverage_density(name: &str) -> f64 {
    density_for(name)
}

/// Clamp a gram weight to its category's sanity bounds
///
/// Idempotent: `clamp(clamp(x)) == clamp(x)`. Names without a detected
/// category pass through unchanged.
#[must_use]
pub fn clamp_to_category_bounds(name: &str, grams: f64) -> f64 {
    let Some(category) = PortionCategory::detect(name) else {
        return grams;
    };
    let (min_g, max_g) = category.bounds();
    let clamped = grams.clamp(min_g, max_g);
    if (clamped - grams).abs() > f64::EPSILON {
        warn!(
            name,
            category = ?category,
            grams,
            clamped,
            "portion clamped to category bounds"
        );
    }
    clamped
}

fn capture_f64(re: &LazyLock<Option<Regex>>, text: &str) -> Option<f64> {
    re.as_ref()?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Grams stated directly in a portion label ("300g", "1.5kg")
fn grams_from_label(label: &str) -> Option<f64> {
    if let Some(kg) = capture_f64(&KG_LABEL, label) {
        return Some(kg * 1000.0);
    }
    capture_f64(&GRAMS_LABEL, label)
}

/// Milliliters stated in a portion label ("250ml", "1.5L")
fn ml_from_label(label: &str) -> Option<f64> {
    if let Some(ml) = capture_f64(&ML_LABEL, label) {
        return Some(ml);
    }
    capture_f64(&LITER_LABEL, label).map(|liters| liters * 1000.0)
}

/// Tiered portion resolver
pub struct PortionResolver {
    config: PortionConfig,
}

impl PortionResolver {
    /// Create a resolver with the given configuration
    #[must_use]
    pub fn new(config: PortionConfig) -> Self {
        Self { config }
    }

    /// Resolve every ingredient's portion to grams, in place
    ///
    /// After this call each ingredient has `amount = Some(grams)`; weights
    /// not stated by an audited source carry `source = resolver`.
    pub fn resolve(&self, items: &mut [RawIngredient]) -> PortionMetrics {
        let mut metrics = PortionMetrics::default();

        for item in items.iter_mut() {
            self.resolve_one(item, &mut metrics);
        }

        let heuristic_rate = metrics.heuristic_rate_pct();
        info!(
            explicit = metrics.explicit,
            brand_size = metrics.brand_size,
            category_heuristic = metrics.category_heuristic,
            unresolved = metrics.unresolved,
            heuristic_rate_pct = heuristic_rate,
            "portion resolution pass complete"
        );
        if heuristic_rate > self.config.heuristic_rate_warn_pct {
            warn!(
                heuristic_rate_pct = heuristic_rate,
                target_pct = self.config.heuristic_rate_warn_pct,
                "high category-heuristic usage; trusted tiers are under-covering"
            );
        }

        metrics
    }

    fn resolve_one(&self, item: &mut RawIngredient, metrics: &mut PortionMetrics) {
        let label = canonicalize_portion_label(item.portion_label.as_deref());
        let label_ref = label.as_deref().unwrap_or("");
        let notes = item.notes.clone().unwrap_or_default();

        // Tier 1: explicit audited amount, clamp only
        if let Some(grams) = item.amount {
            if grams > 0.0
                && matches!(
                    item.source,
                    IngredientSource::User | IngredientSource::Estimator
                )
            {
                item.amount = Some(clamp_to_category_bounds(&item.name, grams));
                metrics.explicit += 1;
                debug!(name = %item.name, grams, "portion tier 1 (explicit)");
                return;
            }
        }

        // Tier 2: brand+size and deterministic unit labels
        if let Some(grams) = Self::brand_size_lookup(&item.name, &notes, label_ref)
            .or_else(|| Self::label_units_lookup(&item.name, &notes, label_ref))
        {
            item.set_resolved_amount(clamp_to_category_bounds(&item.name, grams));
            metrics.brand_size += 1;
            debug!(name = %item.name, grams, "portion tier 2 (brand/label)");
            return;
        }

        // Tier 3: category heuristics
        if let Some(grams) = Self::category_heuristic(&item.name, &notes, label_ref) {
            item.set_resolved_amount(clamp_to_category_bounds(&item.name, grams));
            metrics.category_heuristic += 1;
            debug!(name = %item.name, grams, "portion tier 3 (category heuristic)");
            return;
        }

        // Tier 4: fixed safe default, flagged as unresolved
        let grams = clamp_to_category_bounds(&item.name, self.config.default_grams);
        item.set_resolved_amount(grams);
        metrics.unresolved += 1;
        warn!(name = %item.name, grams, "portion unresolved; using default");
    }

    /// Tier 2a: static brand-portion table
    fn brand_size_lookup(name: &str, notes: &str, label: &str) -> Option<f64> {
        let combined = format!("{name} {notes}");
        let brand = detect_brand(&combined)?;
        let name_lower = name.to_lowercase();
        let size = Size::detect(Some(label), &combined);
        let size_word = size.map(|s| match s {
            Size::Small => "small",
            Size::Medium => "medium",
            Size::Large => "large",
        });

        // Sized items first (fries, cola), then size-free burger entries
        let item_key = if name_lower.contains("fries") || name_lower.contains("fry") {
            Some("fries")
        } else if ["cola", "coke", "soda", "pop"]
            .iter()
            .any(|kw| name_lower.contains(kw))
        {
            Some("cola")
        } else {
            None
        };
        if let (Some(item), Some(size_word)) = (item_key, size_word) {
            if let Some(grams) = Self::table_lookup(brand, item, Some(size_word)) {
                return Some(grams);
            }
        }

        let squashed = name_lower.replace(' ', "");
        BRAND_SIZE_PORTIONS
            .iter()
            .find(|(b, item, size, _)| {
                *b == brand && size.is_none() && squashed.contains(&item.replace(' ', ""))
            })
            .map(|(_, _, _, grams)| *grams)
    }

    fn table_lookup(brand: &str, item: &str, size: Option<&str>) -> Option<f64> {
        BRAND_SIZE_PORTIONS
            .iter()
            .find(|(b, i, s, _)| *b == brand && *i == item && *s == size)
            .map(|(_, _, _, grams)| *grams)
    }

    /// Tier 2b: deterministic unit labels (g/kg, mL/L, fl oz, scoops, tbsp)
    fn label_units_lookup(name: &str, _notes: &str, label: &str) -> Option<f64> {
        if label.is_empty() {
            return None;
        }
        let lower = label.to_lowercase();

        if let Some(grams) = grams_from_label(&lower) {
            return Some(grams);
        }
        if let Some(ml) = ml_from_label(&lower) {
            return Some(ml * density_for(name));
        }
        if let Some(scoops) = SCOOP_LABEL
            .as_ref()
            .and_then(|re| re.captures(&lower))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            return Some(scoops * SCOOP_GRAMS);
        }
        if let Some(oz) = capture_f64(&OZ_LABEL, &lower) {
            return Some(oz * OZ_ML * density_for(name));
        }
        if let Some(tbsp) = TBSP_LABEL
            .as_ref()
            .and_then(|re| re.captures(&lower))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            let name_lower = name.to_lowercase();
            let density = if ["syrup", "honey", "molasses"]
                .iter()
                .any(|kw| name_lower.contains(kw))
            {
                1.4
            } else if ["oil", "butter"].iter().any(|kw| name_lower.contains(kw)) {
                0.92
            } else {
                density_for(name)
            };
            return Some(tbsp * TBSP_ML * density);
        }
        None
    }

    /// Tier 3: generic size-to-grams mapping by food category
    fn category_heuristic(name: &str, notes: &str, label: &str) -> Option<f64> {
        let combined = format!("{name} {notes}").to_lowercase();
        let size = Size::detect(Some(label), &combined);
        let any = |kws: &[&str]| kws.iter().any(|kw| combined.contains(kw));

        if any(&["burger", "sandwich"]) {
            return Some(match size {
                Some(Size::Small) => 100.0,
                Some(Size::Large) => 200.0,
                _ => 150.0,
            });
        }
        if any(&["fries", "fry"]) {
            return Some(match size {
                Some(Size::Small) => 70.0,
                Some(Size::Large) => 155.0,
                _ => 110.0,
            });
        }
        if any(&[
            "cola", "soda", "pop", "drink", "juice", "tea", "coffee", "water", "latte",
            "cappuccino",
        ]) {
            let density = density_for(&combined);
            let ml = match size {
                Some(Size::Small) => 340.0,
                Some(Size::Large) => 680.0,
                _ => 475.0,
            };
            return Some(ml * density);
        }
        if combined.contains("rice") {
            return Some(match size {
                Some(Size::Small) => 150.0,
                Some(Size::Large) => 250.0,
                _ => 200.0,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_idempotent() {
        for grams in [0.0, 10.0, 120.0, 500.0, 10_000.0] {
            for name in ["fries", "rice", "cola", "unknown dish"] {
                let once = clamp_to_category_bounds(name, grams);
                let twice = clamp_to_category_bounds(name, once);
                assert!((once - twice).abs() < f64::EPSILON, "{name} at {grams}");
            }
        }
    }

    #[test]
    fn test_beverage_excludes_condiments() {
        assert_eq!(PortionCategory::detect("cola"), Some(PortionCategory::Beverage));
        assert_eq!(PortionCategory::detect("chocolate syrup drink mix"), None);
    }

    #[test]
    fn test_density_lookup() {
        assert!((density_for("whole milk") - 1.03).abs() < f64::EPSILON);
        assert!((density_for("green tea") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_label_unit_parsing() {
        assert_eq!(grams_from_label("300g"), Some(300.0));
        assert_eq!(grams_from_label("1.5kg"), Some(1500.0));
        assert_eq!(ml_from_label("250ml"), Some(250.0));
        assert_eq!(ml_from_label("1.5l"), Some(1500.0));
        assert_eq!(grams_from_label("large"), None);
    }
}
