// ABOUTME: Plausibility validation and confidence scoring for scaled nutrition results
// ABOUTME: Macro-energy consistency, portion bounds, combo sanity rules, and penalty composition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Validator and Confidence Scorer
//!
//! Runs a battery of plausibility checks over scaled items and folds the
//! outcomes into a single bounded confidence score:
//!
//! - **Macro-energy consistency** - actual energy vs 4p + 4c + 9f
//! - **Portion bounds** - category-keyed max-gram tables (oils and spices
//!   capped low, carb bases higher), severity escalating past 2x the bound
//! - **Combo sanity** - internally inconsistent results: diet beverages with
//!   material energy, leafy greens with meat-like protein, lean cuts with
//!   too much fat, skim milk with fat, water with calories
//! - **Energy-density bands** - composite dishes outside their expected
//!   kcal/100 g range are flagged, not rejected
//!
//! Checks emit structured warnings and never fail. Confidence starts from a
//! fixed base and subtracts capped penalties; the result is clamped to
//! [0.1, 0.95] - never certain, never total failure.

use crate::config::ValidationConfig;
use crate::models::{MatchSource, ScaledItem};
use crate::normalize::{dish_category, tokenize, CriticalToken, DishCategory};
use crate::portion::beverage_density;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-item maximum-gram bounds, keyed by name keyword (first match wins)
const PORTION_BOUNDS: &[(&str, f64, &str)] = &[
    // Oils and fats
    ("oil", 30.0, "fat"),
    ("butter", 30.0, "fat"),
    ("ghee", 30.0, "fat"),
    // Spices and condiments
    ("salt", 20.0, "condiment"),
    ("pepper", 20.0, "spice"),
    ("cumin", 20.0, "spice"),
    ("turmeric", 20.0, "spice"),
    ("paprika", 20.0, "spice"),
    ("oregano", 20.0, "spice"),
    ("basil", 20.0, "spice"),
    ("thyme", 20.0, "spice"),
    ("cinnamon", 20.0, "spice"),
    ("soy sauce", 20.0, "condiment"),
    ("vinegar", 20.0, "condiment"),
    ("lemon juice", 20.0, "condiment"),
    ("lime juice", 20.0, "condiment"),
    // Carb bases
    ("rice", 500.0, "carb_base"),
    ("pasta", 500.0, "carb_base"),
    ("bread", 500.0, "carb_base"),
    ("quinoa", 500.0, "carb_base"),
    ("oats", 500.0, "carb_base"),
    ("noodles", 500.0, "carb_base"),
    ("couscous", 500.0, "carb_base"),
];

/// Any single ingredient above this weight is suspicious regardless of category
const SINGLE_ITEM_MAX_GRAMS: f64 = 1000.0;

/// Leafy vegetables with implausible protein are mismatched records
const LEAFY_GREENS: &[&str] = &["spinach", "lettuce", "kale", "arugula", "greens", "cabbage"];
const LEAFY_PROTEIN_MAX_PER_100: f64 = 8.0;

const BEVERAGE_WORDS: &[&str] = &[
    "cola", "soda", "pop", "drink", "tea", "coffee", "water", "juice",
];

/// Expected kcal/100 g bands for composite dish categories
const ENERGY_DENSITY_BANDS: &[(DishCategory, f64, f64)] = &[
    (DishCategory::RiceMixedMain, 120.0, 260.0),
    (DishCategory::YogurtSide, 40.0, 150.0),
    (DishCategory::Curry, 80.0, 250.0),
    (DishCategory::Salad, 20.0, 180.0),
];

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Out of expected range
    Medium,
    /// Far out of expected range (e.g. past 2x a bound)
    High,
}

/// Result of the 4/4/9 macro-energy consistency check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroEnergyCheck {
    /// Whether actual energy is within tolerance of the macro-implied energy
    pub ok: bool,
    /// Relative deviation from the expected energy
    pub delta_pct: f64,
    /// Energy implied by 4p + 4c + 9f (kcal)
    pub expected_kcal: f64,
    /// Actual summed energy (kcal)
    pub actual_kcal: f64,
}

/// A structured plausibility warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Name of the offending item
    pub item_name: String,
    /// Rule category ("fat", "carb_base", "diet_beverage", ...)
    pub category: String,
    /// Severity of the violation
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

/// Full validation output, recomputed every pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Macro-energy consistency result
    pub macro_energy: MacroEnergyCheck,
    /// Portion-bound violations
    pub portion_warnings: Vec<ValidationWarning>,
    /// Combo-sanity and energy-density violations
    pub combo_warnings: Vec<ValidationWarning>,
    /// Bounded heuristic confidence in [0.1, 0.95]
    pub confidence: f64,
}

/// Plausibility validator and confidence scorer
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a validator with the given thresholds
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Run every check and compose the confidence score
    #[must_use]
    pub fn validate(&self, items: &[ScaledItem]) -> ValidationReport {
        let macro_energy = self.check_macro_energy(items);
        let portion_warnings = Self::check_portion_bounds(items);
        let mut combo_warnings = self.check_combo_sanity(items);
        combo_warnings.extend(Self::check_energy_density_bands(items));

        let confidence =
            self.compute_confidence(items, &macro_energy, &portion_warnings, &combo_warnings);

        ValidationReport {
            macro_energy,
            portion_warnings,
            combo_warnings,
            confidence,
        }
    }

    /// 4/4/9 consistency of summed energy against summed macros
    fn check_macro_energy(&self, items: &[ScaledItem]) -> MacroEnergyCheck {
        let actual: f64 = items.iter().map(|i| i.kcal).sum();
        let protein: f64 = items.iter().map(|i| i.protein_g).sum();
        let carb: f64 = items.iter().map(|i| i.carb_g).sum();
        let fat: f64 = items.iter().map(|i| i.fat_g).sum();
        let expected = fat.mul_add(9.0, protein.mul_add(4.0, carb * 4.0));

        if expected == 0.0 {
            // Nothing to compare against; zero energy is trivially consistent
            let ok = actual == 0.0;
            return MacroEnergyCheck {
                ok,
                delta_pct: if ok { 0.0 } else { 1.0 },
                expected_kcal: expected,
                actual_kcal: actual,
            };
        }

        let delta_pct = (actual - expected).abs() / expected;
        MacroEnergyCheck {
            ok: delta_pct <= self.config.macro_tolerance,
            delta_pct,
            expected_kcal: expected,
            actual_kcal: actual,
        }
    }

    /// Category-keyed max-gram checks
    fn check_portion_bounds(items: &[ScaledItem]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for item in items {
            let name_lower = item.name.to_lowercase();

            if let Some((_, max_grams, category)) = PORTION_BOUNDS
                .iter()
                .find(|(keyword, _, _)| name_lower.contains(keyword))
            {
                if item.grams > *max_grams {
                    let severity = if item.grams > max_grams * 2.0 {
                        Severity::High
                    } else {
                        Severity::Medium
                    };
                    warnings.push(ValidationWarning {
                        item_name: item.name.clone(),
                        category: (*category).to_owned(),
                        severity,
                        message: format!(
                            "{} ({:.0} g) exceeds typical {category} portion (max ~{max_grams:.0} g)",
                            item.name, item.grams
                        ),
                    });
                }
            }

            if item.grams > SINGLE_ITEM_MAX_GRAMS {
                warnings.push(ValidationWarning {
                    item_name: item.name.clone(),
                    category: "general".to_owned(),
                    severity: Severity::High,
                    message: format!(
                        "{} ({:.0} g) is unusually large for a single ingredient",
                        item.name, item.grams
                    ),
                });
            }
        }
        warnings
    }

    /// Cross-field combo sanity rules; each emits a structured warning
    fn check_combo_sanity(&self, items: &[ScaledItem]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for item in items {
            if item.grams <= 0.0 {
                continue;
            }
            let name_lower = item.name.to_lowercase();
            let tokens = tokenize(&name_lower);
            let has = |word: &str| tokens.iter().any(|t| t == word);
            let per100 = 100.0 / item.grams;
            let kcal_per_100g = item.kcal * per100;
            let protein_per_100g = item.protein_g * per100;
            let fat_per_100g = item.fat_g * per100;

            let critical = CriticalToken::extract(&item.name);
            let is_beverage = BEVERAGE_WORDS.iter().any(|w| has(w));

            // Diet/zero beverages must be near energy-free per 100 mL
            if critical.contains(&CriticalToken::Diet) && is_beverage {
                let kcal_per_100ml = kcal_per_100g * beverage_density(&item.name);
                if kcal_per_100ml > self.config.diet_beverage_kcal_max_per_100_ml {
                    warnings.push(ValidationWarning {
                        item_name: item.name.clone(),
                        category: "diet_beverage".to_owned(),
                        severity: Severity::High,
                        message: format!(
                            "{} carries {kcal_per_100ml:.0} kcal/100 mL despite a diet/zero label",
                            item.name
                        ),
                    });
                }
            }

            // Leafy greens with meat-like protein are mismatched records
            if LEAFY_GREENS.iter().any(|green| has(green))
                && protein_per_100g > LEAFY_PROTEIN_MAX_PER_100
            {
                warnings.push(ValidationWarning {
                    item_name: item.name.clone(),
                    category: "leafy_protein".to_owned(),
                    severity: Severity::Medium,
                    message: format!(
                        "{} shows {protein_per_100g:.1} g protein/100 g, implausible for greens",
                        item.name
                    ),
                });
            }

            // Lean-labeled cuts must match their stated fat budget
            let lean_pct = critical.iter().find_map(|t| match t {
                CriticalToken::Lean(pct) => Some(f64::from(*pct)),
                _ => None,
            });
            if let Some(pct) = lean_pct {
                let allowed_fat = (100.0 - pct) + 2.0;
                if fat_per_100g > allowed_fat {
                    warnings.push(ValidationWarning {
                        item_name: item.name.clone(),
                        category: "lean_fat".to_owned(),
                        severity: Severity::High,
                        message: format!(
                            "{} claims {pct:.0}% lean but carries {fat_per_100g:.1} g fat/100 g",
                            item.name
                        ),
                    });
                }
            } else if has("lean") && fat_per_100g > 15.0 {
                warnings.push(ValidationWarning {
                    item_name: item.name.clone(),
                    category: "lean_fat".to_owned(),
                    severity: Severity::Medium,
                    message: format!(
                        "{} is labeled lean but carries {fat_per_100g:.1} g fat/100 g",
                        item.name
                    ),
                });
            }

            // Skim milk with material fat
            if critical.contains(&CriticalToken::Skim) && has("milk") && fat_per_100g > 0.5 {
                warnings.push(ValidationWarning {
                    item_name: item.name.clone(),
                    category: "skim_fat".to_owned(),
                    severity: Severity::Medium,
                    message: format!(
                        "{} is skim but carries {fat_per_100g:.1} g fat/100 g",
                        item.name
                    ),
                });
            }

            // Plain water with energy
            if has("water") && !name_lower.contains("watermelon") && kcal_per_100g > 0.5 {
                warnings.push(ValidationWarning {
                    item_name: item.name.clone(),
                    category: "water_energy".to_owned(),
                    severity: Severity::Medium,
                    message: format!("{} is water yet carries energy", item.name),
                });
            }
        }
        warnings
    }

    /// Expected kcal/100 g bands for composite dishes
    fn check_energy_density_bands(items: &[ScaledItem]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for item in items {
            if item.grams <= 0.0 || item.source != MatchSource::Matched {
                continue;
            }
            let Some(category) = dish_category(&item.name) else {
                continue;
            };
            let Some((_, low, high)) = ENERGY_DENSITY_BANDS
                .iter()
                .find(|(band_category, _, _)| *band_category == category)
            else {
                continue;
            };
            let kcal_per_100g = item.kcal * 100.0 / item.grams;
            if kcal_per_100g < *low || kcal_per_100g > *high {
                debug!(
                    name = %item.name,
                    kcal_per_100g,
                    low,
                    high,
                    "energy density outside category band"
                );
                warnings.push(ValidationWarning {
                    item_name: item.name.clone(),
                    category: "energy_density".to_owned(),
                    severity: Severity::Medium,
                    message: format!(
                        "{} at {kcal_per_100g:.0} kcal/100 g is outside the expected {low:.0}-{high:.0} range",
                        item.name
                    ),
                });
            }
        }
        warnings
    }

    /// Fold check outcomes into a bounded confidence score
    fn compute_confidence(
        &self,
        items: &[ScaledItem],
        macro_energy: &MacroEnergyCheck,
        portion_warnings: &[ValidationWarning],
        combo_warnings: &[ValidationWarning],
    ) -> f64 {
        let mut confidence = self.config.base_confidence;

        if !items.is_empty() {
            let fallback_count = items
                .iter()
                .filter(|i| i.source == MatchSource::Fallback)
                .count();
            let fallback_ratio = fallback_count as f64 / items.len() as f64;
            confidence -= (fallback_ratio * self.config.fallback_penalty_scale)
                .min(self.config.fallback_penalty_cap);
        }

        if !macro_energy.ok {
            confidence -= self.config.macro_failure_penalty;
        }

        let portion_penalty = (portion_warnings.len() as f64 * self.config.portion_warning_penalty)
            .min(self.config.portion_penalty_cap);
        confidence -= portion_penalty;
        let high_count = portion_warnings
            .iter()
            .filter(|w| w.severity == Severity::High)
            .count();
        confidence -= high_count as f64 * self.config.high_severity_penalty;

        let combo_penalty = (combo_warnings.len() as f64 * self.config.combo_warning_penalty)
            .min(self.config.combo_penalty_cap);
        confidence -= combo_penalty;

        confidence.clamp(self.config.min_confidence, self.config.max_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, grams: f64, kcal: f64, protein: f64, carb: f64, fat: f64) -> ScaledItem {
        ScaledItem {
            name: name.to_owned(),
            grams,
            kcal,
            protein_g: protein,
            carb_g: carb,
            fat_g: fat,
            source: MatchSource::Matched,
            match_id: Some(1),
        }
    }

    #[test]
    fn test_449_round_trip() {
        let validator = Validator::new(ValidationConfig::default());
        // energy = 4*10 + 4*20 + 9*5 = 165 exactly
        let items = vec![item("chicken and rice", 200.0, 165.0, 10.0, 20.0, 5.0)];
        let check = validator.check_macro_energy(&items);
        assert!(check.ok);
        assert!(check.delta_pct < 1e-9);
    }

    #[test]
    fn test_energy_without_macros_fails() {
        let validator = Validator::new(ValidationConfig::default());
        let items = vec![item("mystery", 100.0, 1000.0, 0.0, 0.0, 0.0)];
        let check = validator.check_macro_energy(&items);
        assert!(!check.ok);
    }

    #[test]
    fn test_diet_beverage_with_energy_flagged() {
        let validator = Validator::new(ValidationConfig::default());
        // 42 kcal/100 g on a diet cola
        let items = vec![item("diet cola", 330.0, 138.6, 0.0, 35.0, 0.0)];
        let warnings = validator.check_combo_sanity(&items);
        assert!(warnings.iter().any(|w| w.category == "diet_beverage"));
    }

    #[test]
    fn test_water_with_energy_flagged() {
        let validator = Validator::new(ValidationConfig::default());
        let items = vec![item("water", 500.0, 50.0, 0.0, 12.0, 0.0)];
        let warnings = validator.check_combo_sanity(&items);
        assert!(warnings.iter().any(|w| w.category == "water_energy"));
        // Watermelon is not water
        let melon = vec![item("watermelon", 200.0, 60.0, 1.2, 15.0, 0.3)];
        assert!(!validator
            .check_combo_sanity(&melon)
            .iter()
            .any(|w| w.category == "water_energy"));
    }

    #[test]
    fn test_confidence_bounds_hold() {
        let validator = Validator::new(ValidationConfig::default());
        // Worst case: everything fallback, macro failure, many warnings
        let mut items: Vec<ScaledItem> = (0..10)
            .map(|i| {
                let mut it = item(&format!("oil {i}"), 5000.0, 900.0, 0.0, 0.0, 0.0);
                it.source = MatchSource::Fallback;
                it
            })
            .collect();
        items.push(item("water", 100.0, 400.0, 0.0, 0.0, 0.0));
        let report = validator.validate(&items);
        assert!(report.confidence >= 0.1);
        assert!(report.confidence <= 0.95);
    }
}
