// ABOUTME: Pure arithmetic for portion scaling and nutrition aggregation
// ABOUTME: Scales per-100g profiles to resolved gram weights and sums totals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Scaler and Aggregator
//!
//! `scaled = per100 * grams / 100`, nothing else. Item fields are rounded
//! half-to-even at two decimals; totals are summed at full precision and
//! rounded only in the display fields. No I/O, no side effects, and the
//! aggregation is a commutative sum, so totals are independent of item
//! order.

use crate::models::{GroundedItem, MatchSource, ScaledItem, Totals};

/// Round half-to-even at two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Scale a grounded item's per-100 profile to its resolved portion weight
#[must_use]
pub fn scale(grounded: &GroundedItem, grams: f64) -> ScaledItem {
    let factor = grams / 100.0;
    ScaledItem {
        name: grounded.name.clone(),
        grams,
        kcal: round2(grounded.per100.kcal * factor),
        protein_g: round2(grounded.per100.protein_g * factor),
        carb_g: round2(grounded.per100.carb_g * factor),
        fat_g: round2(grounded.per100.fat_g * factor),
        source: grounded.source,
        match_id: grounded.match_id,
    }
}

/// Sum scaled items into totals with a provenance breakdown
#[must_use]
pub fn aggregate(items: &[ScaledItem]) -> Totals {
    let mut totals = Totals {
        item_count: items.len(),
        ..Totals::default()
    };
    for item in items {
        totals.kcal += item.kcal;
        totals.protein_g += item.protein_g;
        totals.carb_g += item.carb_g;
        totals.fat_g += item.fat_g;
        match item.source {
            MatchSource::Matched => totals.matched_count += 1,
            MatchSource::Fallback => totals.fallback_count += 1,
            MatchSource::Ambiguous => totals.ambiguous_count += 1,
        }
    }
    totals.kcal_display = totals.kcal.round_ties_even() as i64;
    totals.protein_display = totals.protein_g.round_ties_even() as i64;
    totals.carb_display = totals.carb_g.round_ties_even() as i64;
    totals.fat_display = totals.fat_g.round_ties_even() as i64;
    totals
}
