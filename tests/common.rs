// ABOUTME: Shared helpers for integration tests
// ABOUTME: Builders for food candidates with macro nutrient profiles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

#![allow(dead_code)]

use food_grounder::models::{nutrient, FoodCandidate};
use std::collections::HashMap;

/// Build a candidate with the usual macro nutrients per 100 g
pub fn candidate(
    fdc_id: u64,
    description: &str,
    data_type: &str,
    kcal: f64,
    protein: f64,
    carb: f64,
    fat: f64,
) -> FoodCandidate {
    let mut nutrients = HashMap::new();
    nutrients.insert(nutrient::ENERGY_KCAL, kcal);
    nutrients.insert(nutrient::PROTEIN_G, protein);
    nutrients.insert(nutrient::CARB_G, carb);
    nutrients.insert(nutrient::FAT_G, fat);
    FoodCandidate {
        fdc_id,
        description: description.to_owned(),
        data_type: data_type.to_owned(),
        nutrients,
    }
}

/// Build a candidate that also reports sodium (mg/100 g)
pub fn candidate_with_sodium(
    fdc_id: u64,
    description: &str,
    data_type: &str,
    kcal: f64,
    sodium_mg: f64,
) -> FoodCandidate {
    let mut food = candidate(fdc_id, description, data_type, kcal, 1.0, 1.0, 1.0);
    food.nutrients.insert(nutrient::SODIUM_MG, sodium_mg);
    food
}
