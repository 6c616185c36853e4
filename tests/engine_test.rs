// ABOUTME: End-to-end tests for the grounding orchestrator
// ABOUTME: Covers determinism, partial failure containment, deadlines, and cache de-dup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Orchestrator tests
//!
//! Full pipeline runs against the deterministic search double: per-item
//! degradation, batch-level error semantics, deadline behavior, and
//! bit-for-bit determinism of repeated passes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use food_grounder::cache::memory::InMemoryCache;
use food_grounder::config::GroundingConfig;
use food_grounder::engine::Grounder;
use food_grounder::errors::{AppResult, ErrorCode};
use food_grounder::external::cached::CachedFoodSearch;
use food_grounder::external::food_search::{FoodSearch, StaticFoodSearch};
use food_grounder::models::{FoodCandidate, MatchSource, RawIngredient};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::candidate;

fn pantry() -> Vec<FoodCandidate> {
    vec![
        candidate(100, "Diet Cola", "Branded", 0.3, 0.0, 0.1, 0.0),
        candidate(200, "Rice, basmati, cooked", "SR Legacy", 121.0, 3.5, 25.2, 0.4),
        candidate(300, "Chicken, breast, roasted", "SR Legacy", 165.0, 31.0, 0.0, 3.6),
    ]
}

fn grounder_over(foods: Vec<FoodCandidate>) -> Grounder {
    Grounder::new(
        GroundingConfig::default(),
        Arc::new(StaticFoodSearch::new(foods)),
        None,
    )
    .unwrap()
}

fn sample_items() -> Vec<RawIngredient> {
    vec![
        RawIngredient::estimated("diet cola")
            .unwrap()
            .with_portion_label("large"),
        RawIngredient::from_user("basmati rice", 180.0).unwrap(),
        RawIngredient::estimated("chicken breast")
            .unwrap()
            .with_portion_label("150g"),
    ]
}

// ============================================================================
// END-TO-END PIPELINE
// ============================================================================

#[tokio::test]
async fn test_full_pipeline_grounds_scales_and_validates() {
    let grounder = grounder_over(pantry());
    let result = grounder.ground(sample_items()).await.unwrap();

    assert_eq!(result.items.len(), 3);
    assert_eq!(result.totals.item_count, 3);
    assert_eq!(result.totals.matched_count, 3);
    assert_eq!(result.totals.fallback_count, 0);

    // Rice: 121 kcal/100 g at 180 g
    let rice = result.items.iter().find(|i| i.name == "basmati rice").unwrap();
    assert!((rice.kcal - 217.8).abs() < 0.01);
    assert_eq!(rice.match_id, Some(200));

    // Attribution covers every matched item
    assert_eq!(result.attribution.len(), 3);
    // Explainability carries the candidate trail for each grounded item
    assert_eq!(result.explainability.len(), 3);
    assert!(result.explainability.iter().all(|e| e.selected_id.is_some()));

    // Confidence is bounded
    assert!(result.validation.confidence >= 0.1);
    assert!(result.validation.confidence <= 0.95);
}

#[tokio::test]
async fn test_ground_is_deterministic() {
    let grounder = grounder_over(pantry());
    let first = grounder.ground(sample_items()).await.unwrap();
    let second = grounder.ground(sample_items()).await.unwrap();

    assert_eq!(first.items.len(), second.items.len());
    for (a, b) in first.items.iter().zip(second.items.iter()) {
        assert_eq!(a.kcal.to_bits(), b.kcal.to_bits());
        assert_eq!(a.protein_g.to_bits(), b.protein_g.to_bits());
        assert_eq!(a.carb_g.to_bits(), b.carb_g.to_bits());
        assert_eq!(a.fat_g.to_bits(), b.fat_g.to_bits());
        assert_eq!(a.match_id, b.match_id);
    }
    assert_eq!(
        first.validation.confidence.to_bits(),
        second.validation.confidence.to_bits()
    );
}

#[tokio::test]
async fn test_totals_are_order_independent() {
    let grounder = grounder_over(pantry());
    let forward = grounder.ground(sample_items()).await.unwrap();
    let mut reversed_items = sample_items();
    reversed_items.reverse();
    let reverse = grounder.ground(reversed_items).await.unwrap();
    assert!((forward.totals.kcal - reverse.totals.kcal).abs() < 1e-9);
    assert_eq!(forward.totals.matched_count, reverse.totals.matched_count);
}

// ============================================================================
// FAILURE CONTAINMENT
// ============================================================================

#[tokio::test]
async fn test_unknown_ingredient_degrades_only_itself() {
    let grounder = grounder_over(pantry());
    let mut items = sample_items();
    items.push(RawIngredient::estimated("xyzzy casserole").unwrap());
    let result = grounder.ground(items).await.unwrap();

    assert_eq!(result.totals.item_count, 4);
    assert_eq!(result.totals.matched_count, 3);
    assert_eq!(result.totals.fallback_count, 1);

    let fallback = result
        .items
        .iter()
        .find(|i| i.source == MatchSource::Fallback)
        .unwrap();
    assert_eq!(fallback.kcal, 0.0);
    assert!(fallback.match_id.is_none());
}

#[tokio::test]
async fn test_search_down_for_whole_batch_is_an_error() {
    let grounder = Grounder::new(
        GroundingConfig::default(),
        Arc::new(StaticFoodSearch::failing()),
        None,
    )
    .unwrap();
    let error = grounder.ground(sample_items()).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::ExternalServiceUnavailable);
}

#[tokio::test]
async fn test_empty_batch_is_ok() {
    let grounder = grounder_over(pantry());
    let result = grounder.ground(Vec::new()).await.unwrap();
    assert_eq!(result.totals.item_count, 0);
    assert!(result.validation.confidence >= 0.1);
}

// ============================================================================
// DEADLINES
// ============================================================================

/// Search double that never answers in time
struct SlowSearch;

#[async_trait::async_trait]
impl FoodSearch for SlowSearch {
    async fn search(&self, _query: &str) -> AppResult<Vec<FoodCandidate>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_deadline_degrades_to_fallback_without_batch_error() {
    let grounder = Grounder::new(GroundingConfig::default(), Arc::new(SlowSearch), None).unwrap();
    let result = grounder
        .ground_with_deadline(sample_items(), Some(Duration::from_millis(20)))
        .await
        .unwrap();
    // Timed-out items degrade; a timeout is not a transport failure, so the
    // batch itself succeeds
    assert_eq!(result.totals.fallback_count, 3);
    assert!(result.items.iter().all(|i| i.kcal == 0.0));
}

// ============================================================================
// CACHED SEARCH COMPOSITION
// ============================================================================

#[tokio::test]
async fn test_engine_over_cached_search_stays_deterministic() {
    let config = GroundingConfig::default();
    let cached = CachedFoodSearch::new(
        Arc::new(StaticFoodSearch::new(pantry())),
        Arc::new(InMemoryCache::new(64)),
        Duration::from_secs(60),
        config.matcher.version.clone(),
    );
    let grounder = Grounder::new(config, Arc::new(cached), None).unwrap();

    // First pass populates the cache, second pass reads it; results agree
    let first = grounder.ground(sample_items()).await.unwrap();
    let second = grounder.ground(sample_items()).await.unwrap();
    assert_eq!(first.totals.kcal.to_bits(), second.totals.kcal.to_bits());
    assert_eq!(first.totals.matched_count, second.totals.matched_count);
}
