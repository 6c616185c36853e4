// ABOUTME: Integration tests for the multi-strategy food matcher
// ABOUTME: Covers critical-modifier gating, head anchoring, ambiguity, and arbiter bounding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Matcher behavior tests
//!
//! Exercises the matcher against a deterministic search double:
//! - critical-modifier enforcement ("diet" queries only match diet records)
//! - head anchoring (a "cola" query never grounds to an unrelated food)
//! - ambiguity on modifier conflicts and sanity disagreements
//! - arbiter delegation bounded to the pre-filtered shortlist
//! - transport degradation semantics

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use food_grounder::config::MatcherConfig;
use food_grounder::errors::AppResult;
use food_grounder::external::arbiter::Arbiter;
use food_grounder::external::food_search::{FoodSearch, StaticFoodSearch};
use food_grounder::matcher::Matcher;
use food_grounder::models::{FoodCandidate, MatchSource};
use std::sync::Arc;

mod common;
use common::{candidate, candidate_with_sodium};

fn matcher_over(foods: Vec<FoodCandidate>) -> Matcher {
    Matcher::new(
        MatcherConfig::default(),
        Arc::new(StaticFoodSearch::new(foods)),
        None,
    )
}

// ============================================================================
// CRITICAL-MODIFIER ENFORCEMENT
// ============================================================================

#[tokio::test]
async fn test_diet_query_matches_diet_candidate() {
    // "diet cola" against {Cola 42 kcal, Diet Cola 0.3 kcal}
    let matcher = matcher_over(vec![
        candidate(1, "Cola", "SR Legacy", 42.0, 0.0, 10.6, 0.0),
        candidate(2, "Diet Cola", "SR Legacy", 0.3, 0.0, 0.1, 0.0),
    ]);
    let item = matcher.search_best_match("diet cola", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Matched);
    assert_eq!(item.match_id, Some(2));
    assert!(item.per100.kcal <= 20.0);
}

#[tokio::test]
async fn test_diet_query_with_only_regular_candidate_is_ambiguous() {
    // "cola (diet)" with only "Cola, regular" present must
    // abstain, not force a pick
    let matcher = matcher_over(vec![candidate(
        1,
        "Cola, regular",
        "SR Legacy",
        42.0,
        0.0,
        10.6,
        0.0,
    )]);
    let item = matcher.search_best_match("cola (diet)", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Ambiguous);
    assert!(item.per100.is_zero());
    assert!(!item.top_candidates.is_empty());
}

#[tokio::test]
async fn test_mislabeled_diet_record_is_not_accepted() {
    // A record labeled "diet" but carrying 42 kcal/100 mL fails the sanity
    // check for the query's critical modifier
    let matcher = matcher_over(vec![candidate(
        1,
        "Diet Cola",
        "Branded",
        42.0,
        0.0,
        10.6,
        0.0,
    )]);
    let item = matcher.search_best_match("diet cola", None).await.unwrap();
    assert_ne!(item.source, MatchSource::Matched);
}

#[tokio::test]
async fn test_accepted_diet_matches_stay_low_energy() {
    // Property: for diet/zero queries, accepted energy <= 20 kcal/100 or the
    // outcome is ambiguous/fallback
    let pools = vec![
        vec![candidate(1, "Diet Cola", "SR Legacy", 0.3, 0.0, 0.1, 0.0)],
        vec![candidate(2, "Cola", "SR Legacy", 42.0, 0.0, 10.6, 0.0)],
        vec![candidate(3, "Diet Cola", "Branded", 55.0, 0.0, 13.0, 0.0)],
    ];
    for foods in pools {
        let matcher = matcher_over(foods);
        let item = matcher.search_best_match("diet cola", None).await.unwrap();
        if item.source == MatchSource::Matched {
            assert!(item.per100.kcal <= 20.0);
        }
    }
}

// ============================================================================
// HEAD ANCHORING AND STRUCTURAL FILTERS
// ============================================================================

#[tokio::test]
async fn test_head_anchor_rejects_unrelated_candidates() {
    // "diet turnover pastry" shares the "diet" token but lacks the head
    // token "cola"; it must never ground the query
    let matcher = matcher_over(vec![candidate(
        9,
        "Diet turnover pastry",
        "Branded",
        250.0,
        3.0,
        30.0,
        12.0,
    )]);
    let item = matcher.search_best_match("diet cola", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Fallback);
}

#[tokio::test]
async fn test_seasoning_candidates_filtered_for_whole_food_queries() {
    let matcher = matcher_over(vec![
        candidate(1, "Chicken seasoning mix", "Branded", 180.0, 8.0, 30.0, 2.0),
        candidate(2, "Chicken, breast, roasted", "SR Legacy", 165.0, 31.0, 0.0, 3.6),
    ]);
    let item = matcher.search_best_match("chicken", None).await.unwrap();
    assert_eq!(item.match_id, Some(2));
}

#[tokio::test]
async fn test_nonfood_nutrient_profile_filtered() {
    // Implausible sodium marks a spice blend even without pattern words
    let matcher = matcher_over(vec![
        candidate_with_sodium(1, "Chicken flavor cube", "Branded", 200.0, 20_000.0),
        candidate(2, "Chicken, breast, roasted", "SR Legacy", 165.0, 31.0, 0.0, 3.6),
    ]);
    let item = matcher.search_best_match("chicken", None).await.unwrap();
    assert_eq!(item.match_id, Some(2));
}

#[tokio::test]
async fn test_sweet_potato_fries_do_not_ground_plain_fries() {
    let matcher = matcher_over(vec![candidate(
        1,
        "Sweet potato fries, frozen",
        "SR Legacy",
        150.0,
        2.0,
        24.0,
        5.0,
    )]);
    let item = matcher.search_best_match("french fries", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Fallback);
}

// ============================================================================
// AMBIGUITY AND CONFLICT DETECTION
// ============================================================================

#[tokio::test]
async fn test_near_tie_with_differing_protein_source_is_ambiguous() {
    let matcher = matcher_over(vec![
        candidate(1, "Chicken rice bowl", "Survey (FNDDS)", 150.0, 9.0, 20.0, 3.0),
        candidate(2, "Beef rice bowl", "Survey (FNDDS)", 170.0, 10.0, 19.0, 5.0),
    ]);
    let item = matcher.search_best_match("rice bowl", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Ambiguous);
    assert_eq!(item.top_candidates.len(), 2);
}

#[tokio::test]
async fn test_sanity_disagreement_between_near_ties_abstains() {
    // Duplicate records, one mislabeled: abstain rather than "pick the sane
    // one" - the disagreement itself is evidence of ambiguity
    let matcher = matcher_over(vec![
        candidate(1, "Diet Cola", "Branded", 0.3, 0.0, 0.1, 0.0),
        candidate(2, "Diet Cola", "Branded", 90.0, 0.0, 22.0, 0.0),
    ]);
    let item = matcher.search_best_match("diet cola", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Ambiguous);
}

#[tokio::test]
async fn test_explainability_trail_carried_on_match() {
    let matcher = matcher_over(vec![
        candidate(1, "Rice, basmati, cooked", "SR Legacy", 121.0, 3.5, 25.2, 0.4),
        candidate(2, "Rice, white, cooked", "SR Legacy", 130.0, 2.7, 28.2, 0.3),
    ]);
    let item = matcher.search_best_match("basmati rice", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Matched);
    assert_eq!(item.match_id, Some(1));
    assert!(!item.top_candidates.is_empty());
    assert!(item.top_candidates.len() <= 3);
}

// ============================================================================
// ARBITER DELEGATION
// ============================================================================

struct FixedIndexArbiter {
    index: usize,
}

#[async_trait::async_trait]
impl Arbiter for FixedIndexArbiter {
    async fn choose(&self, _query: &str, _candidates: &[FoodCandidate]) -> AppResult<usize> {
        Ok(self.index)
    }
}

fn close_tie_foods() -> Vec<FoodCandidate> {
    // Identical descriptions and source: only the arbiter can separate them
    vec![
        candidate(1, "Apple, raw", "SR Legacy", 52.0, 0.3, 13.8, 0.2),
        candidate(2, "Apple, raw", "SR Legacy", 55.0, 0.3, 14.1, 0.2),
    ]
}

#[tokio::test]
async fn test_arbiter_breaks_close_ties() {
    let matcher = Matcher::new(
        MatcherConfig::default(),
        Arc::new(StaticFoodSearch::new(close_tie_foods())),
        Some(Arc::new(FixedIndexArbiter { index: 1 })),
    );
    let item = matcher.search_best_match("apple", None).await.unwrap();
    assert_eq!(item.match_id, Some(2));
}

#[tokio::test]
async fn test_arbiter_out_of_range_choice_is_bounded() {
    // The arbiter can never introduce a candidate outside the shortlist
    let matcher = Matcher::new(
        MatcherConfig::default(),
        Arc::new(StaticFoodSearch::new(close_tie_foods())),
        Some(Arc::new(FixedIndexArbiter { index: 99 })),
    );
    let item = matcher.search_best_match("apple", None).await.unwrap();
    assert_eq!(item.match_id, Some(1));
}

#[tokio::test]
async fn test_no_arbiter_takes_top_score() {
    let matcher = matcher_over(close_tie_foods());
    let item = matcher.search_best_match("apple", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Matched);
    assert_eq!(item.match_id, Some(1));
}

// ============================================================================
// DEGRADATION
// ============================================================================

#[tokio::test]
async fn test_unknown_food_degrades_to_fallback() {
    let matcher = matcher_over(vec![candidate(
        1,
        "Rice, white, cooked",
        "SR Legacy",
        130.0,
        2.7,
        28.2,
        0.3,
    )]);
    let item = matcher.search_best_match("dragonfruit smoothie", None).await.unwrap();
    assert_eq!(item.source, MatchSource::Fallback);
    assert!(item.per100.is_zero());
}

#[tokio::test]
async fn test_all_strategies_transport_failing_is_an_error() {
    let matcher = Matcher::new(
        MatcherConfig::default(),
        Arc::new(StaticFoodSearch::failing()),
        None,
    );
    let result = matcher.search_best_match("rice", None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_search_double_returns_overlapping_foods() {
    // Sanity check on the double itself: token overlap drives results
    let search = StaticFoodSearch::new(vec![candidate(
        1,
        "Rice, white, cooked",
        "SR Legacy",
        130.0,
        2.7,
        28.2,
        0.3,
    )]);
    assert_eq!(search.search("rice").await.unwrap().len(), 1);
    assert!(search.search("tofu").await.unwrap().is_empty());
}
