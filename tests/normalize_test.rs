// ABOUTME: Integration tests for ingredient name normalization
// ABOUTME: Covers transliteration, multilingual aliasing, critical tokens, and head anchoring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Normalizer tests
//!
//! Normalization runs strictly before any search, so no non-English or
//! non-ASCII query ever reaches the search API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use food_grounder::normalize::{
    canonicalize, canonicalize_portion_label, fold_ascii, head_token, variant_first_query,
    CriticalToken,
};

mod common;

// ============================================================================
// TRANSLITERATION AND TRANSLATION
// ============================================================================

#[test]
fn test_accents_folded_before_search() {
    assert_eq!(canonicalize("café au lait", None, None), "cafe au milk");
    assert_eq!(fold_ascii("jalapeño"), "jalapeno");
}

#[test]
fn test_multilingual_names_translated() {
    assert_eq!(canonicalize("pollo con arroz", None, None), "chicken con rice");
    assert_eq!(canonicalize("Käse", None, None), "cheese");
    assert_eq!(canonicalize("paneer tikka", None, None), "cheese tikka");
}

#[test]
fn test_unmappable_unicode_never_panics() {
    // Emoji and CJK drop silently rather than crash
    let folded = fold_ascii("🍕 pizza 北京");
    assert!(folded.contains("pizza"));
    let canonical = canonicalize("🍕 pizza", None, None);
    assert!(canonical.contains("pizza"));
}

// ============================================================================
// ALIASES
// ============================================================================

#[test]
fn test_beverage_aliases() {
    assert_eq!(canonicalize("soda", None, None), "cola");
    assert_eq!(canonicalize("pop", None, None), "cola");
    assert_eq!(canonicalize("coke", None, None), "cola");
}

#[test]
fn test_milk_and_powder_aliases() {
    assert_eq!(canonicalize("skim milk", None, None), "milk (skim)");
    assert_eq!(canonicalize("whey protein", None, None), "protein powder (whey)");
}

#[test]
fn test_portion_label_canonicalization() {
    assert_eq!(canonicalize_portion_label(Some("Lg")), Some("large".to_owned()));
    assert_eq!(canonicalize_portion_label(Some("med plate")), Some("medium plate".to_owned()));
}

// ============================================================================
// CRITICAL TOKENS AND HEAD ANCHORING
// ============================================================================

#[test]
fn test_critical_tokens_gate_descriptions() {
    let critical = CriticalToken::extract("zero sugar cola");
    assert!(critical.contains(&CriticalToken::Diet));
    assert!(CriticalToken::Diet.present_in("Cola, zero calorie"));
    assert!(!CriticalToken::Diet.present_in("Cola"));
}

#[test]
fn test_lean_percentage_extraction() {
    assert_eq!(
        CriticalToken::extract("90% lean ground beef"),
        vec![CriticalToken::Lean(90)]
    );
}

#[test]
fn test_head_token_anchors_on_content() {
    assert_eq!(head_token("diet cola"), Some("cola".to_owned()));
    assert_eq!(head_token("2 cups basmati rice (med)"), Some("basmati".to_owned()));
    assert_eq!(head_token("large fries"), Some("fries".to_owned()));
}

#[test]
fn test_variant_relocation() {
    assert_eq!(variant_first_query("cola (diet)"), Some("diet cola".to_owned()));
    assert_eq!(
        variant_first_query("protein powder (whey)"),
        Some("whey protein powder".to_owned())
    );
    assert_eq!(variant_first_query("plain oats"), None);
}
