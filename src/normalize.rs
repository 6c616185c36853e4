// ABOUTME: Deterministic ingredient-name canonicalization ahead of database search
// ABOUTME: Transliteration, alias folding, critical-modifier extraction, and head-token anchoring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Ingredient Name Normalizer
//!
//! Cleans and canonicalizes raw ingredient names before any external search
//! happens: Unicode is folded to ASCII, common non-English food words are
//! translated token-wise, brand context can rewrite words ("chips" under a
//! fast-food brand means fries), and exact-match aliases map variants onto
//! canonical forms. The normalizer also extracts the *critical modifier
//! tokens* (diet/zero, fat tier, lean-%) that later gate candidate
//! acceptance in the matcher.
//!
//! Every function here is total: empty or unmappable input passes through
//! unchanged, never panics.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Portion label aliases ("med" -> "medium")
const PORTION_ALIASES: &[(&str, &str)] = &[
    ("med", "medium"),
    ("lrg", "large"),
    ("lg", "large"),
    ("sml", "small"),
    ("sm", "small"),
    ("reg", "regular"),
];

/// Context-free name aliases, applied on exact match only
const NAME_ALIASES: &[(&str, &str)] = &[
    ("soda", "cola"),
    ("pop", "cola"),
    ("coke", "cola"),
    ("french fries", "fries"),
    ("potato fries", "fries"),
    ("whey protein", "protein powder (whey)"),
    ("whey powder", "protein powder (whey)"),
    ("protein shake powder", "protein powder (whey)"),
    ("casein protein", "protein powder (casein)"),
    ("plant protein", "protein powder (plant)"),
    ("pea protein", "protein powder (plant)"),
    ("whole milk", "milk (whole)"),
    ("2% milk", "milk (2%)"),
    ("1% milk", "milk (1%)"),
    ("skim milk", "milk (skim)"),
    ("nonfat milk", "milk (skim)"),
    ("fat free milk", "milk (skim)"),
];

/// Common food words in other languages, translated token-wise before search
const MULTILINGUAL_ALIASES: &[(&str, &str)] = &[
    // Spanish
    ("pollo", "chicken"),
    ("arroz", "rice"),
    ("leche", "milk"),
    ("queso", "cheese"),
    ("huevo", "egg"),
    ("carne", "meat"),
    ("pescado", "fish"),
    ("manzana", "apple"),
    ("naranja", "orange"),
    // French
    ("poulet", "chicken"),
    ("riz", "rice"),
    ("lait", "milk"),
    ("fromage", "cheese"),
    ("pain", "bread"),
    ("oeuf", "egg"),
    ("viande", "meat"),
    ("poisson", "fish"),
    ("pomme", "apple"),
    // German
    ("huhn", "chicken"),
    ("reis", "rice"),
    ("milch", "milk"),
    ("kase", "cheese"),
    ("brot", "bread"),
    ("ei", "egg"),
    ("fleisch", "meat"),
    ("fisch", "fish"),
    ("apfel", "apple"),
    // Italian
    ("riso", "rice"),
    ("latte", "milk"),
    ("formaggio", "cheese"),
    ("pane", "bread"),
    ("uovo", "egg"),
    ("pesce", "fish"),
    ("mela", "apple"),
    // Transliterated/common variants
    ("chai", "tea"),
    ("paneer", "cheese"),
    ("dal", "lentils"),
    ("naan", "bread"),
    ("roti", "bread"),
    ("chapati", "bread"),
];

/// Modifiers that, when present only on a candidate, disqualify it for the
/// listed query terms ("sweet potato fries" must not ground plain "fries")
const EXCLUSION_MODIFIERS: &[(&str, &[&str])] =
    &[("sweet", &["fries", "potato"]), ("veggie", &["burger"])];

/// Words skipped when looking for the head token
const HEAD_SKIP_WORDS: &[&str] = &[
    "a", "an", "of", "the", "cup", "cups", "g", "gram", "grams", "kg", "ml", "l", "oz", "tbsp",
    "tsp", "scoop", "scoops", "small", "medium", "large", "regular", "diet", "zero", "sugar",
    "free", "unsweetened", "skim", "nonfat", "whole", "lean", "plain",
];

static LEAN_PCT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*%\s*lean").ok());

static MEASUREMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\s?(?:g|ml|grams?|milliliters?|oz|fl\.?\s?oz)\b").ok()
});

static PARENTHETICAL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\([^)]*\)").ok());

/// Transliterate Unicode text to its closest ASCII form
///
/// Folds common Latin diacritics ("café" -> "cafe") and drops characters
/// with no ASCII mapping. Unknown Unicode never causes an error.
#[must_use]
pub fn fold_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(ch);
            continue;
        }
        let folded: &str = match ch {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => "a",
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => "e",
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => "i",
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => "o",
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => "u",
            'ý' | 'ÿ' | 'Ý' => "y",
            'ñ' | 'Ñ' => "n",
            'ç' | 'Ç' => "c",
            'ß' => "ss",
            'œ' | 'Œ' => "oe",
            'æ' | 'Æ' => "ae",
            '®' | '™' | '©' => "",
            // Unmappable: drop silently
            _ => "",
        };
        out.push_str(folded);
    }
    out
}

/// Lowercase, strip punctuation, split on whitespace
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Translate non-English food tokens to English, token by token
#[must_use]
pub fn apply_multilingual_aliases(name: &str) -> String {
    let lower = name.to_lowercase();
    let translated: Vec<&str> = lower
        .split_whitespace()
        .map(|token| {
            let clean = token.trim_matches(|c: char| c.is_ascii_punctuation());
            MULTILINGUAL_ALIASES
                .iter()
                .find(|(alias, _)| *alias == clean)
                .map_or(token, |(_, english)| {
                    tracing::debug!(token = clean, english, "translated food token");
                    *english
                })
        })
        .collect();
    translated.join(" ")
}

/// Detect a known brand in free text
#[must_use]
pub fn detect_brand(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    if lower.contains("mcdonald") || lower.contains("mcd ") || lower.ends_with("mcd") {
        Some("mcdonalds")
    } else if lower.contains("starbucks") || lower.contains("sbux") {
        Some("starbucks")
    } else if lower.contains("subway") {
        Some("subway")
    } else if lower.contains("kfc") {
        Some("kfc")
    } else {
        None
    }
}

/// Normalize an ingredient name to its canonical form
///
/// Runs strictly before any external search: transliteration, multilingual
/// translation, brand-context aliasing (exact token only), then the general
/// alias table on exact match.
#[must_use]
pub fn canonicalize(name: &str, brand: Option<&str>, category: Option<&str>) -> String {
    if name.trim().is_empty() {
        return name.to_owned();
    }

    let ascii = fold_ascii(name);
    let translated = apply_multilingual_aliases(&ascii);
    let mut lower = translated.to_lowercase().trim().to_owned();

    // Brand context: "chips" means fries in UK fast-food usage
    if let Some(brand_name) = brand {
        if detect_brand(brand_name) == Some("mcdonalds")
            && matches!(category, Some("starch-side" | "side"))
        {
            lower = lower
                .split_whitespace()
                .map(|t| if t == "chips" { "fries" } else { t })
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    for (alias, canonical) in NAME_ALIASES {
        if *alias == lower {
            return (*canonical).to_owned();
        }
    }

    lower
}

/// Normalize a portion label to canonical size words
#[must_use]
pub fn canonicalize_portion_label(portion_label: Option<&str>) -> Option<String> {
    let label = portion_label?;
    let mut lower = label.to_lowercase().trim().to_owned();
    for (alias, canonical) in PORTION_ALIASES {
        // Whole-token replacement; "medium" must not become "mediumium"
        lower = lower
            .split_whitespace()
            .map(|t| if t == *alias { *canonical } else { t })
            .collect::<Vec<_>>()
            .join(" ");
    }
    Some(lower)
}

/// Remove explicit weight/volume measurements and trademark glyphs
#[must_use]
pub fn scrub_measurements(name: &str) -> String {
    let cleaned = MEASUREMENT
        .as_ref()
        .map_or_else(|| name.to_owned(), |re| re.replace_all(name, "").into_owned());
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove parenthetical qualifiers
#[must_use]
pub fn strip_parentheticals(name: &str) -> String {
    let stripped = PARENTHETICAL
        .as_ref()
        .map_or_else(|| name.to_owned(), |re| re.replace_all(name, " ").into_owned());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Relocate parenthetical variants to the front: "cola (diet)" -> "diet cola"
///
/// Returns `None` when the name carries no parenthetical.
#[must_use]
pub fn variant_first_query(name: &str) -> Option<String> {
    let open = name.find('(')?;
    let close = name[open..].find(')')? + open;
    let variant = name[open + 1..close].trim();
    if variant.is_empty() {
        return None;
    }
    let base = strip_parentheticals(name);
    let variants: Vec<&str> = variant
        .split([',', '/'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    Some(format!("{} {}", variants.join(" "), base).trim().to_owned())
}

/// The first content token of a query, before any parenthetical
///
/// Skips quantities, units, size words, and critical modifiers so that
/// "2 cups basmati rice (med)" anchors on "basmati" and "diet cola" anchors
/// on "cola".
#[must_use]
pub fn head_token(query: &str) -> Option<String> {
    let base = strip_parentheticals(query);
    tokenize(&base).into_iter().find(|token| {
        !token.chars().all(|c| c.is_ascii_digit())
            && !HEAD_SKIP_WORDS.contains(&token.as_str())
            && !token.ends_with('%')
    })
}

/// A token that materially changes a food's nutrition profile
///
/// A query carrying one of these only matches candidates whose description
/// carries it too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalToken {
    /// Diet / zero / sugar-free beverages
    Diet,
    /// Explicit "unsweetened" marker
    Unsweetened,
    /// Skim / nonfat dairy
    Skim,
    /// 1% fat dairy
    OnePercent,
    /// 2% fat dairy
    TwoPercent,
    /// Whole-fat dairy
    Whole,
    /// "N% lean" meat marker
    Lean(u8),
}

impl CriticalToken {
    /// Extract the critical tokens present in a query
    #[must_use]
    pub fn extract(query: &str) -> Vec<Self> {
        let lower = query.to_lowercase();
        let tokens = tokenize(&lower);
        let has = |word: &str| tokens.iter().any(|t| t == word);

        let mut found = Vec::new();
        if has("diet") || has("zero") || lower.contains("sugar-free") || lower.contains("sugar free")
        {
            found.push(Self::Diet);
        }
        if has("unsweetened") {
            found.push(Self::Unsweetened);
        }
        if has("skim") || has("nonfat") || lower.contains("fat free") {
            found.push(Self::Skim);
        }
        if lower.contains("1%") {
            found.push(Self::OnePercent);
        }
        if lower.contains("2%") {
            found.push(Self::TwoPercent);
        }
        if has("whole") && (has("milk") || has("yogurt")) {
            found.push(Self::Whole);
        }
        if let Some(re) = LEAN_PCT.as_ref() {
            if let Some(caps) = re.captures(&lower) {
                if let Some(pct) = caps.get(1).and_then(|m| m.as_str().parse::<u8>().ok()) {
                    found.push(Self::Lean(pct));
                }
            }
        }
        found
    }

    /// Whether a candidate description carries this modifier
    ///
    /// Lean-% is satisfied by any lean marker: users write "93% lean" while
    /// the database says "90% lean meat / 10% fat".
    #[must_use]
    pub fn present_in(&self, description: &str) -> bool {
        let lower = description.to_lowercase();
        let tokens = tokenize(&lower);
        let has = |word: &str| tokens.iter().any(|t| t == word);
        match self {
            Self::Diet => {
                has("diet")
                    || has("zero")
                    || lower.contains("sugar-free")
                    || lower.contains("sugar free")
            }
            Self::Unsweetened => has("unsweetened"),
            Self::Skim => has("skim") || has("nonfat") || lower.contains("fat free"),
            Self::OnePercent => lower.contains("1%"),
            Self::TwoPercent => lower.contains("2%"),
            Self::Whole => has("whole"),
            Self::Lean(_) => has("lean"),
        }
    }
}

/// Check whether a candidate carries an exclusion modifier absent from the
/// query ("SWEET POTATO FRIES" offered for plain "fries")
#[must_use]
pub fn exclusion_conflict(query: &str, candidate_description: &str) -> bool {
    let query_lower = query.to_lowercase();
    let desc_lower = candidate_description.to_lowercase();
    for (modifier, blocked_terms) in EXCLUSION_MODIFIERS {
        if desc_lower.contains(modifier)
            && !query_lower.contains(modifier)
            && blocked_terms.iter().any(|term| query_lower.contains(term))
        {
            tracing::debug!(
                modifier,
                query = %query,
                "exclusion conflict with candidate"
            );
            return true;
        }
    }
    false
}

/// Composite-dish category used for energy-density validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishCategory {
    /// Biryani, pulao, fried rice, paella, ...
    RiceMixedMain,
    /// Raita, tzatziki, yogurt dips
    YogurtSide,
    /// Curries, dals, stews, chili
    Curry,
    /// Salads
    Salad,
}

/// Categorize a dish name for validation bands
#[must_use]
pub fn dish_category(name: &str) -> Option<DishCategory> {
    let lower = name.to_lowercase();
    let any = |kws: &[&str]| kws.iter().any(|kw| lower.contains(kw));

    if any(&["biryani", "pulao", "pilaf", "fried rice", "nasi goreng", "paella"]) {
        Some(DishCategory::RiceMixedMain)
    } else if any(&["raita", "tzatziki", "yogurt dip"]) {
        Some(DishCategory::YogurtSide)
    } else if any(&["curry", "dal", "daal", "stew", "chili"]) {
        Some(DishCategory::Curry)
    } else if lower.contains("salad") {
        Some(DishCategory::Salad)
    } else {
        None
    }
}
