// ABOUTME: Multi-strategy food matching against the external search API
// ABOUTME: Strategy chain, candidate filtering, ambiguity detection, and arbiter delegation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Food Matcher
//!
//! Grounds a normalized ingredient name against the food database. Each
//! query walks an ordered strategy chain (as typed, parenthetical variants
//! relocated to the front, then head words only with a looser threshold)
//! and the first strategy producing an accepted match wins.
//!
//! Candidate selection filters non-foods, anchors on the query's head token,
//! enforces critical modifiers (a "diet" query only matches diet-labeled
//! records), and scores survivors with the in-batch scheme in [`scoring`].
//! Near-tied candidates that disagree on a load-bearing modifier, or whose
//! sanity checks disagree, produce an *ambiguous* result instead of a guess.
//! Remaining close ties are delegated to the external arbiter, which can
//! only pick from the pre-filtered top 3.
//!
//! Transport errors degrade the strategy to "no results"; the matcher itself
//! never retries. Only when every strategy fails on transport does the
//! per-item call return an error, so the orchestrator can tell a dead search
//! API from a missing food.

pub mod scoring;

use crate::config::MatcherConfig;
use crate::errors::{AppError, AppResult};
use crate::external::arbiter::Arbiter;
use crate::external::food_search::FoodSearch;
use crate::models::{nutrient, FoodCandidate, GroundedItem, MacroProfile, ScoredCandidate};
use crate::normalize::{
    self, canonicalize, exclusion_conflict, head_token, strip_parentheticals, tokenize,
    variant_first_query, CriticalToken,
};
use scoring::{score_candidate, ScoreContext};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Description patterns that mark seasonings and spice mixes, which must not
/// ground a whole-food query
const NON_FOOD_PATTERNS: &[&str] = &[
    "seasoning",
    "bouillon",
    "spice mix",
    "spice blend",
    "rub",
    "stock cube",
    "soup base",
];

/// Modifiers whose disagreement between near-tied candidates signals true
/// ambiguity rather than a ranking problem
const LOAD_BEARING_MODIFIERS: &[&str] = &["sweet", "veggie", "diet", "zero", "fried", "raw"];

/// Protein-source words; near-tied candidates naming different sources conflict
const PROTEIN_SOURCES: &[&str] = &[
    "chicken", "beef", "pork", "turkey", "fish", "tofu", "lamb", "shrimp", "egg",
];

/// Outcome of candidate selection for one strategy
enum Selection {
    Accepted(Box<GroundedItem>),
    Ambiguous(Vec<ScoredCandidate>),
    NoMatch,
}

/// Multi-strategy matcher over the food search port
pub struct Matcher {
    config: MatcherConfig,
    search: Arc<dyn FoodSearch>,
    arbiter: Option<Arc<dyn Arbiter>>,
}

impl Matcher {
    /// Create a matcher over a search port and an optional arbiter
    #[must_use]
    pub fn new(
        config: MatcherConfig,
        search: Arc<dyn FoodSearch>,
        arbiter: Option<Arc<dyn Arbiter>>,
    ) -> Self {
        Self {
            config,
            search,
            arbiter,
        }
    }

    /// Ground one ingredient name against the food database
    ///
    /// Never fails for "not found" or "ambiguous" - those are result
    /// variants of the returned [`GroundedItem`].
    ///
    /// # Errors
    ///
    /// Returns an error only when every query strategy failed on transport,
    /// meaning the search API is unreachable rather than the food unknown.
    pub async fn search_best_match(
        &self,
        name: &str,
        notes: Option<&str>,
    ) -> AppResult<GroundedItem> {
        let brand = notes.and_then(normalize::detect_brand);
        let scrubbed = normalize::scrub_measurements(name);
        let normalized = canonicalize(&scrubbed, brand, None);
        if normalized.trim().is_empty() {
            return Ok(GroundedItem::fallback(name, normalized));
        }

        let critical = CriticalToken::extract(&normalized);
        let head = head_token(&normalized);
        let strategies = self.build_strategies(&normalized);

        let mut gate_rejected: Vec<ScoredCandidate> = Vec::new();
        let mut attempted = 0_usize;
        let mut transport_failures = 0_usize;

        for (query, min_score) in &strategies {
            attempted += 1;
            let candidates = match self.search.search(query).await {
                Ok(candidates) => candidates,
                Err(error) => {
                    warn!(query = %query, %error, "food search failed; trying next strategy");
                    transport_failures += 1;
                    continue;
                }
            };
            if candidates.is_empty() {
                debug!(query = %query, "no candidates returned");
                continue;
            }

            match self
                .select_best_match(
                    name,
                    &normalized,
                    query,
                    &critical,
                    head.as_deref(),
                    candidates,
                    *min_score,
                    &mut gate_rejected,
                )
                .await
            {
                Selection::Accepted(item) => return Ok(*item),
                Selection::Ambiguous(top) => {
                    return Ok(GroundedItem::ambiguous(name, normalized, top));
                }
                Selection::NoMatch => {}
            }
        }

        if attempted > 0 && transport_failures == attempted {
            return Err(AppError::external_service(
                "food search",
                format!("all {attempted} query strategies failed for '{normalized}'"),
            ));
        }

        if gate_rejected.is_empty() {
            Ok(GroundedItem::fallback(name, normalized))
        } else {
            // Candidates existed but every one violated the query's critical
            // modifiers; surface them for clarification instead of guessing.
            gate_rejected.sort_by(|a, b| b.score.total_cmp(&a.score));
            Ok(GroundedItem::ambiguous(name, normalized, gate_rejected))
        }
    }

    /// Ordered query strategies with their acceptance thresholds
    fn build_strategies(&self, normalized: &str) -> Vec<(String, f64)> {
        let mut strategies = vec![(normalized.to_owned(), self.config.min_score)];

        if let Some(variant_first) = variant_first_query(normalized) {
            if !strategies.iter().any(|(q, _)| q == &variant_first) {
                strategies.push((variant_first, self.config.min_score));
            }
        } else {
            let stripped = strip_parentheticals(normalized);
            if !stripped.is_empty() && !strategies.iter().any(|(q, _)| q == &stripped) {
                strategies.push((stripped, self.config.min_score));
            }
        }

        let head_words: Vec<String> = tokenize(&strip_parentheticals(normalized))
            .into_iter()
            .take(2)
            .collect();
        if !head_words.is_empty() {
            let head_query = head_words.join(" ");
            if !strategies.iter().any(|(q, _)| q == &head_query) {
                strategies.push((head_query, self.config.min_score_loose));
            }
        }

        strategies
    }

    /// Score and select among one strategy's candidates
    #[allow(clippy::too_many_arguments)]
    async fn select_best_match(
        &self,
        name: &str,
        normalized: &str,
        query: &str,
        critical: &[CriticalToken],
        head: Option<&str>,
        candidates: Vec<FoodCandidate>,
        min_score: f64,
        gate_rejected: &mut Vec<ScoredCandidate>,
    ) -> Selection {
        let query_lower = query.to_lowercase();
        let query_tokens = tokenize(query);
        let query_has_nonfood_term = NON_FOOD_PATTERNS
            .iter()
            .any(|pattern| query_lower.contains(pattern));

        // Structural filters: non-food patterns, nutrient-profile non-foods,
        // head anchoring, and exclusion-modifier conflicts.
        let survivors: Vec<FoodCandidate> = candidates
            .into_iter()
            .filter(|candidate| {
                let desc_lower = candidate.description.to_lowercase();
                if !query_has_nonfood_term
                    && NON_FOOD_PATTERNS.iter().any(|p| desc_lower.contains(p))
                {
                    debug!(desc = %candidate.description, "dropped non-food pattern");
                    return false;
                }
                if self.nonfood_nutrient_profile(candidate) {
                    debug!(desc = %candidate.description, "dropped non-food nutrient profile");
                    return false;
                }
                if let Some(anchor) = head {
                    if !tokenize(&desc_lower).iter().any(|t| t == anchor) {
                        debug!(desc = %candidate.description, anchor, "dropped: head anchor missing");
                        return false;
                    }
                }
                !exclusion_conflict(query, &candidate.description)
            })
            .collect();

        if survivors.is_empty() {
            return Selection::NoMatch;
        }

        // In-batch IDF over everything that survived the structural filters;
        // gate-failed candidates still contribute to token statistics.
        let token_sets: Vec<Vec<String>> = survivors
            .iter()
            .map(|c| tokenize(&c.description))
            .collect();
        let idf = scoring::idf_map(&token_sets);
        let avg_desc_len =
            token_sets.iter().map(Vec::len).sum::<usize>() as f64 / token_sets.len() as f64;
        let ctx = ScoreContext {
            query_tokens: &query_tokens,
            query_text: &query_lower,
            idf: &idf,
            candidate_count: survivors.len(),
            avg_desc_len,
        };

        let mut scored: Vec<(f64, &FoodCandidate)> = survivors
            .iter()
            .zip(token_sets.iter())
            .map(|(candidate, tokens)| {
                let score = score_candidate(
                    &self.config,
                    &ctx,
                    tokens,
                    &candidate.description,
                    &candidate.data_type,
                );
                (score, candidate)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        // Critical-modifier gate: a "diet" query only matches diet-labeled
        // records. Gate-failed candidates are remembered so an otherwise
        // empty chain can end ambiguous instead of silently falling back.
        let (passing, gated): (Vec<_>, Vec<_>) = scored.into_iter().partition(|(_, candidate)| {
            critical
                .iter()
                .all(|token| token.present_in(&candidate.description))
        });
        for (score, candidate) in &gated {
            if !gate_rejected.iter().any(|c| c.fdc_id == candidate.fdc_id) {
                gate_rejected.push(ScoredCandidate {
                    fdc_id: candidate.fdc_id,
                    description: candidate.description.clone(),
                    score: *score,
                });
            }
        }

        let Some(&(top_score, top)) = passing.first() else {
            return Selection::NoMatch;
        };
        if top_score < min_score {
            debug!(query = %query, top_score, min_score, "top score below threshold");
            return Selection::NoMatch;
        }

        let close: Vec<&(f64, &FoodCandidate)> = passing
            .iter()
            .filter(|(score, _)| *score >= self.config.close_ratio * top_score)
            .collect();
        let trail: Vec<ScoredCandidate> = passing
            .iter()
            .take(3)
            .map(|(score, candidate)| ScoredCandidate {
                fdc_id: candidate.fdc_id,
                description: candidate.description.clone(),
                score: *score,
            })
            .collect();

        // Near-tied candidates disagreeing on a load-bearing modifier are
        // true ambiguity; clarification beats guessing.
        if close.len() > 1 && Self::close_set_conflicts(&close) {
            debug!(query = %query, "close candidates conflict on load-bearing modifier");
            return Selection::Ambiguous(trail);
        }

        // A sanity disagreement between the two closest candidates is itself
        // evidence of ambiguity, not a tiebreak signal: abstain.
        if close.len() > 1 {
            let first_ok = self.claimed_type_sane(close[0].1);
            let second_ok = self.claimed_type_sane(close[1].1);
            if first_ok != second_ok {
                debug!(query = %query, "sanity disagreement between near-tied candidates");
                return Selection::Ambiguous(trail);
            }
        }

        // The winner must satisfy the query's own critical modifiers on its
        // nutrients too - a record labeled "diet" with 42 kcal is mislabeled.
        if !self.satisfies_query_sanity(top, critical, &query_tokens) {
            if !gate_rejected.iter().any(|c| c.fdc_id == top.fdc_id) {
                gate_rejected.push(ScoredCandidate {
                    fdc_id: top.fdc_id,
                    description: top.description.clone(),
                    score: top_score,
                });
            }
            return Selection::NoMatch;
        }

        let winner = if close.len() > 1 {
            self.arbitrate(query, &close).await
        } else {
            top
        };

        Selection::Accepted(Box::new(GroundedItem::matched(
            name,
            normalized,
            winner.fdc_id,
            MacroProfile::from_candidate(winner),
            trail,
        )))
    }

    /// Delegate a close, non-conflicting tie to the arbiter (top 3 only)
    async fn arbitrate<'a>(
        &self,
        query: &str,
        close: &[&(f64, &'a FoodCandidate)],
    ) -> &'a FoodCandidate {
        let shortlist: Vec<FoodCandidate> = close
            .iter()
            .take(3)
            .map(|(_, candidate)| (*candidate).clone())
            .collect();
        let Some(arbiter) = self.arbiter.as_ref() else {
            return close[0].1;
        };
        match arbiter.choose(query, &shortlist).await {
            Ok(index) if index < shortlist.len() => close[index].1,
            Ok(index) => {
                warn!(query = %query, index, "arbiter chose out-of-range index; using top score");
                close[0].1
            }
            Err(error) => {
                warn!(query = %query, %error, "arbiter unavailable; using top score");
                close[0].1
            }
        }
    }

    /// Spice blends disguised as food: implausible sodium, or sugar-profile
    /// carbs with no protein at all
    fn nonfood_nutrient_profile(&self, candidate: &FoodCandidate) -> bool {
        let sodium = candidate.nutrient(nutrient::SODIUM_MG).unwrap_or(0.0);
        let carb = candidate.nutrient(nutrient::CARB_G).unwrap_or(0.0);
        let protein = candidate.nutrient(nutrient::PROTEIN_G).unwrap_or(0.0);
        sodium > self.config.nonfood_sodium_mg_per_100
            || (carb > self.config.nonfood_carb_g_per_100 && protein == 0.0)
    }

    /// Plausibility of a candidate against its *own* claimed type
    fn claimed_type_sane(&self, candidate: &FoodCandidate) -> bool {
        let profile = MacroProfile::from_candidate(candidate);
        let desc = candidate.description.to_lowercase();
        let desc_tokens: HashSet<String> = tokenize(&desc).into_iter().collect();

        if (desc_tokens.contains("diet") || desc_tokens.contains("zero"))
            && profile.kcal > self.config.diet_kcal_max_per_100
        {
            return false;
        }
        if desc_tokens.contains("lean") && profile.fat_g > self.config.lean_fat_max_per_100 {
            return false;
        }
        if desc.contains("protein powder")
            && profile.protein_g < self.config.powder_protein_min_per_100
        {
            return false;
        }
        true
    }

    /// Plausibility of the winner against the *query's* critical modifiers
    fn satisfies_query_sanity(
        &self,
        candidate: &FoodCandidate,
        critical: &[CriticalToken],
        query_tokens: &[String],
    ) -> bool {
        let profile = MacroProfile::from_candidate(candidate);
        for token in critical {
            match token {
                CriticalToken::Diet | CriticalToken::Unsweetened => {
                    if profile.kcal > self.config.diet_kcal_max_per_100 {
                        return false;
                    }
                }
                CriticalToken::Lean(_) => {
                    if profile.fat_g > self.config.lean_fat_max_per_100 {
                        return false;
                    }
                }
                CriticalToken::Skim
                | CriticalToken::OnePercent
                | CriticalToken::TwoPercent
                | CriticalToken::Whole => {}
            }
        }
        let wants_powder = query_tokens.windows(2).any(|w| w[0] == "protein" && w[1] == "powder");
        if wants_powder && profile.protein_g < self.config.powder_protein_min_per_100 {
            return false;
        }
        true
    }

    /// Load-bearing modifier or protein-source disagreement in the close set
    fn close_set_conflicts(close: &[&(f64, &FoodCandidate)]) -> bool {
        let token_sets: Vec<HashSet<String>> = close
            .iter()
            .map(|(_, candidate)| tokenize(&candidate.description).into_iter().collect())
            .collect();

        for pair in token_sets.windows(2) {
            for modifier in LOAD_BEARING_MODIFIERS {
                if pair[0].contains(*modifier) != pair[1].contains(*modifier) {
                    return true;
                }
            }
            let sources_a: HashSet<&str> = PROTEIN_SOURCES
                .iter()
                .copied()
                .filter(|s| pair[0].contains(*s))
                .collect();
            let sources_b: HashSet<&str> = PROTEIN_SOURCES
                .iter()
                .copied()
                .filter(|s| pair[1].contains(*s))
                .collect();
            if !sources_a.is_empty() && !sources_b.is_empty() && sources_a != sources_b {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_chain_order_and_dedup() {
        let matcher = Matcher::new(
            MatcherConfig::default(),
            Arc::new(crate::external::food_search::StaticFoodSearch::empty()),
            None,
        );
        let strategies = matcher.build_strategies("cola (diet)");
        assert_eq!(strategies[0].0, "cola (diet)");
        assert_eq!(strategies[1].0, "diet cola");
        assert_eq!(strategies[2].0, "cola");
        // The loose threshold applies only to the head-words strategy
        assert!(strategies[2].1 < strategies[0].1);

        let single = matcher.build_strategies("rice");
        assert_eq!(single.len(), 1, "duplicate strategies must collapse");
    }
}
