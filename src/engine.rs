// ABOUTME: Grounding orchestrator sequencing normalize, resolve, match, scale, and validate
// ABOUTME: Bounded per-ingredient concurrency with per-item failure containment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Grounding Orchestrator
//!
//! Sequences the full pipeline for a batch of ingredients: portion
//! resolution (synchronous, table-driven), then a semaphore-bounded
//! concurrent fan-out of the per-ingredient match chains, then the
//! synchronous barrier steps - scaling, aggregation, validation - over the
//! collected results.
//!
//! Per-item failures degrade that item to a zero-nutrient fallback and never
//! abort the batch; only a search API that is down for *every* item
//! propagates as an error. An optional deadline bounds each in-flight item:
//! items that time out degrade to fallback while completed items are kept.

use crate::config::GroundingConfig;
use crate::errors::{AppError, AppResult};
use crate::external::arbiter::Arbiter;
use crate::external::food_search::FoodSearch;
use crate::matcher::Matcher;
use crate::models::{
    Attribution, Explainability, GroundedItem, PortionMetrics, RawIngredient, ScaledItem, Totals,
};
use crate::portion::PortionResolver;
use crate::scale;
use crate::validation::{ValidationReport, Validator};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Complete output of one grounding pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingResult {
    /// Per-ingredient scaled nutrition
    pub items: Vec<ScaledItem>,
    /// Aggregated totals with provenance counts
    pub totals: Totals,
    /// Database attribution for matched items
    pub attribution: Vec<Attribution>,
    /// Candidate trails and selections for audit
    pub explainability: Vec<Explainability>,
    /// Plausibility checks and confidence
    pub validation: ValidationReport,
    /// Portion-resolution tier counts
    pub portion_metrics: PortionMetrics,
}

/// The grounding engine: one call turns raw ingredient mentions into
/// scaled, validated, attributed nutrition facts
pub struct Grounder {
    matcher: Arc<Matcher>,
    resolver: PortionResolver,
    validator: Validator,
    max_concurrency: usize,
}

impl Grounder {
    /// Assemble the engine from its configuration and ports
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration is inconsistent
    pub fn new(
        config: GroundingConfig,
        search: Arc<dyn FoodSearch>,
        arbiter: Option<Arc<dyn Arbiter>>,
    ) -> AppResult<Self> {
        config.validate()?;
        let matcher = Arc::new(Matcher::new(config.matcher.clone(), search, arbiter));
        let resolver = PortionResolver::new(config.portion.clone());
        let validator = Validator::new(config.validation.clone());
        Ok(Self {
            matcher,
            resolver,
            validator,
            max_concurrency: config.orchestrator.max_concurrency,
        })
    }

    /// Ground a batch of ingredients
    ///
    /// # Errors
    ///
    /// Returns an error only when the food search API failed for every
    /// ingredient, meaning the collaborator is down rather than the foods
    /// unknown
    pub async fn ground(&self, items: Vec<RawIngredient>) -> AppResult<GroundingResult> {
        self.ground_with_deadline(items, None).await
    }

    /// Ground a batch with a per-item deadline
    ///
    /// Items still in flight when their deadline expires degrade to
    /// fallback; already-completed items are kept.
    ///
    /// # Errors
    ///
    /// Same contract as [`Grounder::ground`]
    pub async fn ground_with_deadline(
        &self,
        mut items: Vec<RawIngredient>,
        deadline: Option<Duration>,
    ) -> AppResult<GroundingResult> {
        let metrics = self.resolver.resolve(&mut items);

        let (grounded, transport_failures) = self.ground_all(&items, deadline).await;
        if !items.is_empty() && transport_failures == items.len() {
            return Err(AppError::external_unavailable(
                "food search",
                "search failed for every ingredient in the batch",
            ));
        }

        Ok(Self::assemble(&self.validator, &items, &grounded, metrics))
    }

    /// Fan the match chains out under the concurrency bound
    async fn ground_all(
        &self,
        items: &[RawIngredient],
        deadline: Option<Duration>,
    ) -> (Vec<GroundedItem>, usize) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let futures = items.iter().map(|item| {
            let matcher = Arc::clone(&self.matcher);
            let semaphore = Arc::clone(&semaphore);
            let name = item.name.clone();
            let notes = item.notes.clone();
            async move {
                // An acquire can only fail if the semaphore closes, which
                // never happens here; degrade to fallback all the same.
                let Ok(_permit) = semaphore.acquire().await else {
                    return (GroundedItem::fallback(&name, &name), false);
                };
                let work = matcher.search_best_match(&name, notes.as_deref());
                let outcome = match deadline {
                    Some(limit) => match tokio::time::timeout(limit, work).await {
                        Ok(outcome) => outcome,
                        Err(_elapsed) => {
                            warn!(name = %name, "grounding deadline hit; degrading to fallback");
                            Ok(GroundedItem::fallback(&name, &name))
                        }
                    },
                    None => work.await,
                };
                match outcome {
                    Ok(grounded) => (grounded, false),
                    Err(error) => {
                        warn!(name = %name, %error, "grounding failed; degrading to fallback");
                        (GroundedItem::fallback(&name, &name), true)
                    }
                }
            }
        });

        let mut grounded = Vec::with_capacity(items.len());
        let mut transport_failures = 0_usize;
        for (item, failed) in join_all(futures).await {
            if failed {
                transport_failures += 1;
            }
            grounded.push(item);
        }
        (grounded, transport_failures)
    }

    /// Synchronous barrier: scale, aggregate, validate, attribute
    fn assemble(
        validator: &Validator,
        items: &[RawIngredient],
        grounded: &[GroundedItem],
        portion_metrics: PortionMetrics,
    ) -> GroundingResult {
        let scaled: Vec<_> = items
            .iter()
            .zip(grounded.iter())
            .map(|(item, grounded_item)| {
                // The resolver guarantees an amount for every ingredient
                let grams = item.amount.unwrap_or(0.0);
                scale::scale(grounded_item, grams)
            })
            .collect();

        let totals = scale::aggregate(&scaled);
        let validation = validator.validate(&scaled);

        let attribution: Vec<Attribution> = scaled
            .iter()
            .filter_map(|item| {
                item.match_id.map(|match_id| Attribution {
                    name: item.name.clone(),
                    match_id,
                })
            })
            .collect();

        let explainability: Vec<Explainability> = grounded
            .iter()
            .filter(|g| !g.top_candidates.is_empty())
            .map(|g| Explainability {
                name: g.name.clone(),
                top_candidates: g.top_candidates.clone(),
                selected_id: g.match_id,
            })
            .collect();

        info!(
            items = totals.item_count,
            matched = totals.matched_count,
            fallback = totals.fallback_count,
            ambiguous = totals.ambiguous_count,
            confidence = validation.confidence,
            "grounding pass complete"
        );

        GroundingResult {
            items: scaled,
            totals,
            attribution,
            explainability,
            validation,
            portion_metrics,
        }
    }
}
