// ABOUTME: Arbiter port for breaking close, non-conflicting candidate ties
// ABOUTME: Narrow bounded interface so the implementation stays swappable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

use crate::errors::AppResult;
use crate::models::FoodCandidate;

/// External tie-breaker consulted only for close, non-conflicting candidates
///
/// The arbiter receives at most three pre-filtered candidates and returns an
/// index into that list; it can never introduce a candidate the scorer
/// rejected. Implementations may be rule-based, model-backed, or
/// human-in-the-loop.
#[async_trait::async_trait]
pub trait Arbiter: Send + Sync {
    /// Choose among the shortlisted candidates for the given query
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure; the matcher then falls back to
    /// its own top-scored candidate
    async fn choose(&self, query: &str, candidates: &[FoodCandidate]) -> AppResult<usize>;
}

/// Arbiter that always picks the first (top-scored) candidate
///
/// Useful as a stand-in when no external arbiter is wired up.
pub struct FirstCandidateArbiter;

#[async_trait::async_trait]
impl Arbiter for FirstCandidateArbiter {
    async fn choose(&self, _query: &str, _candidates: &[FoodCandidate]) -> AppResult<usize> {
        Ok(0)
    }
}
