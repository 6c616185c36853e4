// ABOUTME: Food search port consumed by the matcher
// ABOUTME: Includes a deterministic in-memory double for tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

use crate::errors::{AppError, AppResult};
use crate::models::FoodCandidate;
use crate::normalize::tokenize;

/// Black-box search API over the food-composition database
///
/// May return zero or many records; the engine assumes no ordering.
#[async_trait::async_trait]
pub trait FoodSearch: Send + Sync {
    /// Search for candidate records matching a query string
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure; "no results" is `Ok(vec![])`
    async fn search(&self, query: &str) -> AppResult<Vec<FoodCandidate>>;
}

/// Deterministic in-memory search double
///
/// Returns every configured food whose description shares a token with the
/// query. `failing()` simulates a dead transport.
pub struct StaticFoodSearch {
    foods: Vec<FoodCandidate>,
    fail: bool,
}

impl StaticFoodSearch {
    /// A double holding the given foods
    #[must_use]
    pub fn new(foods: Vec<FoodCandidate>) -> Self {
        Self { foods, fail: false }
    }

    /// A double that always returns no candidates
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A double whose every call fails on transport
    #[must_use]
    pub fn failing() -> Self {
        Self {
            foods: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl FoodSearch for StaticFoodSearch {
    async fn search(&self, query: &str) -> AppResult<Vec<FoodCandidate>> {
        if self.fail {
            return Err(AppError::external_service(
                "static food search",
                "simulated transport failure",
            ));
        }
        let query_tokens = tokenize(query);
        Ok(self
            .foods
            .iter()
            .filter(|food| {
                let desc_tokens = tokenize(&food.description);
                query_tokens.iter().any(|qt| desc_tokens.contains(qt))
            })
            .cloned()
            .collect())
    }
}
