// ABOUTME: USDA FoodData Central API client for nutritional data retrieval
// ABOUTME: Implements rate-limited food search with nutrient extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! USDA `FoodData` Central client
//!
//! Production implementation of the [`FoodSearch`] port against the USDA
//! `FoodData` Central API. The API is free and requires only an API key.
//! Caching is *not* done here - wrap the client in
//! [`crate::external::cached::CachedFoodSearch`] with an injected cache
//! provider instead, so tests and deployments choose their own backend.
//!
//! # API Reference
//! USDA `FoodData` Central API: <https://fdc.nal.usda.gov/api-guide.html>

use super::food_search::FoodSearch;
use crate::config::UsdaApiConfig;
use crate::errors::{AppError, AppResult};
use crate::models::FoodCandidate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// USDA API search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<FoodResponse>,
}

#[derive(Debug, Deserialize)]
struct FoodResponse {
    #[serde(rename = "fdcId")]
    fdc_id: u64,
    #[serde(default)]
    description: String,
    #[serde(rename = "dataType", default)]
    data_type: String,
    #[serde(rename = "foodNutrients", default)]
    food_nutrients: Vec<FoodNutrientResponse>,
}

/// The search endpoint reports `value`; the detail endpoint reports `amount`
#[derive(Debug, Deserialize)]
struct FoodNutrientResponse {
    #[serde(rename = "nutrientId")]
    nutrient_id: Option<u32>,
    value: Option<f64>,
    amount: Option<f64>,
}

impl FoodResponse {
    fn into_candidate(self) -> FoodCandidate {
        let mut nutrients = HashMap::new();
        for entry in self.food_nutrients {
            let Some(id) = entry.nutrient_id else {
                continue;
            };
            if let Some(amount) = entry.amount.or(entry.value) {
                nutrients.insert(id, amount);
            }
        }
        FoodCandidate {
            fdc_id: self.fdc_id,
            description: self.description,
            data_type: self.data_type,
            nutrients,
        }
    }
}

/// Rate limiter for API requests
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    const fn new(limit: u32, window: Duration) -> Self {
        Self {
            requests: Vec::new(),
            limit,
            window,
        }
    }

    /// Check if a request can be made, removing expired entries
    fn can_request(&mut self) -> bool {
        let now = Instant::now();
        self.requests
            .retain(|&t| now.duration_since(t) < self.window);
        self.requests.len() < self.limit as usize
    }

    fn record_request(&mut self) {
        self.requests.push(Instant::now());
    }

    /// Wait until a request can be made
    async fn wait_if_needed(&mut self) {
        while !self.can_request() {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

/// USDA `FoodData` Central API client
pub struct UsdaClient {
    config: UsdaApiConfig,
    http_client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl UsdaClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the HTTP client cannot be constructed
    pub fn new(config: UsdaApiConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute, Duration::from_secs(60));
        Ok(Self {
            config,
            http_client,
            rate_limiter: Arc::new(Mutex::new(rate_limiter)),
        })
    }

    /// Search for foods by query string
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is malformed
    pub async fn search_foods(&self, query: &str) -> AppResult<Vec<FoodCandidate>> {
        if query.trim().is_empty() {
            return Err(AppError::invalid_input("search query cannot be empty"));
        }

        {
            let mut limiter = self.rate_limiter.lock().await;
            limiter.wait_if_needed().await;
            limiter.record_request();
        }

        let url = format!("{}/foods/search", self.config.base_url);
        let page_size = self.config.page_size.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", page_size.as_str()),
                ("dataType", "Survey (FNDDS),SR Legacy,Branded"),
                ("api_key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::external_service("USDA API", e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "USDA API",
                format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        let search_response: SearchResponse = response.json().await.map_err(|e| {
            AppError::external_service("USDA API", format!("JSON parse error: {e}"))
        })?;

        Ok(search_response
            .foods
            .into_iter()
            .map(FoodResponse::into_candidate)
            .collect())
    }
}

#[async_trait::async_trait]
impl FoodSearch for UsdaClient {
    async fn search(&self, query: &str) -> AppResult<Vec<FoodCandidate>> {
        self.search_foods(query).await
    }
}
