// ABOUTME: Ports to external collaborators of the grounding engine
// ABOUTME: Food search API, tie-breaking arbiter, and the caching search wrapper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! External collaborator ports
//!
//! The engine consumes three narrow interfaces: a food search API, an
//! optional arbiter for close ties, and a cache. Each is a trait so the
//! production implementation (USDA `FoodData` Central over HTTP) and test
//! doubles are interchangeable.

/// Arbiter port for breaking close, non-conflicting ties
pub mod arbiter;
/// Caching wrapper around any food search implementation
pub mod cached;
/// Food search port and test double
pub mod food_search;
/// USDA `FoodData` Central client
pub mod usda;
