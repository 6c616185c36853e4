// ABOUTME: Candidate scoring for food matching
// ABOUTME: In-batch IDF, BM25-like token score, sequence similarity, and penalty composition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Candidate scoring
//!
//! Scores are blended from a BM25-like token score and a sequence-similarity
//! ratio, then adjusted by IDF-weighted extra/missing-token penalties and a
//! data-source bonus. The IDF is computed *per query* from the candidate set
//! itself - no external corpus - so whatever token is common within this
//! result set is downweighted.

use crate::config::MatcherConfig;
use std::collections::{HashMap, HashSet};

/// Inverse document frequency over the in-batch candidate descriptions
///
/// Uses the BM25 idf form `ln(1 + (N - df + 0.5) / (df + 0.5))`, whose +0.5
/// smoothing keeps weights positive even for 1-candidate sets.
#[must_use]
pub fn idf_map(candidate_tokens: &[Vec<String>]) -> HashMap<String, f64> {
    let n = candidate_tokens.len() as f64;
    let mut document_freq: HashMap<&str, usize> = HashMap::new();
    for tokens in candidate_tokens {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for token in unique {
            *document_freq.entry(token).or_insert(0) += 1;
        }
    }
    document_freq
        .into_iter()
        .map(|(token, df)| {
            let df = df as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
            (token.to_owned(), idf)
        })
        .collect()
}

/// IDF for a token, with unseen tokens treated as maximally informative
fn idf_of(idf: &HashMap<String, f64>, token: &str, n: usize) -> f64 {
    idf.get(token).copied().unwrap_or_else(|| {
        let n = n as f64;
        (1.0 + (n + 0.5) / 0.5).ln()
    })
}

/// BM25-like score of a description against the query, normalized to [0, 1]
///
/// Normalization divides by the best achievable score (every query token
/// present), so the value is a weighted coverage measure.
#[must_use]
pub fn bm25_like(
    query_tokens: &[String],
    desc_tokens: &[String],
    idf: &HashMap<String, f64>,
    candidate_count: usize,
    avg_desc_len: f64,
    k1: f64,
    b: f64,
) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let mut term_freq: HashMap<&str, f64> = HashMap::new();
    for token in desc_tokens {
        *term_freq.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    let len_norm = if avg_desc_len > 0.0 {
        desc_tokens.len() as f64 / avg_desc_len
    } else {
        1.0
    };

    let mut score = 0.0;
    let mut best = 0.0;
    for token in query_tokens {
        let weight = idf_of(idf, token, candidate_count);
        best += weight;
        if let Some(tf) = term_freq.get(token.as_str()) {
            score += weight * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_norm));
        }
    }
    if best > 0.0 {
        // The saturation term tops out slightly above 1 for tf > 1; clamp
        (score / best).min(1.0)
    } else {
        0.0
    }
}

/// Sequence similarity as a longest-common-subsequence ratio
///
/// `2 * lcs(a, b) / (|a| + |b|)`, the difflib ratio over characters.
#[must_use]
pub fn sequence_similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }
    let mut prev = vec![0_usize; b_chars.len() + 1];
    let mut curr = vec![0_usize; b_chars.len() + 1];
    for &ca in &a_chars {
        for (j, &cb) in b_chars.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b_chars.len()] as f64;
    2.0 * lcs / (a_chars.len() + b_chars.len()) as f64
}

/// Ranking preference for the database's data sources
///
/// Curated composition data outranks branded/user-submitted data.
#[must_use]
pub fn data_source_rank(data_type: &str) -> u8 {
    if data_type.contains("Survey") {
        3
    } else if data_type.contains("SR Legacy") || data_type.contains("Foundation") {
        2
    } else if data_type.contains("Branded") {
        1
    } else {
        0
    }
}

/// Inputs shared by every candidate scored for one query
pub struct ScoreContext<'a> {
    /// Tokenized query
    pub query_tokens: &'a [String],
    /// Raw (lowercased) query string for sequence similarity
    pub query_text: &'a str,
    /// In-batch IDF
    pub idf: &'a HashMap<String, f64>,
    /// Number of candidates in the batch
    pub candidate_count: usize,
    /// Mean description length (tokens) in the batch
    pub avg_desc_len: f64,
}

/// Final blended score for one candidate
#[must_use]
pub fn score_candidate(
    config: &MatcherConfig,
    ctx: &ScoreContext<'_>,
    desc_tokens: &[String],
    desc_text: &str,
    data_type: &str,
) -> f64 {
    let bm25 = bm25_like(
        ctx.query_tokens,
        desc_tokens,
        ctx.idf,
        ctx.candidate_count,
        ctx.avg_desc_len,
        config.bm25_k1,
        config.bm25_b,
    );
    let sequence = sequence_similarity(ctx.query_text, &desc_text.to_lowercase());

    let query_set: HashSet<&str> = ctx.query_tokens.iter().map(String::as_str).collect();
    let desc_set: HashSet<&str> = desc_tokens.iter().map(String::as_str).collect();

    let extra_penalty = idf_weighted_fraction(
        desc_tokens,
        |t| !query_set.contains(t),
        ctx.idf,
        ctx.candidate_count,
    ) * config.extra_token_penalty;
    let missing_penalty = idf_weighted_fraction(
        ctx.query_tokens,
        |t| !desc_set.contains(t),
        ctx.idf,
        ctx.candidate_count,
    ) * config.missing_token_penalty;

    let bonus = f64::from(data_source_rank(data_type)) * config.data_source_bonus_step;

    config.sequence_weight.mul_add(sequence, config.bm25_weight * bm25) - extra_penalty
        - missing_penalty
        + bonus
}

/// Fraction of a token list's total IDF mass selected by `pred`
fn idf_weighted_fraction(
    tokens: &[String],
    pred: impl Fn(&str) -> bool,
    idf: &HashMap<String, f64>,
    candidate_count: usize,
) -> f64 {
    let mut selected = 0.0;
    let mut total = 0.0;
    for token in tokens {
        let weight = idf_of(idf, token, candidate_count);
        total += weight;
        if pred(token) {
            selected += weight;
        }
    }
    if total > 0.0 {
        selected / total
    } else {
        0.0
    }
}
