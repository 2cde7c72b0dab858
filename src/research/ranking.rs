//! Composite scoring for pooled search results
//!
//! Features are min-max normalized over the current pool, so scores are only
//! comparable within one ranking call.

use crate::types::SearchResult;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

// ============================================================================
// Weights
// ============================================================================

/// Weights of the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub position: f64,
    pub page_length: f64,
    pub desc_length: f64,
    pub url_frequency: f64,
}

impl ScoreWeights {
    /// Used when full page content was fetched
    pub const WITH_CONTENT: Self = Self {
        position: 0.40,
        page_length: 0.20,
        desc_length: 0.15,
        url_frequency: 0.25,
    };

    /// Used when only snippets are available
    pub const SNIPPET_ONLY: Self = Self {
        position: 0.50,
        page_length: 0.0,
        desc_length: 0.20,
        url_frequency: 0.30,
    };

    pub fn for_content(with_content: bool) -> Self {
        if with_content {
            Self::WITH_CONTENT
        } else {
            Self::SNIPPET_ONLY
        }
    }
}

// ============================================================================
// Sub-scores
// ============================================================================

/// Min-max scale into [0, 1]; a constant feature scales to all zeros
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    values
        .iter()
        .map(|v| if range > 0.0 { (v - min) / range } else { 0.0 })
        .collect()
}

/// Lower raw rank scores higher
pub fn position_score(normalized_position: f64) -> f64 {
    1.0 - normalized_position
}

/// Bell curve peaking at mid-length snippets
pub fn desc_length_score(normalized_length: f64) -> f64 {
    1.0 - 2.0 * (normalized_length - 0.5).abs()
}

/// Longer pages score higher up to 0.7, then decline to 0.4 at the longest
pub fn page_length_score(normalized_length: f64) -> f64 {
    if normalized_length <= 0.7 {
        normalized_length
    } else {
        0.7 - 0.3 * (normalized_length - 0.7) / 0.3
    }
}

/// Occurrences of each result's URL in the pool divided by the highest
/// occurrence count
pub fn url_frequency_norm(pool: &[SearchResult]) -> Vec<f64> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for result in pool {
        *counts.entry(result.url.as_str()).or_default() += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);

    pool.iter()
        .map(|r| {
            if max_count > 0 {
                counts[r.url.as_str()] as f64 / max_count as f64
            } else {
                0.0
            }
        })
        .collect()
}

// ============================================================================
// Ranking
// ============================================================================

/// Composite score for every result, in pool order
pub fn composite_scores(pool: &[SearchResult], with_content: bool) -> Vec<f64> {
    if pool.is_empty() {
        return Vec::new();
    }

    let weights = ScoreWeights::for_content(with_content);
    let positions: Vec<f64> = pool.iter().map(|r| r.position as f64).collect();
    let desc_lengths: Vec<f64> = pool
        .iter()
        .map(|r| r.snippet.chars().count() as f64)
        .collect();
    let page_lengths: Vec<f64> = pool
        .iter()
        .map(|r| r.content().chars().count() as f64)
        .collect();

    let positions = min_max_normalize(&positions);
    let desc_lengths = min_max_normalize(&desc_lengths);
    let page_lengths = min_max_normalize(&page_lengths);
    let frequencies = url_frequency_norm(pool);

    (0..pool.len())
        .map(|i| {
            let mut score = weights.position * position_score(positions[i])
                + weights.desc_length * desc_length_score(desc_lengths[i])
                + weights.url_frequency * frequencies[i];
            if with_content {
                score += weights.page_length * page_length_score(page_lengths[i]);
            }
            score
        })
        .collect()
}

/// Score the pool, order by descending score (pool order breaks ties), keep
/// the first occurrence of each URL and return at most `top_n` results with
/// their `score` set.
pub fn rank_results(pool: Vec<SearchResult>, top_n: usize, with_content: bool) -> Vec<SearchResult> {
    let scores = composite_scores(&pool, with_content);

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut slots: Vec<Option<SearchResult>> = pool.into_iter().map(Some).collect();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut ranked = Vec::with_capacity(top_n.min(slots.len()));

    for index in order {
        if ranked.len() >= top_n {
            break;
        }
        let Some(mut result) = slots[index].take() else {
            continue;
        };
        if !seen_urls.insert(result.url.clone()) {
            continue;
        }
        result.score = Some(scores[index]);
        ranked.push(result);
    }

    ranked
}
