//! Pure scoring strategies, one per algorithm kind.
//!
//! Every strategy maps `(Context, Config, CandidatePool)` to a ranked list
//! of raw scores. No I/O happens here; the pool carries everything a
//! strategy may read. A strategy that cannot produce candidates returns an
//! empty list, never an error, so the composer can fall back to the other
//! configs in the block.

mod collaborative;
mod content;
mod cross_sell;
mod popularity;

use chrono::{DateTime, Utc};

use crate::context::Context;
use crate::domain::config::{AlgorithmKind, RecommendationConfig};
use crate::domain::interaction::CandidatePool;
use crate::domain::product::ProductId;

/// Interaction window for the trending variant.
pub const TRENDING_WINDOW_DAYS: i64 = 14;

/// Trending caps the decay factor so recent interactions dominate even
/// when an operator configured a slow decay.
pub const TRENDING_MAX_DECAY: f64 = 0.85;

/// Evaluate one config's strategy against the pool.
///
/// Dispatch is exhaustive over [`AlgorithmKind`]; `Hybrid` yields nothing
/// here because its weights are read by the composer, which blends the
/// single-algorithm outputs itself.
pub fn score(
    context: &Context,
    config: &RecommendationConfig,
    pool: &CandidatePool,
) -> Vec<(ProductId, f64)> {
    let raw = match config.kind {
        AlgorithmKind::Popularity => popularity::score(context, config, pool, None),
        AlgorithmKind::Trending => {
            popularity::score(context, config, pool, Some(TRENDING_WINDOW_DAYS))
        }
        AlgorithmKind::ContentBased | AlgorithmKind::Similarity => {
            content::score(config, pool)
        }
        AlgorithmKind::Collaborative => collaborative::score(context, config, pool),
        AlgorithmKind::CrossSell => cross_sell::cross_sell(context, config, pool),
        AlgorithmKind::UpSell => cross_sell::up_sell(pool),
        AlgorithmKind::Custom => allow_list_scores(config, pool),
        AlgorithmKind::Hybrid => Vec::new(),
    };

    rank(context, config, pool, raw)
}

/// Filter to the config's allow-lists, drop the anchor and non-positive
/// scores, then order deterministically: score descending, product id
/// ascending on ties.
fn rank(
    context: &Context,
    config: &RecommendationConfig,
    pool: &CandidatePool,
    mut scores: Vec<(ProductId, f64)>,
) -> Vec<(ProductId, f64)> {
    scores.retain(|(product_id, score)| {
        if *score <= 0.0 || !score.is_finite() {
            return false;
        }
        if context.anchor_product.as_ref() == Some(product_id) {
            return false;
        }
        match pool.candidates.get(product_id) {
            Some(attributes) => config.allows_product(product_id, &attributes.category),
            None => false,
        }
    });
    scores.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    scores
}

/// Deterministic scoring for the `custom` kind: list order is rank.
fn allow_list_scores(config: &RecommendationConfig, pool: &CandidatePool) -> Vec<(ProductId, f64)> {
    let allowed = &config.filters.allowed_products;
    if allowed.is_empty() {
        return Vec::new();
    }
    let total = allowed.len() as f64;
    allowed
        .iter()
        .enumerate()
        .filter(|(_, product_id)| pool.candidates.contains_key(product_id))
        .map(|(index, product_id)| (product_id.clone(), (total - index as f64) / total))
        .collect()
}

/// Age of an interaction in whole days relative to the request timestamp.
pub(crate) fn age_in_days(now: DateTime<Utc>, occurred_at: DateTime<Utc>) -> i64 {
    (now - occurred_at).num_days().max(0)
}

/// `decay_factor^age_days`. A factor of 1 never decays; a factor of 0
/// keeps only same-day interactions (`0^0 == 1`).
pub(crate) fn decay(decay_factor: f64, age_days: i64) -> f64 {
    decay_factor.powi(age_days as i32)
}
