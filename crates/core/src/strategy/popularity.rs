//! Popularity and trending scoring.
//!
//! rawScore = Σ over interactions of `weight(kind) · decay_factor^age_days`.
//! Trending is the same sum restricted to a recent window with a capped
//! decay factor, so fresh interactions dominate.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::domain::config::RecommendationConfig;
use crate::domain::interaction::CandidatePool;
use crate::domain::product::ProductId;

use super::{age_in_days, decay, TRENDING_MAX_DECAY};

pub(super) fn score(
    context: &Context,
    config: &RecommendationConfig,
    pool: &CandidatePool,
    window_days: Option<i64>,
) -> Vec<(ProductId, f64)> {
    let decay_factor = match window_days {
        Some(_) => config.decay_factor.min(TRENDING_MAX_DECAY),
        None => config.decay_factor,
    };

    let mut totals: BTreeMap<ProductId, f64> = BTreeMap::new();
    for event in &pool.interactions {
        if !pool.candidates.contains_key(&event.product_id) {
            continue;
        }
        let age = age_in_days(context.requested_at, event.occurred_at);
        if let Some(window) = window_days {
            if age > window {
                continue;
            }
        }
        *totals.entry(event.product_id.clone()).or_insert(0.0) +=
            event.kind.weight() * decay(decay_factor, age);
    }

    totals.into_iter().collect()
}
