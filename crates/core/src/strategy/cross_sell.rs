//! Cross-sell ("bought together") and up-sell (price-tier ladder) scoring.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::Context;
use crate::domain::config::RecommendationConfig;
use crate::domain::interaction::{CandidatePool, InteractionKind};
use crate::domain::product::ProductId;

use super::{age_in_days, decay};

/// Purchase co-occurrence with the anchor (or, anchor-less, with the
/// subject's own purchases). Only purchase events count here.
pub(super) fn cross_sell(
    context: &Context,
    config: &RecommendationConfig,
    pool: &CandidatePool,
) -> Vec<(ProductId, f64)> {
    let seed_items: BTreeSet<ProductId> = match &context.anchor_product {
        // A requested anchor the catalog no longer knows seeds nothing.
        Some(_) if pool.anchor_attributes.is_none() => return Vec::new(),
        Some(anchor) => BTreeSet::from([anchor.clone()]),
        None => pool
            .interactions
            .iter()
            .filter(|event| {
                event.subject == context.subject.id() && event.kind == InteractionKind::Purchase
            })
            .map(|event| event.product_id.clone())
            .collect(),
    };
    if seed_items.is_empty() {
        return Vec::new();
    }

    let buyers: BTreeSet<&str> = pool
        .interactions
        .iter()
        .filter(|event| {
            event.kind == InteractionKind::Purchase && seed_items.contains(&event.product_id)
        })
        .map(|event| event.subject.as_str())
        .filter(|subject| *subject != context.subject.id())
        .collect();

    let mut totals: BTreeMap<ProductId, f64> = BTreeMap::new();
    for event in &pool.interactions {
        if event.kind != InteractionKind::Purchase {
            continue;
        }
        if !buyers.contains(event.subject.as_str()) || seed_items.contains(&event.product_id) {
            continue;
        }
        if !pool.candidates.contains_key(&event.product_id) {
            continue;
        }
        let age = age_in_days(context.requested_at, event.occurred_at);
        *totals.entry(event.product_id.clone()).or_insert(0.0) += decay(config.decay_factor, age);
    }

    totals.into_iter().collect()
}

/// Price-tier-ascending variants of the anchor's product line. The nearest
/// higher-priced variant ranks first; score is anchor price over candidate
/// price, so it stays in (0, 1).
pub(super) fn up_sell(pool: &CandidatePool) -> Vec<(ProductId, f64)> {
    let Some(anchor) = &pool.anchor_attributes else {
        return Vec::new();
    };
    let Some(line) = &anchor.product_line else {
        return Vec::new();
    };

    pool.candidates
        .iter()
        .filter(|(_, attributes)| {
            attributes.product_line.as_ref() == Some(line) && attributes.price > anchor.price
        })
        .map(|(product_id, attributes)| (product_id.clone(), anchor.price / attributes.price))
        .collect()
}
