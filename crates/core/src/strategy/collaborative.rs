//! Item-item collaborative scoring from co-occurrence of products across
//! other subjects' interaction histories.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::Context;
use crate::domain::config::RecommendationConfig;
use crate::domain::interaction::CandidatePool;
use crate::domain::product::ProductId;

use super::{age_in_days, decay};

/// Score candidates by how strongly they co-occur with the seed items.
///
/// Seed items are the anchor product when present, otherwise the
/// requesting subject's own interaction history. Subjects who touched a
/// seed item vote for every other product they interacted with, damped by
/// the config's decay factor. An anonymous context with no history scores
/// nothing.
pub(super) fn score(
    context: &Context,
    config: &RecommendationConfig,
    pool: &CandidatePool,
) -> Vec<(ProductId, f64)> {
    let seed_items: BTreeSet<ProductId> = match &context.anchor_product {
        Some(anchor) => BTreeSet::from([anchor.clone()]),
        None => pool
            .interactions
            .iter()
            .filter(|event| event.subject == context.subject.id())
            .map(|event| event.product_id.clone())
            .collect(),
    };
    if seed_items.is_empty() {
        return Vec::new();
    }

    let co_subjects: BTreeSet<&str> = pool
        .interactions
        .iter()
        .filter(|event| seed_items.contains(&event.product_id))
        .map(|event| event.subject.as_str())
        .filter(|subject| *subject != context.subject.id())
        .collect();
    if co_subjects.is_empty() {
        return Vec::new();
    }

    let mut totals: BTreeMap<ProductId, f64> = BTreeMap::new();
    for event in &pool.interactions {
        if !co_subjects.contains(event.subject.as_str()) {
            continue;
        }
        if seed_items.contains(&event.product_id) {
            continue;
        }
        if !pool.candidates.contains_key(&event.product_id) {
            continue;
        }
        let age = age_in_days(context.requested_at, event.occurred_at);
        *totals.entry(event.product_id.clone()).or_insert(0.0) +=
            event.kind.weight() * decay(config.decay_factor, age);
    }

    totals.into_iter().collect()
}
