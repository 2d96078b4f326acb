//! Blends strategy outputs for a block into one ranked, deduplicated,
//! size-bounded list.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::domain::block::RecommendationBlock;
use crate::domain::config::{AlgorithmKind, ConfigId, RecommendationConfig};
use crate::domain::interaction::CandidatePool;
use crate::domain::product::{Availability, ProductId};
use crate::strategy;

pub type AvailabilityMap = BTreeMap<ProductId, Availability>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub product_id: ProductId,
    pub score: f64,
    /// First config (in block order) that contributed to this product's
    /// score; analytics impressions are attributed to it.
    pub source_config: ConfigId,
}

struct Accumulated {
    score: f64,
    first_config_index: usize,
    source_config: ConfigId,
    min_score_floor: f64,
}

/// Compose the block's configs into a final ranking.
///
/// Per active config: evaluate its strategy, max-normalize to [0,1],
/// truncate to the config's `max_results`, scale by its composite weight,
/// then sum per product across configs, so a product recommended by
/// several configs ranks higher. Products below the minimum `min_score` among
/// their contributing configs are dropped, stock/active filters are
/// applied fail-closed, and the result is sorted score-descending with
/// ties broken by config order then product id.
pub fn compose(
    block: &RecommendationBlock,
    context: &Context,
    configs: &[RecommendationConfig],
    pool: &CandidatePool,
    availability: &AvailabilityMap,
) -> Vec<ScoredProduct> {
    let active: Vec<&RecommendationConfig> = configs.iter().filter(|c| c.is_active).collect();
    if active.is_empty() {
        return Vec::new();
    }

    let mut accumulated: HashMap<ProductId, Accumulated> = HashMap::new();
    for (config_index, config) in active.iter().enumerate() {
        let raw = match config.kind {
            AlgorithmKind::Hybrid => hybrid_blend(context, config, pool),
            _ => strategy::score(context, config, pool),
        };
        let Some(max_score) = raw.first().map(|(_, score)| *score).filter(|s| *s > 0.0) else {
            continue;
        };

        let weight = config.composite_weight();
        for (product_id, raw_score) in raw.into_iter().take(config.max_results) {
            let contribution = raw_score / max_score * weight;
            match accumulated.entry(product_id) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let acc = entry.get_mut();
                    acc.score += contribution;
                    acc.min_score_floor = acc.min_score_floor.min(config.min_score);
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(Accumulated {
                        score: contribution,
                        first_config_index: config_index,
                        source_config: config.id.clone(),
                        min_score_floor: config.min_score,
                    });
                }
            }
        }
    }

    let exclude_out_of_stock = active.iter().any(|c| c.filters.exclude_out_of_stock);
    let exclude_inactive = active.iter().any(|c| c.filters.exclude_inactive);

    let mut results: Vec<(Accumulated, ProductId)> = accumulated
        .into_iter()
        .filter(|(product_id, acc)| {
            if acc.score < acc.min_score_floor {
                return false;
            }
            if exclude_out_of_stock || exclude_inactive {
                // Unknown availability is treated as unavailable.
                let Some(availability) = availability.get(product_id) else {
                    return false;
                };
                if exclude_out_of_stock && !availability.in_stock() {
                    return false;
                }
                if exclude_inactive && !availability.active {
                    return false;
                }
            }
            true
        })
        .map(|(product_id, acc)| (acc, product_id))
        .collect();

    results.sort_by(|(a, a_id), (b, b_id)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.first_config_index.cmp(&b.first_config_index))
            .then_with(|| a_id.cmp(b_id))
    });

    let cap = block.max_products.min(active.iter().map(|c| c.max_results).sum());
    results
        .into_iter()
        .take(cap)
        .map(|(acc, product_id)| ScoredProduct {
            product_id,
            score: acc.score,
            source_config: acc.source_config,
        })
        .collect()
}

/// Hybrid configs are blended here rather than scored by a strategy: the
/// config's weights select and scale the single-algorithm components.
fn hybrid_blend(
    context: &Context,
    config: &RecommendationConfig,
    pool: &CandidatePool,
) -> Vec<(ProductId, f64)> {
    let mut components = vec![
        (AlgorithmKind::Popularity, config.weights.popularity),
        (AlgorithmKind::Trending, config.weights.recency),
        (AlgorithmKind::ContentBased, config.weights.category),
        (AlgorithmKind::Collaborative, config.weights.custom),
    ];
    if components.iter().all(|(_, weight)| *weight <= 0.0) {
        components = vec![
            (AlgorithmKind::Popularity, 1.0),
            (AlgorithmKind::ContentBased, 1.0),
            (AlgorithmKind::Collaborative, 1.0),
        ];
    }

    let mut totals: BTreeMap<ProductId, f64> = BTreeMap::new();
    for (kind, weight) in components {
        if weight <= 0.0 {
            continue;
        }
        let mut component_config = config.clone();
        component_config.kind = kind;
        let ranked = strategy::score(context, &component_config, pool);
        let Some(max_score) = ranked.first().map(|(_, score)| *score).filter(|s| *s > 0.0) else {
            continue;
        };
        for (product_id, raw_score) in ranked {
            *totals.entry(product_id).or_insert(0.0) += raw_score / max_score * weight;
        }
    }

    let mut blended: Vec<(ProductId, f64)> = totals.into_iter().collect();
    blended.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    blended
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::context::{PageType, Subject};
    use crate::domain::block::{BlockId, ConfigRef};
    use crate::domain::config::{ConfigFilters, FeatureWeights};
    use crate::domain::interaction::{InteractionEvent, InteractionKind};
    use crate::domain::product::ProductAttributes;

    fn attrs(category: &str, price: f64) -> ProductAttributes {
        ProductAttributes {
            category: category.to_owned(),
            brand: None,
            price,
            rating: None,
            tags: Vec::new(),
            product_line: None,
        }
    }

    fn view(subject: &str, product: &str, days_ago: i64) -> InteractionEvent {
        InteractionEvent {
            subject: subject.to_owned(),
            product_id: ProductId(product.to_owned()),
            kind: InteractionKind::View,
            occurred_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn config(id: &str, kind: AlgorithmKind) -> RecommendationConfig {
        RecommendationConfig {
            id: ConfigId(id.to_owned()),
            name: id.to_owned(),
            kind,
            min_score: 0.0,
            max_results: 10,
            decay_factor: 0.9,
            weights: FeatureWeights::default(),
            filters: ConfigFilters::default(),
            is_active: true,
            is_default: false,
            cache_ttl_secs: 300,
            sort_order: 0,
            updated_at: Utc::now(),
        }
    }

    fn block(max_products: usize) -> RecommendationBlock {
        RecommendationBlock {
            id: BlockId("homepage-related".into()),
            name: "homepage-related".into(),
            title: "You may also like".into(),
            description: None,
            config_refs: vec![ConfigRef { config_id: ConfigId("popular".into()), position: 1 }],
            max_products,
            cache_duration_secs: 600,
            display_settings: serde_json::Value::Null,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    fn in_stock() -> Availability {
        Availability { active: true, stock: 10 }
    }

    #[test]
    fn single_config_single_candidate_normalizes_to_one() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("q".into()), attrs("camera", 100.0));
        let pool = CandidatePool {
            anchor_attributes: None,
            candidates,
            interactions: vec![
                view("u1", "q", 1),
                view("u2", "q", 1),
                view("u3", "q", 1),
                view("u4", "q", 10),
            ],
        };
        let context = Context::new(Subject::User("viewer".into()), PageType::Product, "en")
            .with_anchor(ProductId("p".into()));
        let mut popular = config("popular", AlgorithmKind::Popularity);
        popular.min_score = 0.1;

        let availability = BTreeMap::from([(ProductId("q".into()), in_stock())]);
        let result = compose(&block(10), &context, &[popular], &pool, &availability);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].product_id.0, "q");
        assert!((result[0].score - 1.0).abs() < 1e-9);
        assert_eq!(result[0].source_config.0, "popular");
    }

    #[test]
    fn products_backed_by_multiple_configs_rank_higher() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("both".into()), attrs("camera", 100.0));
        candidates.insert(ProductId("popular_only".into()), attrs("bag", 20.0));
        let pool = CandidatePool {
            anchor_attributes: Some(attrs("camera", 100.0)),
            candidates,
            interactions: vec![
                view("u1", "both", 1),
                view("u2", "popular_only", 1),
                view("u3", "popular_only", 1),
            ],
        };
        let context = Context::new(Subject::User("viewer".into()), PageType::Product, "en")
            .with_anchor(ProductId("anchor".into()));

        let configs = vec![
            config("popular", AlgorithmKind::Popularity),
            config("related", AlgorithmKind::ContentBased),
        ];
        let availability = BTreeMap::from([
            (ProductId("both".into()), in_stock()),
            (ProductId("popular_only".into()), in_stock()),
        ]);

        let result = compose(&block(10), &context, &configs, &pool, &availability);
        // `both` gets the full content score plus half the popularity max;
        // `popular_only` only tops the popularity list.
        assert_eq!(result[0].product_id.0, "both");
        assert!(result[0].score > result[1].score);
    }

    #[test]
    fn ties_break_by_config_order_then_product_id() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("a".into()), attrs("camera", 10.0));
        candidates.insert(ProductId("b".into()), attrs("camera", 10.0));
        let pool = CandidatePool {
            anchor_attributes: None,
            candidates,
            interactions: vec![view("u1", "a", 2), view("u2", "b", 2)],
        };
        let context = Context::new(Subject::User("v".into()), PageType::Home, "en");
        let configs = vec![config("popular", AlgorithmKind::Popularity)];
        let availability = BTreeMap::from([
            (ProductId("a".into()), in_stock()),
            (ProductId("b".into()), in_stock()),
        ]);

        let first = compose(&block(10), &context, &configs, &pool, &availability);
        let second = compose(&block(10), &context, &configs, &pool, &availability);

        assert_eq!(first, second);
        assert_eq!(first[0].product_id.0, "a");
        assert_eq!(first[1].product_id.0, "b");
    }

    #[test]
    fn out_of_stock_products_never_appear_when_excluded() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("sold_out".into()), attrs("camera", 10.0));
        candidates.insert(ProductId("in_stock".into()), attrs("camera", 10.0));
        let pool = CandidatePool {
            anchor_attributes: None,
            candidates,
            interactions: vec![
                // The sold-out product has by far the highest raw score.
                view("u1", "sold_out", 0),
                view("u2", "sold_out", 0),
                view("u3", "sold_out", 0),
                view("u4", "in_stock", 5),
            ],
        };
        let context = Context::new(Subject::User("v".into()), PageType::Home, "en");
        let mut popular = config("popular", AlgorithmKind::Popularity);
        popular.filters.exclude_out_of_stock = true;

        let availability = BTreeMap::from([
            (ProductId("sold_out".into()), Availability { active: true, stock: 0 }),
            (ProductId("in_stock".into()), in_stock()),
        ]);

        let result = compose(&block(10), &context, &[popular], &pool, &availability);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].product_id.0, "in_stock");
    }

    #[test]
    fn unknown_availability_fails_closed() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("mystery".into()), attrs("camera", 10.0));
        let pool = CandidatePool {
            anchor_attributes: None,
            candidates,
            interactions: vec![view("u1", "mystery", 1)],
        };
        let context = Context::new(Subject::User("v".into()), PageType::Home, "en");
        let mut popular = config("popular", AlgorithmKind::Popularity);
        popular.filters.exclude_inactive = true;

        // Catalog gave us nothing for this product.
        let availability = BTreeMap::new();
        let result = compose(&block(10), &context, &[popular], &pool, &availability);
        assert!(result.is_empty());
    }

    #[test]
    fn result_is_capped_by_block_and_config_limits() {
        let mut candidates = BTreeMap::new();
        let mut interactions = Vec::new();
        for i in 0..20 {
            let id = format!("p{i:02}");
            candidates.insert(ProductId(id.clone()), attrs("camera", 10.0));
            for viewer in 0..(20 - i) {
                interactions.push(view(&format!("u{viewer}"), &id, 1));
            }
        }
        let pool = CandidatePool { anchor_attributes: None, candidates, interactions };
        let context = Context::new(Subject::User("v".into()), PageType::Home, "en");
        let availability: AvailabilityMap = pool
            .candidates
            .keys()
            .map(|id| (id.clone(), in_stock()))
            .collect();

        let mut popular = config("popular", AlgorithmKind::Popularity);
        popular.max_results = 4;
        let result = compose(&block(10), &context, &[popular.clone()], &pool, &availability);
        assert_eq!(result.len(), 4);

        popular.max_results = 15;
        let result = compose(&block(6), &context, &[popular], &pool, &availability);
        assert_eq!(result.len(), 6);
        assert_eq!(result[0].product_id.0, "p00");
    }

    #[test]
    fn below_threshold_scores_are_discarded() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("strong".into()), attrs("camera", 10.0));
        candidates.insert(ProductId("weak".into()), attrs("camera", 10.0));
        let pool = CandidatePool {
            anchor_attributes: None,
            candidates,
            interactions: vec![
                view("u1", "strong", 0),
                view("u2", "strong", 0),
                view("u3", "strong", 0),
                view("u4", "strong", 0),
                view("u5", "strong", 0),
                view("u6", "strong", 0),
                view("u7", "strong", 0),
                view("u8", "strong", 0),
                view("u9", "strong", 0),
                view("u10", "strong", 0),
                view("u11", "weak", 0),
            ],
        };
        let context = Context::new(Subject::User("v".into()), PageType::Home, "en");
        let mut popular = config("popular", AlgorithmKind::Popularity);
        popular.min_score = 0.5;

        let availability = BTreeMap::from([
            (ProductId("strong".into()), in_stock()),
            (ProductId("weak".into()), in_stock()),
        ]);

        let result = compose(&block(10), &context, &[popular], &pool, &availability);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].product_id.0, "strong");
    }

    #[test]
    fn all_empty_strategies_yield_empty_result() {
        let pool = CandidatePool::default();
        let context = Context::new(Subject::Session("anon".into()), PageType::Home, "en");
        let configs = vec![
            config("popular", AlgorithmKind::Popularity),
            config("related", AlgorithmKind::ContentBased),
        ];

        let result = compose(&block(10), &context, &configs, &pool, &BTreeMap::new());
        assert!(result.is_empty());
    }

    #[test]
    fn hybrid_config_blends_component_algorithms() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("similar".into()), attrs("camera", 100.0));
        candidates.insert(ProductId("popular".into()), attrs("bag", 15.0));
        let pool = CandidatePool {
            anchor_attributes: Some(attrs("camera", 100.0)),
            candidates,
            interactions: vec![view("u1", "popular", 1), view("u2", "popular", 1)],
        };
        let context = Context::new(Subject::User("v".into()), PageType::Product, "en")
            .with_anchor(ProductId("anchor".into()));

        let mut hybrid = config("mixed", AlgorithmKind::Hybrid);
        hybrid.weights.popularity = 1.0;
        hybrid.weights.category = 1.0;

        let availability = BTreeMap::from([
            (ProductId("similar".into()), in_stock()),
            (ProductId("popular".into()), in_stock()),
        ]);

        let result = compose(&block(10), &context, &[hybrid], &pool, &availability);
        let ids: Vec<&str> = result.iter().map(|s| s.product_id.0.as_str()).collect();
        assert!(ids.contains(&"similar"));
        assert!(ids.contains(&"popular"));
    }

    #[test]
    fn inactive_configs_are_skipped() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("q".into()), attrs("camera", 10.0));
        let pool = CandidatePool {
            anchor_attributes: None,
            candidates,
            interactions: vec![view("u1", "q", 1)],
        };
        let context = Context::new(Subject::User("v".into()), PageType::Home, "en");
        let mut popular = config("popular", AlgorithmKind::Popularity);
        popular.is_active = false;

        let availability = BTreeMap::from([(ProductId("q".into()), in_stock())]);
        let result = compose(&block(10), &context, &[popular], &pool, &availability);
        assert!(result.is_empty());
    }
}
