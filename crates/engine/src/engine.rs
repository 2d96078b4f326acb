//! The engine facade: resolve a block, evaluate it through the cache, and
//! attribute analytics to what was actually shown.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::{debug, warn};
use uuid::Uuid;

use vitrine_core::cache_key::CacheKey;
use vitrine_core::composer::{compose, AvailabilityMap, ScoredProduct};
use vitrine_core::config::EngineConfig;
use vitrine_core::context::Context;
use vitrine_core::domain::analytics::AnalyticsAction;
use vitrine_core::domain::block::{BlockId, RecommendationBlock};
use vitrine_core::domain::config::{ConfigId, RecommendationConfig};
use vitrine_core::domain::interaction::CandidatePool;
use vitrine_core::domain::product::ProductId;
use vitrine_core::errors::{DomainError, EngineError};

use crate::analytics::AnalyticsRecorder;
use crate::cache::{CacheManager, CacheStats};
use crate::gateway::{BlockStore, CatalogGateway, InteractionStore};

/// Engine response: the ranked items plus the cache key they were served
/// under, for later click/purchase attribution.
#[derive(Clone, Debug)]
pub struct Recommendations {
    pub request_id: String,
    pub block_id: BlockId,
    pub items: Arc<Vec<ScoredProduct>>,
    pub cache_key: CacheKey,
    pub served_from_cache: bool,
}

pub struct RecommendationEngine {
    blocks: Arc<dyn BlockStore>,
    catalog: Arc<dyn CatalogGateway>,
    interactions: Arc<dyn InteractionStore>,
    cache: CacheManager,
    recorder: AnalyticsRecorder,
    history_lookback_days: i64,
    default_cache_secs: u64,
}

impl RecommendationEngine {
    pub fn new(
        blocks: Arc<dyn BlockStore>,
        catalog: Arc<dyn CatalogGateway>,
        interactions: Arc<dyn InteractionStore>,
        cache: CacheManager,
        recorder: AnalyticsRecorder,
        engine_config: &EngineConfig,
    ) -> Self {
        Self {
            blocks,
            catalog,
            interactions,
            cache,
            recorder,
            history_lookback_days: engine_config.history_lookback_days,
            default_cache_secs: engine_config.default_cache_secs,
        }
    }

    /// Evaluate a block for one request.
    ///
    /// Only caller-input problems (unknown block, malformed context) are
    /// errors; collaborator outages degrade to a smaller or empty result.
    /// Impressions are recorded here, per render, because a cached result
    /// can be served many times.
    pub async fn recommend(
        &self,
        block_name: &str,
        context: &Context,
    ) -> Result<Recommendations, EngineError> {
        context.validate()?;
        let request_id = Uuid::new_v4().to_string();

        let block = self
            .blocks
            .find_block(block_name)
            .await
            .map_err(|error| EngineError::Persistence(error.to_string()))?
            .filter(|block| block.is_active)
            .ok_or_else(|| DomainError::BlockNotFound(block_name.to_owned()))?;

        let configs = self
            .blocks
            .configs_for_block(&block)
            .await
            .map_err(|error| EngineError::Persistence(error.to_string()))?;
        let configs: Vec<RecommendationConfig> = configs
            .into_iter()
            .filter(|config| {
                if !config.is_active {
                    return false;
                }
                if let Err(error) = config.validate() {
                    warn!(config = %config.id, %error, "skipping invalid config");
                    return false;
                }
                true
            })
            .collect();

        let cache_key = CacheKey::compute(&block, &configs, context);
        if configs.is_empty() {
            // Nothing to fall back to: an empty list, not an error.
            debug!(block = %block.id, "no active configs resolve for block");
            return Ok(Recommendations {
                request_id,
                block_id: block.id,
                items: Arc::new(Vec::new()),
                cache_key,
                served_from_cache: false,
            });
        }

        let ttl_secs = if block.cache_duration_secs > 0 {
            block.cache_duration_secs
        } else {
            self.default_cache_secs
        };

        let catalog = self.catalog.clone();
        let interactions = self.interactions.clone();
        let compute_block = block.clone();
        let compute_configs = configs.clone();
        let compute_context = context.clone();
        let lookback = self.history_lookback_days;

        let lookup = self
            .cache
            .get_or_compute(&cache_key, Duration::from_secs(ttl_secs), move || {
                evaluate(
                    compute_block,
                    compute_configs,
                    compute_context,
                    catalog,
                    interactions,
                    lookback,
                )
            })
            .await?;

        for item in lookup.items.iter() {
            self.recorder.record(
                block.id.clone(),
                item.source_config.clone(),
                Some(item.product_id.clone()),
                context.subject.id(),
                AnalyticsAction::View,
            );
        }

        Ok(Recommendations {
            request_id,
            block_id: block.id,
            items: lookup.items,
            cache_key,
            served_from_cache: lookup.from_cache,
        })
    }

    /// Attribute a click on a previously rendered recommendation.
    pub fn record_click(
        &self,
        block_id: BlockId,
        config_id: ConfigId,
        product_id: ProductId,
        subject: &str,
    ) {
        self.recorder.record(block_id, config_id, Some(product_id), subject, AnalyticsAction::Click);
    }

    /// Attribute a purchase that converted from a recommendation.
    pub fn record_purchase(
        &self,
        block_id: BlockId,
        config_id: ConfigId,
        product_id: ProductId,
        subject: &str,
    ) {
        self.recorder.record(
            block_id,
            config_id,
            Some(product_id),
            subject,
            AnalyticsAction::Purchase,
        );
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Route every request straight to compute, e.g. while the cache is
    /// suspected of serving stale results.
    pub fn set_cache_bypass(&self, bypass: bool) {
        self.cache.set_bypass(bypass);
    }

    pub async fn purge_cached(&self, key: &CacheKey) {
        self.cache.purge(key).await;
    }
}

/// Fetch everything the strategies may read, then compose. Collaborator
/// failures degrade: an unreachable catalog yields no candidates (fail
/// closed), an unreachable history store yields no interaction signal.
async fn evaluate(
    block: RecommendationBlock,
    configs: Vec<RecommendationConfig>,
    context: Context,
    catalog: Arc<dyn CatalogGateway>,
    interactions: Arc<dyn InteractionStore>,
    lookback_days: i64,
) -> Result<Vec<ScoredProduct>, EngineError> {
    let candidates = match catalog.active_products().await {
        Ok(products) => products.into_iter().collect::<BTreeMap<_, _>>(),
        Err(error) => {
            warn!(block = %block.id, %error, "catalog unavailable, returning no candidates");
            return Ok(Vec::new());
        }
    };

    let since = context.requested_at - ChronoDuration::days(lookback_days);
    let history = match interactions.interactions_since(since).await {
        Ok(events) => events,
        Err(error) => {
            warn!(block = %block.id, %error, "interaction history unavailable");
            Vec::new()
        }
    };

    let anchor_attributes = match &context.anchor_product {
        Some(anchor) => match catalog.attributes(anchor).await {
            Ok(attributes) => {
                if attributes.is_none() {
                    // A since-deleted anchor: anchor-driven strategies
                    // see an empty pool, the rest proceed normally.
                    debug!(anchor = %anchor, "anchor product not found in catalog");
                }
                attributes
            }
            Err(error) => {
                warn!(anchor = %anchor, %error, "anchor attributes unavailable");
                None
            }
        },
        None => None,
    };

    let product_ids: Vec<ProductId> = candidates.keys().cloned().collect();
    let availability: AvailabilityMap = match catalog.availability(&product_ids).await {
        Ok(map) => map,
        Err(error) => {
            warn!(block = %block.id, %error, "availability unknown, failing closed");
            AvailabilityMap::new()
        }
    };

    let pool = CandidatePool { anchor_attributes, candidates, interactions: history };
    Ok(compose(&block, &context, &configs, &pool, &availability))
}
