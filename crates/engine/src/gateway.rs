//! Seams to the engine's external collaborators. The engine only ever
//! reads through the catalog and interaction gateways; the analytics sink
//! is its single write destination.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use vitrine_core::domain::analytics::{AnalyticsEvent, DailyAnalytics};
use vitrine_core::domain::block::{BlockId, RecommendationBlock};
use vitrine_core::domain::config::RecommendationConfig;
use vitrine_core::domain::interaction::InteractionEvent;
use vitrine_core::domain::product::{Availability, ProductAttributes, ProductId};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn exists(&self, product_id: &ProductId) -> Result<bool, GatewayError>;

    /// Attribute vector for one product, or `None` for a since-deleted id.
    async fn attributes(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductAttributes>, GatewayError>;

    /// Stock and active flags for the given products. Missing entries mean
    /// the catalog does not know the product; callers must fail closed.
    async fn availability(
        &self,
        product_ids: &[ProductId],
    ) -> Result<BTreeMap<ProductId, Availability>, GatewayError>;

    /// The candidate universe: every active product with its attributes.
    async fn active_products(
        &self,
    ) -> Result<Vec<(ProductId, ProductAttributes)>, GatewayError>;
}

#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn interactions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionEvent>, GatewayError>;
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn find_block(&self, name: &str) -> Result<Option<RecommendationBlock>, GatewayError>;

    /// Resolve the block's config references in placement order. Dangling
    /// references are skipped, not errors; the remaining configs carry the
    /// block.
    async fn configs_for_block(
        &self,
        block: &RecommendationBlock,
    ) -> Result<Vec<RecommendationConfig>, GatewayError>;
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Upsert the daily aggregation row for the event's
    /// (block, config, date[, product]) tuple.
    async fn record(&self, event: &AnalyticsEvent) -> Result<(), GatewayError>;

    /// Daily rows for a block on one date, for reporting.
    async fn daily_report(
        &self,
        block_id: &BlockId,
        date: NaiveDate,
    ) -> Result<Vec<DailyAnalytics>, GatewayError>;
}
