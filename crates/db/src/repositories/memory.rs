//! In-memory gateway implementations for tests and local experiments.
//! Same contracts as the SQL repositories, no persistence.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use vitrine_core::domain::analytics::{AnalyticsEvent, DailyAnalytics};
use vitrine_core::domain::block::{BlockId, RecommendationBlock};
use vitrine_core::domain::config::RecommendationConfig;
use vitrine_core::domain::interaction::InteractionEvent;
use vitrine_core::domain::product::{Availability, ProductAttributes, ProductId, ProductRecord};
use vitrine_engine::{
    AnalyticsSink, BlockStore, CatalogGateway, GatewayError, InteractionStore,
};

#[derive(Default)]
pub struct InMemoryCatalogGateway {
    products: RwLock<HashMap<String, ProductRecord>>,
}

impl InMemoryCatalogGateway {
    pub async fn insert(&self, record: ProductRecord) {
        let mut products = self.products.write().await;
        products.insert(record.id.0.clone(), record);
    }
}

#[async_trait::async_trait]
impl CatalogGateway for InMemoryCatalogGateway {
    async fn exists(&self, product_id: &ProductId) -> Result<bool, GatewayError> {
        let products = self.products.read().await;
        Ok(products.contains_key(&product_id.0))
    }

    async fn attributes(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductAttributes>, GatewayError> {
        let products = self.products.read().await;
        Ok(products.get(&product_id.0).map(|record| record.attributes.clone()))
    }

    async fn availability(
        &self,
        product_ids: &[ProductId],
    ) -> Result<BTreeMap<ProductId, Availability>, GatewayError> {
        let products = self.products.read().await;
        Ok(product_ids
            .iter()
            .filter_map(|id| {
                products.get(&id.0).map(|record| (id.clone(), record.availability))
            })
            .collect())
    }

    async fn active_products(
        &self,
    ) -> Result<Vec<(ProductId, ProductAttributes)>, GatewayError> {
        let products = self.products.read().await;
        let mut active: Vec<(ProductId, ProductAttributes)> = products
            .values()
            .filter(|record| record.availability.active)
            .map(|record| (record.id.clone(), record.attributes.clone()))
            .collect();
        active.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(active)
    }
}

#[derive(Default)]
pub struct InMemoryInteractionStore {
    events: RwLock<Vec<InteractionEvent>>,
}

impl InMemoryInteractionStore {
    pub async fn push(&self, event: InteractionEvent) {
        let mut events = self.events.write().await;
        events.push(event);
    }
}

#[async_trait::async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn interactions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionEvent>, GatewayError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| event.occurred_at >= since).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<String, RecommendationBlock>>,
    configs: RwLock<HashMap<String, RecommendationConfig>>,
}

impl InMemoryBlockStore {
    pub async fn insert_block(&self, block: RecommendationBlock) {
        let mut blocks = self.blocks.write().await;
        blocks.insert(block.name.clone(), block);
    }

    pub async fn insert_config(&self, config: RecommendationConfig) {
        let mut configs = self.configs.write().await;
        configs.insert(config.id.0.clone(), config);
    }
}

#[async_trait::async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn find_block(&self, name: &str) -> Result<Option<RecommendationBlock>, GatewayError> {
        let blocks = self.blocks.read().await;
        Ok(blocks.get(name).cloned())
    }

    async fn configs_for_block(
        &self,
        block: &RecommendationBlock,
    ) -> Result<Vec<RecommendationConfig>, GatewayError> {
        let configs = self.configs.read().await;
        Ok(block
            .ordered_config_ids()
            .into_iter()
            .filter_map(|id| configs.get(&id.0).cloned())
            .collect())
    }
}

type AnalyticsKey = (String, String, String, NaiveDate);

#[derive(Default)]
pub struct InMemoryAnalyticsSink {
    rows: RwLock<BTreeMap<AnalyticsKey, DailyAnalytics>>,
}

#[async_trait::async_trait]
impl AnalyticsSink for InMemoryAnalyticsSink {
    async fn record(&self, event: &AnalyticsEvent) -> Result<(), GatewayError> {
        let key = (
            event.block_id.0.clone(),
            event.config_id.0.clone(),
            event.product_id.as_ref().map(|p| p.0.clone()).unwrap_or_default(),
            event.day(),
        );
        let mut rows = self.rows.write().await;
        let row = rows.entry(key).or_insert_with(|| {
            DailyAnalytics::new(
                event.block_id.clone(),
                event.config_id.clone(),
                event.product_id.clone(),
                event.day(),
            )
        });
        row.apply(event.action);
        Ok(())
    }

    async fn daily_report(
        &self,
        block_id: &BlockId,
        date: NaiveDate,
    ) -> Result<Vec<DailyAnalytics>, GatewayError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| &row.block_id == block_id && row.date == date)
            .cloned()
            .collect())
    }
}
