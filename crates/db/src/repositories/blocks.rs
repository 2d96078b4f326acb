use sqlx::Row;

use vitrine_core::domain::block::{BlockId, ConfigRef, RecommendationBlock};
use vitrine_core::domain::config::{
    AlgorithmKind, ConfigFilters, ConfigId, FeatureWeights, RecommendationConfig,
};
use vitrine_core::domain::product::ProductId;
use vitrine_engine::{BlockStore, GatewayError};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlBlockStore {
    pool: DbPool,
}

impl SqlBlockStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upsert one config. The partial unique index on
    /// `(kind) WHERE is_default` enforces a single default per algorithm;
    /// a second default surfaces as a database error.
    pub async fn save_config(&self, config: &RecommendationConfig) -> Result<(), RepositoryError> {
        let allowed_products = serde_json::to_string(
            &config.filters.allowed_products.iter().map(|p| p.0.as_str()).collect::<Vec<_>>(),
        )
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let allowed_categories = serde_json::to_string(&config.filters.allowed_categories)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO recommendation_configs
                (id, name, kind, min_score, max_results, decay_factor,
                 price_weight, rating_weight, popularity_weight, recency_weight,
                 category_weight, custom_weight,
                 exclude_out_of_stock, exclude_inactive, allowed_products, allowed_categories,
                 is_active, is_default, cache_ttl_secs, sort_order, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                min_score = excluded.min_score,
                max_results = excluded.max_results,
                decay_factor = excluded.decay_factor,
                price_weight = excluded.price_weight,
                rating_weight = excluded.rating_weight,
                popularity_weight = excluded.popularity_weight,
                recency_weight = excluded.recency_weight,
                category_weight = excluded.category_weight,
                custom_weight = excluded.custom_weight,
                exclude_out_of_stock = excluded.exclude_out_of_stock,
                exclude_inactive = excluded.exclude_inactive,
                allowed_products = excluded.allowed_products,
                allowed_categories = excluded.allowed_categories,
                is_active = excluded.is_active,
                is_default = excluded.is_default,
                cache_ttl_secs = excluded.cache_ttl_secs,
                sort_order = excluded.sort_order,
                updated_at = excluded.updated_at",
        )
        .bind(&config.id.0)
        .bind(&config.name)
        .bind(config.kind.as_str())
        .bind(config.min_score)
        .bind(config.max_results as i64)
        .bind(config.decay_factor)
        .bind(config.weights.price)
        .bind(config.weights.rating)
        .bind(config.weights.popularity)
        .bind(config.weights.recency)
        .bind(config.weights.category)
        .bind(config.weights.custom)
        .bind(config.filters.exclude_out_of_stock)
        .bind(config.filters.exclude_inactive)
        .bind(allowed_products)
        .bind(allowed_categories)
        .bind(config.is_active)
        .bind(config.is_default)
        .bind(config.cache_ttl_secs as i64)
        .bind(config.sort_order)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one block and rewrite its pivot rows in a transaction.
    pub async fn save_block(&self, block: &RecommendationBlock) -> Result<(), RepositoryError> {
        let display_settings = serde_json::to_string(&block.display_settings)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO recommendation_blocks
                (id, name, title, description, max_products, cache_duration_secs,
                 display_settings, is_active, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                title = excluded.title,
                description = excluded.description,
                max_products = excluded.max_products,
                cache_duration_secs = excluded.cache_duration_secs,
                display_settings = excluded.display_settings,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
        )
        .bind(&block.id.0)
        .bind(&block.name)
        .bind(&block.title)
        .bind(&block.description)
        .bind(block.max_products as i64)
        .bind(block.cache_duration_secs as i64)
        .bind(display_settings)
        .bind(block.is_active)
        .bind(block.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM block_configs WHERE block_id = ?1")
            .bind(&block.id.0)
            .execute(&mut *tx)
            .await?;
        for config_ref in &block.config_refs {
            sqlx::query(
                "INSERT INTO block_configs (block_id, config_id, position) VALUES (?1, ?2, ?3)",
            )
            .bind(&block.id.0)
            .bind(&config_ref.config_id.0)
            .bind(config_ref.position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn decode_config(row: &sqlx::sqlite::SqliteRow) -> Result<RecommendationConfig, RepositoryError> {
    let kind: AlgorithmKind = row
        .get::<String, _>("kind")
        .parse()
        .map_err(|e: vitrine_core::DomainError| RepositoryError::Decode(e.to_string()))?;
    let allowed_products: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("allowed_products"))
            .map_err(|e| RepositoryError::Decode(format!("allowed_products: {e}")))?;
    let allowed_categories: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("allowed_categories"))
            .map_err(|e| RepositoryError::Decode(format!("allowed_categories: {e}")))?;

    Ok(RecommendationConfig {
        id: ConfigId(row.get("id")),
        name: row.get("name"),
        kind,
        min_score: row.get("min_score"),
        max_results: row.get::<i64, _>("max_results").max(0) as usize,
        decay_factor: row.get("decay_factor"),
        weights: FeatureWeights {
            price: row.get("price_weight"),
            rating: row.get("rating_weight"),
            popularity: row.get("popularity_weight"),
            recency: row.get("recency_weight"),
            category: row.get("category_weight"),
            custom: row.get("custom_weight"),
        },
        filters: ConfigFilters {
            exclude_out_of_stock: row.get("exclude_out_of_stock"),
            exclude_inactive: row.get("exclude_inactive"),
            allowed_products: allowed_products.into_iter().map(ProductId).collect(),
            allowed_categories,
        },
        is_active: row.get("is_active"),
        is_default: row.get("is_default"),
        cache_ttl_secs: row.get::<i64, _>("cache_ttl_secs").max(0) as u64,
        sort_order: row.get("sort_order"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait::async_trait]
impl BlockStore for SqlBlockStore {
    async fn find_block(&self, name: &str) -> Result<Option<RecommendationBlock>, GatewayError> {
        let Some(row) = sqlx::query(
            "SELECT id, name, title, description, max_products, cache_duration_secs,
                    display_settings, is_active, updated_at
             FROM recommendation_blocks WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?
        else {
            return Ok(None);
        };

        let block_id: String = row.get("id");
        let refs = sqlx::query(
            "SELECT config_id, position FROM block_configs
             WHERE block_id = ?1 ORDER BY position",
        )
        .bind(&block_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?
        .into_iter()
        .map(|row| ConfigRef {
            config_id: ConfigId(row.get("config_id")),
            position: row.get::<i64, _>("position").max(0) as u32,
        })
        .collect();

        let display_settings = serde_json::from_str(&row.get::<String, _>("display_settings"))
            .map_err(|e| GatewayError::Decode(format!("display_settings: {e}")))?;
        Ok(Some(RecommendationBlock {
            id: BlockId(block_id),
            name: row.get("name"),
            title: row.get("title"),
            description: row.get("description"),
            config_refs: refs,
            max_products: row.get::<i64, _>("max_products").max(0) as usize,
            cache_duration_secs: row.get::<i64, _>("cache_duration_secs").max(0) as u64,
            display_settings,
            is_active: row.get("is_active"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn configs_for_block(
        &self,
        block: &RecommendationBlock,
    ) -> Result<Vec<RecommendationConfig>, GatewayError> {
        let rows = sqlx::query(
            "SELECT c.*
             FROM block_configs bc
             JOIN recommendation_configs c ON c.id = bc.config_id
             WHERE bc.block_id = ?1
             ORDER BY bc.position",
        )
        .bind(&block.id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut configs = Vec::with_capacity(rows.len());
        for row in rows {
            configs.push(decode_config(&row).map_err(GatewayError::from)?);
        }
        Ok(configs)
    }
}
