//! Deterministic demo dataset: a small camera-shop catalog, a month of
//! interaction history at fixed day offsets, and two seeded placements.

use chrono::{Duration, Utc};
use serde::Serialize;

use vitrine_core::domain::block::{BlockId, ConfigRef, RecommendationBlock};
use vitrine_core::domain::config::{
    AlgorithmKind, ConfigFilters, ConfigId, FeatureWeights, RecommendationConfig,
};
use vitrine_core::domain::interaction::{InteractionEvent, InteractionKind};
use vitrine_core::domain::product::{Availability, ProductAttributes, ProductId, ProductRecord};

use crate::repositories::{RepositoryError, SqlBlockStore, SqlCatalogGateway, SqlInteractionStore};
use crate::DbPool;

struct SeedProduct {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    brand: &'static str,
    price: f64,
    rating: f64,
    tags: &'static [&'static str],
    product_line: Option<&'static str>,
    stock: i64,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "cam-entry",
        name: "Lumen X100",
        category: "camera",
        brand: "lumen",
        price: 449.0,
        rating: 4.2,
        tags: &["mirrorless", "entry"],
        product_line: Some("camera-x"),
        stock: 12,
    },
    SeedProduct {
        id: "cam-mid",
        name: "Lumen X300",
        category: "camera",
        brand: "lumen",
        price: 899.0,
        rating: 4.5,
        tags: &["mirrorless"],
        product_line: Some("camera-x"),
        stock: 7,
    },
    SeedProduct {
        id: "cam-pro",
        name: "Lumen X900",
        category: "camera",
        brand: "lumen",
        price: 2199.0,
        rating: 4.8,
        tags: &["mirrorless", "pro"],
        product_line: Some("camera-x"),
        stock: 3,
    },
    SeedProduct {
        id: "lens-35",
        name: "Lumen 35mm f/1.8",
        category: "lens",
        brand: "lumen",
        price: 329.0,
        rating: 4.6,
        tags: &["prime"],
        product_line: None,
        stock: 20,
    },
    SeedProduct {
        id: "lens-70200",
        name: "Lumen 70-200mm f/2.8",
        category: "lens",
        brand: "lumen",
        price: 1499.0,
        rating: 4.7,
        tags: &["zoom", "pro"],
        product_line: None,
        stock: 4,
    },
    SeedProduct {
        id: "tripod-carbon",
        name: "Stativ Carbon One",
        category: "tripod",
        brand: "stativ",
        price: 189.0,
        rating: 4.1,
        tags: &["carbon", "travel"],
        product_line: None,
        stock: 15,
    },
    SeedProduct {
        id: "bag-sling",
        name: "Porter Sling 8L",
        category: "bag",
        brand: "porter",
        price: 79.0,
        rating: 3.9,
        tags: &["sling"],
        product_line: None,
        stock: 0,
    },
    SeedProduct {
        id: "sd-128",
        name: "Vault SD 128GB",
        category: "storage",
        brand: "vault",
        price: 34.0,
        rating: 4.4,
        tags: &["sd", "uhs-ii"],
        product_line: None,
        stock: 60,
    },
];

// (subject, product, kind, days ago)
const SEED_INTERACTIONS: &[(&str, &str, InteractionKind, i64)] = &[
    ("u-alba", "cam-entry", InteractionKind::View, 1),
    ("u-alba", "cam-entry", InteractionKind::Click, 1),
    ("u-alba", "cam-entry", InteractionKind::Purchase, 1),
    ("u-alba", "lens-35", InteractionKind::Purchase, 1),
    ("u-bryn", "cam-entry", InteractionKind::Purchase, 3),
    ("u-bryn", "sd-128", InteractionKind::Purchase, 3),
    ("u-bryn", "tripod-carbon", InteractionKind::Cart, 2),
    ("u-cora", "cam-mid", InteractionKind::View, 5),
    ("u-cora", "cam-mid", InteractionKind::Click, 5),
    ("u-cora", "lens-70200", InteractionKind::View, 4),
    ("u-dane", "cam-entry", InteractionKind::View, 8),
    ("u-dane", "lens-35", InteractionKind::Purchase, 8),
    ("u-dane", "sd-128", InteractionKind::Purchase, 7),
    ("u-espe", "cam-pro", InteractionKind::View, 12),
    ("u-espe", "cam-pro", InteractionKind::Click, 12),
    ("u-espe", "lens-70200", InteractionKind::Purchase, 11),
    ("u-fenn", "tripod-carbon", InteractionKind::View, 20),
    ("u-fenn", "cam-entry", InteractionKind::View, 25),
    ("u-gale", "sd-128", InteractionKind::View, 28),
];

/// Counts of everything `seed_demo_dataset` wrote, for CLI output.
#[derive(Debug, Serialize)]
pub struct SeedSummary {
    pub products: usize,
    pub interactions: usize,
    pub configs: usize,
    pub blocks: usize,
}

pub async fn seed_demo_dataset(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let catalog = SqlCatalogGateway::new(pool.clone());
    let history = SqlInteractionStore::new(pool.clone());
    let blocks = SqlBlockStore::new(pool.clone());
    let now = Utc::now();

    for seed in SEED_PRODUCTS {
        catalog
            .upsert(&ProductRecord {
                id: ProductId(seed.id.to_owned()),
                name: seed.name.to_owned(),
                attributes: ProductAttributes {
                    category: seed.category.to_owned(),
                    brand: Some(seed.brand.to_owned()),
                    price: seed.price,
                    rating: Some(seed.rating),
                    tags: seed.tags.iter().map(|t| (*t).to_owned()).collect(),
                    product_line: seed.product_line.map(str::to_owned),
                },
                availability: Availability { active: true, stock: seed.stock },
            })
            .await?;
    }

    for (subject, product, kind, days_ago) in SEED_INTERACTIONS {
        history
            .append(&InteractionEvent {
                subject: (*subject).to_owned(),
                product_id: ProductId((*product).to_owned()),
                kind: *kind,
                occurred_at: now - Duration::days(*days_ago),
            })
            .await?;
    }

    let configs = seed_configs(now);
    for config in &configs {
        blocks.save_config(config).await?;
    }
    let placements = seed_blocks(now);
    for block in &placements {
        blocks.save_block(block).await?;
    }

    Ok(SeedSummary {
        products: SEED_PRODUCTS.len(),
        interactions: SEED_INTERACTIONS.len(),
        configs: configs.len(),
        blocks: placements.len(),
    })
}

fn seed_configs(now: chrono::DateTime<Utc>) -> Vec<RecommendationConfig> {
    let base = RecommendationConfig {
        id: ConfigId(String::new()),
        name: String::new(),
        kind: AlgorithmKind::Popularity,
        min_score: 0.02,
        max_results: 10,
        decay_factor: 0.9,
        weights: FeatureWeights::default(),
        filters: ConfigFilters { exclude_inactive: true, ..ConfigFilters::default() },
        is_active: true,
        is_default: false,
        cache_ttl_secs: 300,
        sort_order: 0,
        updated_at: now,
    };

    vec![
        RecommendationConfig {
            id: ConfigId("popular".to_owned()),
            name: "Popular right now".to_owned(),
            is_default: true,
            ..base.clone()
        },
        RecommendationConfig {
            id: ConfigId("related".to_owned()),
            name: "Similar products".to_owned(),
            kind: AlgorithmKind::ContentBased,
            weights: FeatureWeights { category: 0.6, price: 0.4, ..FeatureWeights::default() },
            sort_order: 1,
            ..base.clone()
        },
        RecommendationConfig {
            id: ConfigId("also-bought".to_owned()),
            name: "Customers also bought".to_owned(),
            kind: AlgorithmKind::CrossSell,
            filters: ConfigFilters {
                exclude_inactive: true,
                exclude_out_of_stock: true,
                ..ConfigFilters::default()
            },
            sort_order: 2,
            ..base
        },
    ]
}

fn seed_blocks(now: chrono::DateTime<Utc>) -> Vec<RecommendationBlock> {
    vec![
        RecommendationBlock {
            id: BlockId("homepage-related".to_owned()),
            name: "homepage-related".to_owned(),
            title: "You may also like".to_owned(),
            description: Some("Homepage carousel".to_owned()),
            config_refs: vec![
                ConfigRef { config_id: ConfigId("popular".to_owned()), position: 1 },
                ConfigRef { config_id: ConfigId("related".to_owned()), position: 2 },
            ],
            max_products: 8,
            cache_duration_secs: 600,
            display_settings: serde_json::json!({"layout": "carousel", "columns": 4}),
            is_active: true,
            updated_at: now,
        },
        RecommendationBlock {
            id: BlockId("pdp-cross-sell".to_owned()),
            name: "pdp-cross-sell".to_owned(),
            title: "Customers also bought".to_owned(),
            description: Some("Product page add-on strip".to_owned()),
            config_refs: vec![ConfigRef {
                config_id: ConfigId("also-bought".to_owned()),
                position: 1,
            }],
            max_products: 4,
            cache_duration_secs: 300,
            display_settings: serde_json::json!({"layout": "strip"}),
            is_active: true,
            updated_at: now,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;

    #[tokio::test]
    async fn seeding_is_idempotent_for_catalog_and_placements() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        let first = seed_demo_dataset(&pool).await.expect("seed");
        assert_eq!(first.products, SEED_PRODUCTS.len());
        assert_eq!(first.blocks, 2);

        // Re-seeding must not duplicate catalog rows or pivot entries.
        seed_demo_dataset(&pool).await.expect("re-seed");
        let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await
            .expect("count products");
        assert_eq!(products as usize, SEED_PRODUCTS.len());

        let pivots: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM block_configs WHERE block_id = 'homepage-related'",
        )
        .fetch_one(&pool)
        .await
        .expect("count pivots");
        assert_eq!(pivots, 2);
    }

    #[tokio::test]
    async fn seeded_configs_validate() {
        for config in seed_configs(Utc::now()) {
            config.validate().expect("seed config must be valid");
        }
        for block in seed_blocks(Utc::now()) {
            block.validate().expect("seed block must be valid");
        }
    }
}
