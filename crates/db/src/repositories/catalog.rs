use std::collections::BTreeMap;

use sqlx::Row;

use vitrine_core::domain::product::{Availability, ProductAttributes, ProductId, ProductRecord};
use vitrine_engine::{CatalogGateway, GatewayError};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlCatalogGateway {
    pool: DbPool,
}

impl SqlCatalogGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or replace one catalog row. Used by sync jobs and seeds.
    pub async fn upsert(&self, record: &ProductRecord) -> Result<(), RepositoryError> {
        let tags = serde_json::to_string(&record.attributes.tags)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        sqlx::query(
            "INSERT INTO products
                (id, name, category, brand, price, rating, tags, product_line, is_active, stock)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                brand = excluded.brand,
                price = excluded.price,
                rating = excluded.rating,
                tags = excluded.tags,
                product_line = excluded.product_line,
                is_active = excluded.is_active,
                stock = excluded.stock",
        )
        .bind(&record.id.0)
        .bind(&record.name)
        .bind(&record.attributes.category)
        .bind(&record.attributes.brand)
        .bind(record.attributes.price)
        .bind(record.attributes.rating)
        .bind(tags)
        .bind(&record.attributes.product_line)
        .bind(record.availability.active)
        .bind(record.availability.stock)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn decode_attributes(row: &sqlx::sqlite::SqliteRow) -> Result<ProductAttributes, RepositoryError> {
    let tags: Vec<String> = serde_json::from_str(&row.get::<String, _>("tags"))
        .map_err(|e| RepositoryError::Decode(format!("product tags: {e}")))?;
    Ok(ProductAttributes {
        category: row.get("category"),
        brand: row.get("brand"),
        price: row.get("price"),
        rating: row.get("rating"),
        tags,
        product_line: row.get("product_line"),
    })
}

#[async_trait::async_trait]
impl CatalogGateway for SqlCatalogGateway {
    async fn exists(&self, product_id: &ProductId) -> Result<bool, GatewayError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM products WHERE id = ?1")
            .bind(&product_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn attributes(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductAttributes>, GatewayError> {
        let row = sqlx::query(
            "SELECT category, brand, price, rating, tags, product_line
             FROM products WHERE id = ?1",
        )
        .bind(&product_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        row.map(|row| decode_attributes(&row)).transpose().map_err(GatewayError::from)
    }

    async fn availability(
        &self,
        product_ids: &[ProductId],
    ) -> Result<BTreeMap<ProductId, Availability>, GatewayError> {
        // Chunked IN clause would matter at catalog scale; block results are
        // capped well below SQLite's bind limit.
        let mut map = BTreeMap::new();
        if product_ids.is_empty() {
            return Ok(map);
        }
        let placeholders =
            (1..=product_ids.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let sql =
            format!("SELECT id, is_active, stock FROM products WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in product_ids {
            query = query.bind(&id.0);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(RepositoryError::from)?;
        for row in rows {
            map.insert(
                ProductId(row.get("id")),
                Availability { active: row.get("is_active"), stock: row.get("stock") },
            );
        }
        Ok(map)
    }

    async fn active_products(
        &self,
    ) -> Result<Vec<(ProductId, ProductAttributes)>, GatewayError> {
        let rows = sqlx::query(
            "SELECT id, category, brand, price, rating, tags, product_line
             FROM products WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let id = ProductId(row.get("id"));
            let attributes = decode_attributes(&row).map_err(GatewayError::from)?;
            products.push((id, attributes));
        }
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;

    fn record(id: &str, active: bool, stock: i64) -> ProductRecord {
        ProductRecord {
            id: ProductId(id.to_owned()),
            name: format!("Product {id}"),
            attributes: ProductAttributes {
                category: "camera".to_owned(),
                brand: Some("lumen".to_owned()),
                price: 249.0,
                rating: Some(4.4),
                tags: vec!["mirrorless".to_owned()],
                product_line: Some("camera-x".to_owned()),
            },
            availability: Availability { active, stock },
        }
    }

    async fn gateway() -> SqlCatalogGateway {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        SqlCatalogGateway::new(pool)
    }

    #[tokio::test]
    async fn upsert_then_read_back_attributes() {
        let catalog = gateway().await;
        catalog.upsert(&record("p1", true, 3)).await.expect("upsert");

        assert!(catalog.exists(&ProductId("p1".into())).await.expect("exists"));
        let attrs = catalog
            .attributes(&ProductId("p1".into()))
            .await
            .expect("attributes")
            .expect("present");
        assert_eq!(attrs.tags, vec!["mirrorless".to_owned()]);
        assert_eq!(attrs.product_line.as_deref(), Some("camera-x"));
    }

    #[tokio::test]
    async fn inactive_products_are_excluded_from_the_candidate_universe() {
        let catalog = gateway().await;
        catalog.upsert(&record("p1", true, 3)).await.expect("upsert");
        catalog.upsert(&record("p2", false, 3)).await.expect("upsert");

        let products = catalog.active_products().await.expect("active");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].0, ProductId("p1".into()));
    }

    #[tokio::test]
    async fn availability_omits_unknown_products() {
        let catalog = gateway().await;
        catalog.upsert(&record("p1", true, 0)).await.expect("upsert");

        let map = catalog
            .availability(&[ProductId("p1".into()), ProductId("ghost".into())])
            .await
            .expect("availability");
        assert_eq!(map.len(), 1);
        assert!(!map[&ProductId("p1".into())].in_stock());
    }
}
