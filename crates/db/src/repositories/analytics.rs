use chrono::NaiveDate;
use sqlx::Row;

use vitrine_core::domain::analytics::{
    ratio, AnalyticsAction, AnalyticsEvent, DailyAnalytics,
};
use vitrine_core::domain::block::BlockId;
use vitrine_core::domain::config::ConfigId;
use vitrine_core::domain::product::ProductId;
use vitrine_engine::{AnalyticsSink, GatewayError};

use super::RepositoryError;
use crate::DbPool;

/// Daily aggregation rows keyed by (block, config, product, date). A
/// product-less event lands on the block-level row (`product_id = ''`).
pub struct SqlAnalyticsSink {
    pool: DbPool,
}

impl SqlAnalyticsSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<DailyAnalytics, RepositoryError> {
    let product: String = row.get("product_id");
    let metrics = serde_json::from_str(&row.get::<String, _>("metrics"))
        .map_err(|e| RepositoryError::Decode(format!("metrics: {e}")))?;
    Ok(DailyAnalytics {
        block_id: BlockId(row.get("block_id")),
        config_id: ConfigId(row.get("config_id")),
        product_id: if product.is_empty() { None } else { Some(ProductId(product)) },
        date: row.get("date"),
        impressions: row.get::<i64, _>("impressions").max(0) as u64,
        clicks: row.get::<i64, _>("clicks").max(0) as u64,
        purchases: row.get::<i64, _>("purchases").max(0) as u64,
        ctr: row.get("ctr"),
        conversion_rate: row.get("conversion_rate"),
        metrics,
    })
}

#[async_trait::async_trait]
impl AnalyticsSink for SqlAnalyticsSink {
    async fn record(&self, event: &AnalyticsEvent) -> Result<(), GatewayError> {
        let (views, clicks, purchases): (i64, i64, i64) = match event.action {
            AnalyticsAction::View => (1, 0, 0),
            AnalyticsAction::Click => (0, 1, 0),
            AnalyticsAction::Purchase => (0, 0, 1),
        };
        let product = event.product_id.as_ref().map(|p| p.0.as_str()).unwrap_or("");
        // Derived rates are rewritten from the counters in the same
        // statement so a crash can never leave them stale.
        sqlx::query(
            "INSERT INTO recommendation_analytics
                (block_id, config_id, product_id, date,
                 impressions, clicks, purchases, ctr, conversion_rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (block_id, config_id, product_id, date) DO UPDATE SET
                impressions = impressions + excluded.impressions,
                clicks = clicks + excluded.clicks,
                purchases = purchases + excluded.purchases,
                ctr = CASE WHEN impressions + excluded.impressions > 0
                    THEN CAST(clicks + excluded.clicks AS REAL)
                        / (impressions + excluded.impressions)
                    ELSE 0 END,
                conversion_rate = CASE WHEN clicks + excluded.clicks > 0
                    THEN CAST(purchases + excluded.purchases AS REAL)
                        / (clicks + excluded.clicks)
                    ELSE 0 END",
        )
        .bind(&event.block_id.0)
        .bind(&event.config_id.0)
        .bind(product)
        .bind(event.day())
        .bind(views)
        .bind(clicks)
        .bind(purchases)
        .bind(ratio(clicks as u64, views as u64))
        .bind(ratio(purchases as u64, clicks as u64))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn daily_report(
        &self,
        block_id: &BlockId,
        date: NaiveDate,
    ) -> Result<Vec<DailyAnalytics>, GatewayError> {
        let rows = sqlx::query(
            "SELECT block_id, config_id, product_id, date,
                    impressions, clicks, purchases, ctr, conversion_rate, metrics
             FROM recommendation_analytics
             WHERE block_id = ?1 AND date = ?2
             ORDER BY config_id, product_id",
        )
        .bind(&block_id.0)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut report = Vec::with_capacity(rows.len());
        for row in rows {
            report.push(decode_row(&row).map_err(GatewayError::from)?);
        }
        Ok(report)
    }
}
