use chrono::{DateTime, Utc};
use sqlx::Row;

use vitrine_core::domain::interaction::{InteractionEvent, InteractionKind};
use vitrine_core::domain::product::ProductId;
use vitrine_engine::{GatewayError, InteractionStore};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlInteractionStore {
    pool: DbPool,
}

impl SqlInteractionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, event: &InteractionEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO interactions (subject, product_id, kind, occurred_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&event.subject)
        .bind(&event.product_id.0)
        .bind(event.kind.as_str())
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl InteractionStore for SqlInteractionStore {
    async fn interactions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionEvent>, GatewayError> {
        let rows = sqlx::query(
            "SELECT subject, product_id, kind, occurred_at
             FROM interactions WHERE occurred_at >= ?1 ORDER BY occurred_at",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: InteractionKind = row
                .get::<String, _>("kind")
                .parse()
                .map_err(GatewayError::Decode)?;
            events.push(InteractionEvent {
                subject: row.get("subject"),
                product_id: ProductId(row.get("product_id")),
                kind,
                occurred_at: row.get("occurred_at"),
            });
        }
        Ok(events)
    }
}
