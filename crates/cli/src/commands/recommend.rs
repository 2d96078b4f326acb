use std::sync::Arc;

use vitrine_core::config::{AppConfig, LoadOptions};
use vitrine_core::context::{Context, PageType, Subject};
use vitrine_core::domain::product::ProductId;
use vitrine_db::repositories::{
    SqlAnalyticsSink, SqlBlockStore, SqlCatalogGateway, SqlInteractionStore,
};
use vitrine_db::connect_from_config;
use vitrine_engine::{AnalyticsRecorder, CacheManager, RecommendationEngine};

use crate::commands::{block_on, CommandResult};

pub fn run(
    block: &str,
    user: Option<String>,
    session: Option<String>,
    anchor: Option<String>,
    page: &str,
    locale: &str,
    fresh: bool,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let page_type: PageType = match page.parse() {
        Ok(page_type) => page_type,
        Err(error) => {
            return CommandResult::failure("recommend", "invalid_context", error.to_string(), 2);
        }
    };
    let subject = match (user, session) {
        (Some(user), _) => Subject::User(user),
        (None, Some(session)) => Subject::Session(session),
        (None, None) => Subject::Session("cli-local".to_owned()),
    };
    let mut context = Context::new(subject, page_type, locale);
    if let Some(anchor) = anchor {
        context = context.with_anchor(ProductId(anchor));
    }

    let block_name = block.to_owned();
    let result = block_on("recommend", async move {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let (recorder, worker) =
            AnalyticsRecorder::spawn(Arc::new(SqlAnalyticsSink::new(pool.clone())));
        let engine = RecommendationEngine::new(
            Arc::new(SqlBlockStore::new(pool.clone())),
            Arc::new(SqlCatalogGateway::new(pool.clone())),
            Arc::new(SqlInteractionStore::new(pool.clone())),
            CacheManager::new(),
            recorder,
            &config.engine,
        );
        if fresh {
            engine.set_cache_bypass(true);
        }

        let recommendations = engine
            .recommend(&block_name, &context)
            .await
            .map_err(|error| ("engine", error.to_string(), 5u8))?;
        let cache_stats = engine.cache_stats().await;

        // Flush queued impressions before the pool goes away.
        drop(engine);
        worker.await.map_err(|error| ("analytics_flush", error.to_string(), 5u8))?;
        pool.close().await;
        Ok((recommendations, cache_stats))
    });

    match result {
        Ok((recommendations, cache_stats)) => {
            let message = format!(
                "{} items for block `{}` (cache {})",
                recommendations.items.len(),
                recommendations.block_id,
                if recommendations.served_from_cache { "hit" } else { "miss" }
            );
            let data = serde_json::json!({
                "request_id": recommendations.request_id,
                "block_id": recommendations.block_id.0,
                "cache_key": recommendations.cache_key.0,
                "served_from_cache": recommendations.served_from_cache,
                "cache_stats": {
                    "entries": cache_stats.entries,
                    "hits": cache_stats.hits,
                    "misses": cache_stats.misses,
                },
                "items": &*recommendations.items,
            });
            CommandResult::success_with_data("recommend", message, data)
        }
        Err(failure) => failure,
    }
}
