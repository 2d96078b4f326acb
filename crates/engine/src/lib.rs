//! Request-time orchestration: cache-managed evaluation of recommendation
//! blocks, asynchronous analytics recording, and the gateway seams to
//! catalog, interaction history, and analytics storage.

pub mod analytics;
pub mod cache;
pub mod engine;
pub mod gateway;

pub use analytics::AnalyticsRecorder;
pub use cache::{CacheLookup, CacheManager, CacheStats};
pub use engine::{RecommendationEngine, Recommendations};
pub use gateway::{AnalyticsSink, BlockStore, CatalogGateway, GatewayError, InteractionStore};
