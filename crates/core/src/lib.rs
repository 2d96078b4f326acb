pub mod cache_key;
pub mod composer;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod strategy;

pub use cache_key::CacheKey;
pub use composer::{compose, AvailabilityMap, ScoredProduct};
pub use context::{Context, PageType, Subject};
pub use domain::analytics::{AnalyticsAction, AnalyticsEvent, DailyAnalytics};
pub use domain::block::{BlockId, ConfigRef, RecommendationBlock};
pub use domain::config::{AlgorithmKind, ConfigId, FeatureWeights, RecommendationConfig};
pub use domain::interaction::{CandidatePool, InteractionEvent, InteractionKind};
pub use domain::product::{Availability, ProductAttributes, ProductId, ProductRecord};
pub use errors::{DomainError, EngineError, InterfaceError};
