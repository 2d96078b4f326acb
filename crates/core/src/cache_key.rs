//! Deterministic cache-key fingerprinting.
//!
//! Version timestamps of the block and every active config are folded into
//! the key, so editing any of them makes stale entries unreachable without
//! an explicit purge.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::domain::block::RecommendationBlock;
use crate::domain::config::RecommendationConfig;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(pub String);

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl CacheKey {
    pub fn compute(
        block: &RecommendationBlock,
        configs: &[RecommendationConfig],
        context: &Context,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(block.id.0.as_bytes());
        hasher.update(block.updated_at.to_rfc3339().as_bytes());

        let mut versions: Vec<(String, String)> = configs
            .iter()
            .filter(|config| config.is_active)
            .map(|config| (config.id.0.clone(), config.updated_at.to_rfc3339()))
            .collect();
        versions.sort();
        for (id, updated_at) in versions {
            hasher.update(id.as_bytes());
            hasher.update(updated_at.as_bytes());
        }

        hasher.update(context.signature().as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::context::{PageType, Subject};
    use crate::domain::block::{BlockId, ConfigRef};
    use crate::domain::config::{AlgorithmKind, ConfigFilters, ConfigId, FeatureWeights};

    fn block() -> RecommendationBlock {
        RecommendationBlock {
            id: BlockId("homepage-related".into()),
            name: "homepage-related".into(),
            title: "You may also like".into(),
            description: None,
            config_refs: vec![ConfigRef { config_id: ConfigId("popular".into()), position: 1 }],
            max_products: 8,
            cache_duration_secs: 600,
            display_settings: serde_json::Value::Null,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    fn config(id: &str) -> RecommendationConfig {
        RecommendationConfig {
            id: ConfigId(id.to_owned()),
            name: id.to_owned(),
            kind: AlgorithmKind::Popularity,
            min_score: 0.1,
            max_results: 10,
            decay_factor: 0.9,
            weights: FeatureWeights::default(),
            filters: ConfigFilters::default(),
            is_active: true,
            is_default: false,
            cache_ttl_secs: 300,
            sort_order: 0,
            updated_at: Utc::now(),
        }
    }

    fn context() -> Context {
        Context::new(Subject::User("u-1".into()), PageType::Home, "en-US")
    }

    #[test]
    fn same_inputs_produce_the_same_key() {
        let (block, configs) = (block(), vec![config("a"), config("b")]);
        let key1 = CacheKey::compute(&block, &configs, &context());
        let key2 = CacheKey::compute(&block, &configs, &context());
        assert_eq!(key1, key2);
    }

    #[test]
    fn config_order_does_not_change_the_key() {
        let block = block();
        let forward = vec![config("a"), config("b")];

        let key1 = CacheKey::compute(&block, &forward, &context());
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();
        let key2 = CacheKey::compute(&block, &reversed, &context());
        assert_eq!(key1, key2);
    }

    #[test]
    fn editing_a_config_rotates_the_key() {
        let block = block();
        let mut cfg = config("a");
        let before = CacheKey::compute(&block, &[cfg.clone()], &context());

        cfg.updated_at += Duration::seconds(1);
        let after = CacheKey::compute(&block, &[cfg], &context());
        assert_ne!(before, after);
    }

    #[test]
    fn inactive_configs_do_not_affect_the_key() {
        let block = block();
        let active = config("a");
        let mut inactive = config("b");
        inactive.is_active = false;

        let with = CacheKey::compute(&block, &[active.clone(), inactive], &context());
        let without = CacheKey::compute(&block, &[active], &context());
        assert_eq!(with, without);
    }

    #[test]
    fn different_contexts_get_different_keys() {
        let (block, configs) = (block(), vec![config("a")]);
        let key1 = CacheKey::compute(&block, &configs, &context());
        let other = Context::new(Subject::Session("s-9".into()), PageType::Home, "en-US");
        let key2 = CacheKey::compute(&block, &configs, &other);
        assert_ne!(key1, key2);
    }
}
