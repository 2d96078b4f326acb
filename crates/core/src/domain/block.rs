//! Named placements ("You may also like") composing one or more configs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::config::ConfigId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub String);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered reference to a config. Position defines tie-break precedence
/// when final scores are equal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRef {
    pub config_id: ConfigId,
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBlock {
    pub id: BlockId,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub config_refs: Vec<ConfigRef>,
    pub max_products: usize,
    pub cache_duration_secs: u64,
    /// Layout hints for the rendering surface; opaque to the engine.
    pub display_settings: serde_json::Value,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl RecommendationBlock {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.0.trim().is_empty() {
            return Err(DomainError::InvariantViolation("block id must not be blank".to_owned()));
        }
        if self.is_active && self.config_refs.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "active block `{}` must reference at least one config",
                self.id
            )));
        }
        if self.max_products == 0 {
            return Err(DomainError::InvariantViolation("max_products must be positive".to_owned()));
        }
        Ok(())
    }

    /// Config ids in placement order.
    pub fn ordered_config_ids(&self) -> Vec<ConfigId> {
        let mut refs = self.config_refs.clone();
        refs.sort_by_key(|r| r.position);
        refs.into_iter().map(|r| r.config_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(refs: Vec<ConfigRef>) -> RecommendationBlock {
        RecommendationBlock {
            id: BlockId("homepage-related".into()),
            name: "homepage-related".into(),
            title: "You may also like".into(),
            description: None,
            config_refs: refs,
            max_products: 8,
            cache_duration_secs: 600,
            display_settings: serde_json::json!({"layout": "carousel"}),
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn active_block_without_configs_is_invalid() {
        assert!(block(vec![]).validate().is_err());
    }

    #[test]
    fn config_ids_are_returned_in_position_order() {
        let b = block(vec![
            ConfigRef { config_id: ConfigId("second".into()), position: 2 },
            ConfigRef { config_id: ConfigId("first".into()), position: 1 },
        ]);
        let ordered = b.ordered_config_ids();
        assert_eq!(ordered, vec![ConfigId("first".into()), ConfigId("second".into())]);
    }
}
