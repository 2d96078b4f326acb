//! Tunable scoring-strategy definitions, edited by operators and read-only
//! to the engine at request time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigId(pub String);

impl std::fmt::Display for ConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of scoring algorithms. Dispatch is an exhaustive `match`,
/// never a runtime string lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Collaborative,
    ContentBased,
    Hybrid,
    Popularity,
    Trending,
    CrossSell,
    UpSell,
    Similarity,
    Custom,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::Collaborative => "collaborative",
            AlgorithmKind::ContentBased => "content_based",
            AlgorithmKind::Hybrid => "hybrid",
            AlgorithmKind::Popularity => "popularity",
            AlgorithmKind::Trending => "trending",
            AlgorithmKind::CrossSell => "cross_sell",
            AlgorithmKind::UpSell => "up_sell",
            AlgorithmKind::Similarity => "similarity",
            AlgorithmKind::Custom => "custom",
        }
    }
}

impl std::str::FromStr for AlgorithmKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "collaborative" => Ok(Self::Collaborative),
            "content_based" => Ok(Self::ContentBased),
            "hybrid" => Ok(Self::Hybrid),
            "popularity" => Ok(Self::Popularity),
            "trending" => Ok(Self::Trending),
            "cross_sell" => Ok(Self::CrossSell),
            "up_sell" => Ok(Self::UpSell),
            "similarity" => Ok(Self::Similarity),
            "custom" => Ok(Self::Custom),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown algorithm kind `{other}`")))
            }
        }
    }
}

/// Per-feature weights. Non-negative, not required to sum to 1; strategies
/// normalize internally.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct FeatureWeights {
    pub price: f64,
    pub rating: f64,
    pub popularity: f64,
    pub recency: f64,
    pub category: f64,
    pub custom: f64,
}

impl FeatureWeights {
    pub fn sum(&self) -> f64 {
        self.price + self.rating + self.popularity + self.recency + self.category + self.custom
    }

    fn validate(&self) -> Result<(), DomainError> {
        let all = [self.price, self.rating, self.popularity, self.recency, self.category, self.custom];
        if all.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(DomainError::InvariantViolation(
                "feature weights must be non-negative and finite".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigFilters {
    pub exclude_out_of_stock: bool,
    pub exclude_inactive: bool,
    /// When non-empty, only these products may be recommended by this config.
    pub allowed_products: Vec<ProductId>,
    /// When non-empty, only candidates in these categories may be recommended.
    pub allowed_categories: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub id: ConfigId,
    pub name: String,
    pub kind: AlgorithmKind,
    pub min_score: f64,
    pub max_results: usize,
    /// Weight multiplier applied per day elapsed since an interaction.
    pub decay_factor: f64,
    pub weights: FeatureWeights,
    pub filters: ConfigFilters,
    pub is_active: bool,
    pub is_default: bool,
    /// Stored for operators; the composed result is cached under the
    /// block's `cache_duration`, not this value.
    pub cache_ttl_secs: u64,
    pub sort_order: i32,
    pub updated_at: DateTime<Utc>,
}

impl RecommendationConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.0.trim().is_empty() {
            return Err(DomainError::InvariantViolation("config id must not be blank".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(DomainError::InvariantViolation(format!(
                "min_score must be in [0,1], got {}",
                self.min_score
            )));
        }
        if self.max_results == 0 {
            return Err(DomainError::InvariantViolation("max_results must be positive".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.decay_factor) {
            return Err(DomainError::InvariantViolation(format!(
                "decay_factor must be in [0,1], got {}",
                self.decay_factor
            )));
        }
        self.weights.validate()
    }

    /// Composite weight applied to this config's normalized scores during
    /// blending: the sum of its feature weights, or 1 when all are zero.
    pub fn composite_weight(&self) -> f64 {
        let sum = self.weights.sum();
        if sum > 0.0 {
            sum
        } else {
            1.0
        }
    }

    pub fn allows_product(&self, product_id: &ProductId, category: &str) -> bool {
        if !self.filters.allowed_products.is_empty()
            && !self.filters.allowed_products.contains(product_id)
        {
            return false;
        }
        if !self.filters.allowed_categories.is_empty()
            && !self.filters.allowed_categories.iter().any(|c| c == category)
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RecommendationConfig {
        RecommendationConfig {
            id: ConfigId("popular".into()),
            name: "Popular products".into(),
            kind: AlgorithmKind::Popularity,
            min_score: 0.1,
            max_results: 10,
            decay_factor: 0.9,
            weights: FeatureWeights::default(),
            filters: ConfigFilters::default(),
            is_active: true,
            is_default: true,
            cache_ttl_secs: 300,
            sort_order: 0,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn out_of_range_decay_factor_is_rejected() {
        let mut cfg = config();
        cfg.decay_factor = 1.2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut cfg = config();
        cfg.weights.price = -0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn composite_weight_defaults_to_one_when_all_weights_zero() {
        let cfg = config();
        assert_eq!(cfg.composite_weight(), 1.0);

        let mut weighted = config();
        weighted.weights.price = 0.3;
        weighted.weights.category = 0.2;
        assert!((weighted.composite_weight() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn allow_lists_restrict_candidates() {
        let mut cfg = config();
        cfg.filters.allowed_categories = vec!["camera".to_owned()];
        assert!(cfg.allows_product(&ProductId("p1".into()), "camera"));
        assert!(!cfg.allows_product(&ProductId("p1".into()), "tripod"));

        cfg.filters.allowed_products = vec![ProductId("p2".into())];
        assert!(!cfg.allows_product(&ProductId("p1".into()), "camera"));
        assert!(cfg.allows_product(&ProductId("p2".into()), "camera"));
    }

    #[test]
    fn algorithm_kind_round_trips_through_str() {
        for kind in [
            AlgorithmKind::Collaborative,
            AlgorithmKind::ContentBased,
            AlgorithmKind::Hybrid,
            AlgorithmKind::Popularity,
            AlgorithmKind::Trending,
            AlgorithmKind::CrossSell,
            AlgorithmKind::UpSell,
            AlgorithmKind::Similarity,
            AlgorithmKind::Custom,
        ] {
            assert_eq!(kind.as_str().parse::<AlgorithmKind>().unwrap(), kind);
        }
        assert!("gradient_boosted".parse::<AlgorithmKind>().is_err());
    }
}
