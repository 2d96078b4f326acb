//! Aggregated click-through and conversion tracking per block/config/day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::block::BlockId;
use crate::domain::config::ConfigId;
use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsAction {
    View,
    Click,
    Purchase,
}

impl AnalyticsAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsAction::View => "view",
            AnalyticsAction::Click => "click",
            AnalyticsAction::Purchase => "purchase",
        }
    }
}

/// One recorded action against a recommendation that was actually shown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub block_id: BlockId,
    pub config_id: ConfigId,
    pub product_id: Option<ProductId>,
    pub subject: String,
    pub action: AnalyticsAction,
    pub occurred_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn day(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }
}

/// One aggregation row per (block, config, date[, product]). Counters are
/// monotonically non-decreasing within a day; a new day starts a new row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalytics {
    pub block_id: BlockId,
    pub config_id: ConfigId,
    pub product_id: Option<ProductId>,
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub purchases: u64,
    pub ctr: f64,
    pub conversion_rate: f64,
    /// Free-form extension metrics; the engine never interprets these.
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

impl DailyAnalytics {
    pub fn new(
        block_id: BlockId,
        config_id: ConfigId,
        product_id: Option<ProductId>,
        date: NaiveDate,
    ) -> Self {
        Self {
            block_id,
            config_id,
            product_id,
            date,
            impressions: 0,
            clicks: 0,
            purchases: 0,
            ctr: 0.0,
            conversion_rate: 0.0,
            metrics: serde_json::Map::new(),
        }
    }

    pub fn apply(&mut self, action: AnalyticsAction) {
        match action {
            AnalyticsAction::View => self.impressions += 1,
            AnalyticsAction::Click => self.clicks += 1,
            AnalyticsAction::Purchase => self.purchases += 1,
        }
        self.recompute_rates();
    }

    /// Derived rates are always rewritten from the counters so the two can
    /// never disagree.
    pub fn recompute_rates(&mut self) {
        self.ctr = ratio(self.clicks, self.impressions);
        self.conversion_rate = ratio(self.purchases, self.clicks);
    }
}

pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
