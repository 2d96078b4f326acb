//! Read-only interaction history that feeds the scoring strategies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductAttributes, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Click,
    Cart,
    Purchase,
}

impl InteractionKind {
    /// Base weight of one interaction before temporal decay.
    pub fn weight(&self) -> f64 {
        match self {
            InteractionKind::View => 1.0,
            InteractionKind::Click => 2.0,
            InteractionKind::Cart => 3.0,
            InteractionKind::Purchase => 5.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Click => "click",
            InteractionKind::Cart => "cart",
            InteractionKind::Purchase => "purchase",
        }
    }
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "click" => Ok(Self::Click),
            "cart" => Ok(Self::Cart),
            "purchase" => Ok(Self::Purchase),
            other => Err(format!("unknown interaction kind `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub subject: String,
    pub product_id: ProductId,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
}

/// Everything a strategy may read, fetched eagerly before evaluation.
/// `BTreeMap` keeps candidate iteration deterministic.
#[derive(Clone, Debug, Default)]
pub struct CandidatePool {
    pub anchor_attributes: Option<ProductAttributes>,
    pub candidates: BTreeMap<ProductId, ProductAttributes>,
    pub interactions: Vec<InteractionEvent>,
}

impl CandidatePool {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Interactions touching one product, in stored order.
    pub fn interactions_for<'a>(
        &'a self,
        product_id: &'a ProductId,
    ) -> impl Iterator<Item = &'a InteractionEvent> + 'a {
        self.interactions.iter().filter(move |event| &event.product_id == product_id)
    }

    /// Subjects that interacted with the given product.
    pub fn subjects_for<'a>(&'a self, product_id: &'a ProductId) -> Vec<&'a str> {
        let mut subjects: Vec<&str> =
            self.interactions_for(product_id).map(|event| event.subject.as_str()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        subjects
    }
}
