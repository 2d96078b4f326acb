use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute vector for content-based similarity. Fetched eagerly through
/// the catalog gateway; strategies never load anything lazily.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub category: String,
    pub brand: Option<String>,
    pub price: f64,
    pub rating: Option<f64>,
    pub tags: Vec<String>,
    /// Product line for up-sell laddering (e.g. "plan", "camera-x").
    pub product_line: Option<String>,
}

impl ProductAttributes {
    /// Logarithmic price bucket so that "similar price" tolerates small
    /// absolute differences on cheap products and large ones on expensive.
    pub fn price_bucket(&self) -> u32 {
        if self.price <= 0.0 {
            return 0;
        }
        (self.price.log10() * 2.0).floor().max(0.0) as u32 + 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub active: bool,
    pub stock: i64,
}

impl Availability {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Full catalog row as stored by the gateway implementations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub attributes: ProductAttributes,
    pub availability: Availability,
}
