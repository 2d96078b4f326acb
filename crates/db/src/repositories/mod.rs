use thiserror::Error;

use vitrine_engine::GatewayError;

pub mod analytics;
pub mod blocks;
pub mod catalog;
pub mod interactions;
pub mod memory;

pub use analytics::SqlAnalyticsSink;
pub use blocks::SqlBlockStore;
pub use catalog::SqlCatalogGateway;
pub use interactions::SqlInteractionStore;
pub use memory::{
    InMemoryAnalyticsSink, InMemoryBlockStore, InMemoryCatalogGateway, InMemoryInteractionStore,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for GatewayError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(e) => GatewayError::Unavailable(e.to_string()),
            RepositoryError::Decode(message) => GatewayError::Decode(message),
        }
    }
}
