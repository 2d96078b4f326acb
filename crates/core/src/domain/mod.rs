pub mod analytics;
pub mod block;
pub mod config;
pub mod interaction;
pub mod product;
