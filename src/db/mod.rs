//! Database module for SQLite persistence.

pub mod connection;
pub mod error;
mod relationships;
pub mod repository;
pub mod schema;

pub use connection::{StoreConfig, create_schema};
pub use error::StoreError;
pub use repository::CatalogStore;
