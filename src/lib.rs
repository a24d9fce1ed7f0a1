pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::{AppConfig, MatchingSettings};
pub use db::{
    create_pool, ensure_schema, export_outcomes_csv, CatalogRepository, InMemoryCatalogRepository,
    InMemoryLineUpdateSink, LineUpdateSink, PgCatalogRepository, PgLineUpdateSink,
};
pub use error::{CatalogError, CatalogResult};
pub use service::MatchingEngine;
