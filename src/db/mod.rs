pub mod export;
pub mod memory;
pub mod postgres;
pub mod queries;
pub mod repository;

pub use export::export_outcomes_csv;
pub use memory::{InMemoryCatalogRepository, InMemoryLineUpdateSink};
pub use postgres::{create_pool, PgCatalogRepository, PgLineUpdateSink};
pub use queries::ensure_schema;
pub use repository::{modify_entry, CatalogRepository, LineUpdateSink};
