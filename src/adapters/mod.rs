// Adapters layer: concrete implementations for external systems (catalog API, CSV source).

pub mod csv_source;
pub mod http;
pub mod memory;

pub use csv_source::CsvRowSource;
pub use http::HttpCatalogClient;
pub use memory::InMemoryCatalog;
