pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CsvRowSource, HttpCatalogClient, InMemoryCatalog};
pub use app::{build_products_import_job, ProductImportJob};
pub use config::ImportConfig;
pub use core::pipeline_sequence::PipelineSequence;
pub use domain::ports::CatalogClient;
pub use utils::error::{ImportError, Result};
