pub mod pipelines;

pub use pipelines::job::{build_products_import_job, ProductImportJob};
