pub mod job;
pub mod product_import;
pub mod product_writer;
pub mod setup_stages;

pub use job::{build_products_import_job, ProductImportJob};
pub use product_import::{ProductImportStage, PRODUCTS_IMPORT_STEP};
pub use product_writer::ProductWriter;
pub use setup_stages::{
    FetchProductSchemasStage, GetOrCreateCustomerGroupStage, CUSTOMER_GROUP_STEP,
    PRODUCT_TYPES_STEP,
};
