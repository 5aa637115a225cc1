pub mod attribute_mapper;
pub mod pipeline_sequence;
pub mod price_parser;
pub mod product_transformer;
pub mod record_grouper;
pub mod reference_cache;

pub use crate::domain::model::{CreationRequest, ProductGroup, Row};
pub use crate::domain::ports::CatalogClient;
pub use crate::utils::error::Result;
