use super::product_import::ProductImportStage;
use super::product_writer::ProductWriter;
use super::setup_stages::{FetchProductSchemasStage, GetOrCreateCustomerGroupStage};
use crate::adapters::csv_source::CsvRowSource;
use crate::config::ImportConfig;
use crate::core::pipeline_sequence::{PipelineSequence, RunContext};
use crate::core::product_transformer::ProductTransformer;
use crate::core::reference_cache::ReferenceCache;
use crate::domain::ports::CatalogClient;
use crate::utils::error::Result;
use std::sync::Arc;

/// 完整的商品匯入作業：客戶群組 → 商品類型 → 商品匯入
pub struct ProductImportJob {
    sequence: PipelineSequence,
}

impl ProductImportJob {
    pub fn stage_names(&self) -> Vec<&str> {
        self.sequence.stage_names()
    }

    pub async fn run(&self) -> Result<RunContext> {
        tracing::info!("🚀 Starting products import (execution: {})", self.sequence.execution_id());
        self.sequence.execute_all().await
    }
}

/// 依配置組裝作業；每次執行使用獨立的 ReferenceCache
pub fn build_products_import_job(
    config: &ImportConfig,
    client: Arc<dyn CatalogClient>,
    execution_id: impl Into<String>,
) -> Result<ProductImportJob> {
    let delimiter = config.delimiter()?;
    let timeout = config.timeout();
    let cache = Arc::new(ReferenceCache::new(client.clone(), timeout));

    let import_stage = ProductImportStage::new(
        CsvRowSource::new(&config.source.path, delimiter, &config.source.schema_column),
        config.grouping_rule(),
        cache.clone(),
        ProductTransformer::new(cache.clone(), config.transform_settings()),
        ProductWriter::new(client.clone(), timeout).with_dry_run(config.import.dry_run),
    )
    .with_chunk_size(config.import.chunk_size)
    .with_workers(config.import.workers)
    .with_customer_group(&config.import.b2b_customer_group);

    let mut sequence =
        PipelineSequence::new(execution_id.into()).with_monitoring(config.monitoring_enabled());
    sequence.add_setup_stage(Box::new(GetOrCreateCustomerGroupStage::new(
        cache,
        &config.import.b2b_customer_group,
    )));
    sequence.add_setup_stage(Box::new(FetchProductSchemasStage::new(client, timeout)));
    sequence.add_chunk_stage(Box::new(import_stage));

    Ok(ProductImportJob { sequence })
}
