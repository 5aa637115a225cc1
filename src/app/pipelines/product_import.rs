use super::product_writer::ProductWriter;
use crate::adapters::csv_source::CsvRowSource;
use crate::core::pipeline_sequence::{ChunkReader, ChunkStage, RunContext};
use crate::core::product_transformer::ProductTransformer;
use crate::core::record_grouper::{GroupingRule, RecordGrouper};
use crate::core::reference_cache::ReferenceCache;
use crate::domain::model::{CreationRequest, ProductGroup};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

pub const PRODUCTS_IMPORT_STEP: &str = "productsImportStep";

/// 讀 CSV → 分組 → 轉換 → 批次建立商品
pub struct ProductImportStage {
    source: CsvRowSource,
    grouping: GroupingRule,
    chunk_size: usize,
    workers: usize,
    b2b_customer_group: String,
    cache: Arc<ReferenceCache>,
    transformer: ProductTransformer,
    writer: ProductWriter,
}

impl ProductImportStage {
    pub fn new(
        source: CsvRowSource,
        grouping: GroupingRule,
        cache: Arc<ReferenceCache>,
        transformer: ProductTransformer,
        writer: ProductWriter,
    ) -> Self {
        Self {
            source,
            grouping,
            chunk_size: 20,
            workers: 4,
            b2b_customer_group: "b2b".to_string(),
            cache,
            transformer,
            writer,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_customer_group(mut self, name: impl Into<String>) -> Self {
        self.b2b_customer_group = name.into();
        self
    }
}

#[async_trait]
impl ChunkStage for ProductImportStage {
    fn name(&self) -> &str {
        PRODUCTS_IMPORT_STEP
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    async fn open(&self, context: &RunContext) -> Result<Box<dyn ChunkReader>> {
        // 前置階段的結果優先於延遲查詢
        if let Some(schemas) = &context.product_schemas {
            if self.cache.prime_schemas(schemas) {
                tracing::debug!("📚 Product type index primed with {} entries", schemas.len());
            }
        }
        if let Some(id) = &context.b2b_customer_group_id {
            self.cache
                .prime_customer_group(&self.b2b_customer_group, id.clone())
                .await;
        }

        let rows = self.source.open()?;
        tracing::info!(
            "📄 Reading products from {} ({} columns)",
            self.source.path().display(),
            rows.headers().len()
        );

        Ok(Box::new(RecordGrouper::new(
            rows,
            self.grouping.clone().into_predicate(),
        )))
    }

    async fn process(&self, items: Vec<ProductGroup>) -> Result<Vec<CreationRequest>> {
        let transformed: Vec<Option<CreationRequest>> =
            stream::iter(items.into_iter().map(|group| async move {
                self.transformer.transform(&group).await
            }))
            .buffered(self.workers)
            .try_collect()
            .await?;

        Ok(transformed.into_iter().flatten().collect())
    }

    async fn write(&self, requests: Vec<CreationRequest>) -> Result<usize> {
        self.writer.write(&requests).await
    }
}
