use crate::core::pipeline_sequence::{ContextValue, RunContext, SetupStage};
use crate::core::reference_cache::ReferenceCache;
use crate::domain::ports::CatalogClient;
use crate::utils::deadline;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const CUSTOMER_GROUP_STEP: &str = "getOrCreateCustomerGroupStep";
pub const PRODUCT_TYPES_STEP: &str = "getProductTypesStep";

/// 取得（必要時建立）B2B 客戶群組，並把 id 提升到上下文
pub struct GetOrCreateCustomerGroupStage {
    cache: Arc<ReferenceCache>,
    group_name: String,
}

impl GetOrCreateCustomerGroupStage {
    pub fn new(cache: Arc<ReferenceCache>, group_name: impl Into<String>) -> Self {
        Self {
            cache,
            group_name: group_name.into(),
        }
    }
}

#[async_trait]
impl SetupStage for GetOrCreateCustomerGroupStage {
    fn name(&self) -> &str {
        CUSTOMER_GROUP_STEP
    }

    async fn run(&self, _context: &RunContext) -> Result<Vec<ContextValue>> {
        let id = self.cache.customer_group_id(&self.group_name).await?;
        tracing::info!("👥 Customer group '{}' resolved to {}", self.group_name, id);
        Ok(vec![ContextValue::B2bCustomerGroup(id)])
    }
}

/// 一次載入所有商品類型
pub struct FetchProductSchemasStage {
    client: Arc<dyn CatalogClient>,
    timeout: Duration,
}

impl FetchProductSchemasStage {
    pub fn new(client: Arc<dyn CatalogClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl SetupStage for FetchProductSchemasStage {
    fn name(&self) -> &str {
        PRODUCT_TYPES_STEP
    }

    async fn run(&self, _context: &RunContext) -> Result<Vec<ContextValue>> {
        let schemas = deadline::within(
            "query product types",
            self.timeout,
            self.client.query_all_product_schemas(),
        )
        .await?;
        tracing::info!("📚 Loaded {} product types", schemas.len());
        Ok(vec![ContextValue::ProductSchemas(Arc::new(schemas))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCatalog;
    use crate::domain::model::ProductSchema;

    fn context() -> RunContext {
        RunContext::new("test".to_string())
    }

    #[tokio::test]
    async fn test_customer_group_stage_creates_once() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let cache = Arc::new(ReferenceCache::new(catalog.clone(), Duration::from_secs(5)));
        let stage = GetOrCreateCustomerGroupStage::new(cache, "b2b");

        let first = stage.run(&context()).await.unwrap();
        let second = stage.run(&context()).await.unwrap();

        match (&first[0], &second[0]) {
            (ContextValue::B2bCustomerGroup(a), ContextValue::B2bCustomerGroup(b)) => {
                assert_eq!(a, b)
            }
            other => panic!("unexpected context values: {:?}", other),
        }
        assert_eq!(catalog.calls().customer_group_creates, 1);
        assert_eq!(catalog.customer_groups().len(), 1);
    }

    #[tokio::test]
    async fn test_customer_group_stage_reuses_existing_group() {
        let catalog = Arc::new(InMemoryCatalog::new().with_customer_group("b2b", "cg-existing"));
        let cache = Arc::new(ReferenceCache::new(catalog.clone(), Duration::from_secs(5)));

        let values = GetOrCreateCustomerGroupStage::new(cache, "b2b")
            .run(&context())
            .await
            .unwrap();

        assert!(matches!(&values[0], ContextValue::B2bCustomerGroup(id) if id == "cg-existing"));
        assert_eq!(catalog.calls().customer_group_creates, 0);
    }

    #[tokio::test]
    async fn test_product_types_stage_promotes_all_schemas() {
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_schema(ProductSchema {
                    id: "pt-1".to_string(),
                    key: Some("shirt".to_string()),
                    name: "shirt".to_string(),
                    attributes: Vec::new(),
                })
                .with_schema(ProductSchema {
                    id: "pt-2".to_string(),
                    key: None,
                    name: "shoe".to_string(),
                    attributes: Vec::new(),
                }),
        );

        let values = FetchProductSchemasStage::new(catalog.clone(), Duration::from_secs(5))
            .run(&context())
            .await
            .unwrap();

        match &values[0] {
            ContextValue::ProductSchemas(schemas) => assert_eq!(schemas.len(), 2),
            other => panic!("unexpected context value: {:?}", other),
        }
        assert_eq!(catalog.calls().schema_listings, 1);
    }
}
