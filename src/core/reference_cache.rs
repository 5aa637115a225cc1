use crate::domain::model::{ProductSchema, Reference};
use crate::domain::ports::CatalogClient;
use crate::utils::deadline::within;
use crate::utils::error::{ImportError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

type MemoTable<T> = Mutex<HashMap<String, Arc<OnceCell<T>>>>;

/// 單次執行範圍內的遠端參照快取
///
/// 三張表各自獨立加鎖。每個 key 對應一個 `OnceCell`，同一 key 的並行首次查詢
/// 只會有一個遠端呼叫，其餘等待同一結果。快取內容在整個執行期間不失效。
pub struct ReferenceCache {
    client: Arc<dyn CatalogClient>,
    timeout: Duration,
    schemas: OnceCell<HashMap<String, Arc<ProductSchema>>>,
    customer_groups: MemoTable<String>,
    channels: MemoTable<Option<Reference>>,
}

impl ReferenceCache {
    pub fn new(client: Arc<dyn CatalogClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            schemas: OnceCell::new(),
            customer_groups: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// 以前置階段取得的 schema 清單填入快取；已載入時回傳 false
    pub fn prime_schemas(&self, schemas: &[ProductSchema]) -> bool {
        self.schemas.set(index_schemas(schemas)).is_ok()
    }

    pub async fn prime_customer_group(&self, name: &str, id: String) -> bool {
        let cell = memo_cell(&self.customer_groups, name).await;
        cell.set(id).is_ok()
    }

    /// 第一次呼叫時列出全部 schema 並建立索引，之後都從記憶體回應
    pub async fn schema(&self, key: &str) -> Result<Option<Arc<ProductSchema>>> {
        let index = self
            .schemas
            .get_or_try_init(|| async {
                tracing::debug!("📡 Listing all product types");
                let schemas = within(
                    "query all product types",
                    self.timeout,
                    self.client.query_all_product_schemas(),
                )
                .await?;
                tracing::info!("📚 Cached {} product types", schemas.len());
                Ok::<_, ImportError>(index_schemas(&schemas))
            })
            .await?;

        Ok(index.get(key).cloned())
    }

    /// get-or-create：依名稱查詢，不存在則建立，結果快取
    pub async fn customer_group_id(&self, name: &str) -> Result<String> {
        let cell = memo_cell(&self.customer_groups, name).await;
        let id = cell
            .get_or_try_init(|| async {
                let existing = within(
                    "query customer group",
                    self.timeout,
                    self.client.find_customer_group_by_name(name),
                )
                .await?;

                let group = match existing {
                    Some(group) => group,
                    None => {
                        tracing::info!("👥 Customer group '{}' not found, creating it", name);
                        within(
                            "create customer group",
                            self.timeout,
                            self.client.create_customer_group(name),
                        )
                        .await?
                    }
                };
                Ok::<_, ImportError>(group.id)
            })
            .await?;

        Ok(id.clone())
    }

    /// 只查詢不建立；找不到時回傳 None
    pub async fn channel_reference(&self, key: &str) -> Result<Option<Reference>> {
        let cell = memo_cell(&self.channels, key).await;
        let reference = cell
            .get_or_try_init(|| async {
                let found = within(
                    "query channel",
                    self.timeout,
                    self.client.find_channel_by_key(key),
                )
                .await?;
                if found.is_none() {
                    tracing::warn!("📺 Channel '{}' not found, prices will not be restricted", key);
                }
                Ok::<_, ImportError>(found)
            })
            .await?;

        Ok(reference.clone())
    }
}

/// 以名稱與 key 建索引；名稱與其他 schema 的 key 衝突時名稱優先
fn index_schemas(schemas: &[ProductSchema]) -> HashMap<String, Arc<ProductSchema>> {
    let mut index = HashMap::new();
    let shared: Vec<Arc<ProductSchema>> = schemas.iter().cloned().map(Arc::new).collect();

    for schema in &shared {
        index.insert(schema.name.clone(), Arc::clone(schema));
    }
    for schema in &shared {
        if let Some(key) = &schema.key {
            index
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(schema));
        }
    }
    index
}

async fn memo_cell<T>(table: &MemoTable<T>, key: &str) -> Arc<OnceCell<T>> {
    let mut cells = table.lock().await;
    Arc::clone(
        cells
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCatalog;

    fn schema(key: &str) -> ProductSchema {
        ProductSchema {
            id: format!("id-{}", key),
            key: Some(key.to_string()),
            name: key.to_string(),
            attributes: vec![],
        }
    }

    fn cache_over(catalog: &Arc<InMemoryCatalog>) -> ReferenceCache {
        ReferenceCache::new(catalog.clone(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_schema_listing_happens_once() {
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_schema(schema("shirt"))
                .with_schema(schema("shoe")),
        );
        let cache = cache_over(&catalog);

        assert_eq!(cache.schema("shirt").await.unwrap().unwrap().id, "id-shirt");
        assert_eq!(cache.schema("shoe").await.unwrap().unwrap().id, "id-shoe");
        assert!(cache.schema("hat").await.unwrap().is_none());
        assert_eq!(catalog.calls().schema_listings, 1);
    }

    #[tokio::test]
    async fn test_schema_found_by_name_and_by_key() {
        let catalog = Arc::new(InMemoryCatalog::new().with_schema(ProductSchema {
            id: "pt-main".to_string(),
            key: Some("main-key".to_string()),
            name: "main".to_string(),
            attributes: vec![],
        }));
        let cache = cache_over(&catalog);

        assert_eq!(cache.schema("main").await.unwrap().unwrap().id, "pt-main");
        assert_eq!(cache.schema("main-key").await.unwrap().unwrap().id, "pt-main");
        assert_eq!(catalog.calls().schema_listings, 1);
    }

    #[tokio::test]
    async fn test_schema_name_wins_over_other_schema_key() {
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_schema(ProductSchema {
                    id: "pt-a".to_string(),
                    key: Some("shirt".to_string()),
                    name: "legacy".to_string(),
                    attributes: vec![],
                })
                .with_schema(ProductSchema {
                    id: "pt-b".to_string(),
                    key: Some("shirt-v2".to_string()),
                    name: "shirt".to_string(),
                    attributes: vec![],
                }),
        );
        let cache = cache_over(&catalog);

        assert_eq!(cache.schema("shirt").await.unwrap().unwrap().id, "pt-b");
        assert_eq!(cache.schema("legacy").await.unwrap().unwrap().id, "pt-a");
    }

    #[tokio::test]
    async fn test_primed_schemas_skip_remote_listing() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let cache = cache_over(&catalog);

        assert!(cache.prime_schemas(&[schema("shirt")]));
        assert!(!cache.prime_schemas(&[schema("other")]));
        assert!(cache.schema("shirt").await.unwrap().is_some());
        assert_eq!(catalog.calls().schema_listings, 0);
    }

    #[tokio::test]
    async fn test_customer_group_get_or_create_is_idempotent() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let cache = cache_over(&catalog);

        let first = cache.customer_group_id("b2b").await.unwrap();
        let second = cache.customer_group_id("b2b").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.calls().customer_group_creates, 1);
        assert_eq!(catalog.calls().customer_group_queries, 1);
    }

    #[tokio::test]
    async fn test_existing_customer_group_is_not_created() {
        let catalog = Arc::new(InMemoryCatalog::new().with_customer_group("b2b", "cg-existing"));
        let cache = cache_over(&catalog);

        assert_eq!(cache.customer_group_id("b2b").await.unwrap(), "cg-existing");
        assert_eq!(catalog.calls().customer_group_creates, 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_lookups_issue_one_create() {
        let catalog = Arc::new(
            InMemoryCatalog::new().with_latency(Duration::from_millis(20)),
        );
        let cache = cache_over(&catalog);

        let (a, b, c) = tokio::join!(
            cache.customer_group_id("b2b"),
            cache.customer_group_id("b2b"),
            cache.customer_group_id("b2b")
        );

        assert_eq!(a.unwrap(), b.as_ref().unwrap().clone());
        assert_eq!(b.unwrap(), c.unwrap());
        assert_eq!(catalog.calls().customer_group_queries, 1);
        assert_eq!(catalog.calls().customer_group_creates, 1);
    }

    #[tokio::test]
    async fn test_missing_channel_is_cached_as_none() {
        let catalog = Arc::new(InMemoryCatalog::new().with_channel("outlet", "ch-1"));
        let cache = cache_over(&catalog);

        assert_eq!(
            cache.channel_reference("outlet").await.unwrap(),
            Some(Reference::channel("ch-1"))
        );
        assert!(cache.channel_reference("nowhere").await.unwrap().is_none());
        assert!(cache.channel_reference("nowhere").await.unwrap().is_none());
        assert_eq!(catalog.calls().channel_queries, 2);
    }

    #[tokio::test]
    async fn test_prime_customer_group_avoids_remote_calls() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let cache = cache_over(&catalog);

        assert!(cache.prime_customer_group("b2b", "cg-42".to_string()).await);
        assert_eq!(cache.customer_group_id("b2b").await.unwrap(), "cg-42");
        assert_eq!(catalog.calls().customer_group_queries, 0);
    }

    #[tokio::test]
    async fn test_slow_remote_call_times_out() {
        let catalog = Arc::new(
            InMemoryCatalog::new().with_latency(Duration::from_millis(200)),
        );
        let cache = ReferenceCache::new(catalog.clone(), Duration::from_millis(10));

        let outcome = cache.schema("shirt").await;
        assert!(matches!(outcome, Err(ImportError::Timeout { .. })));
    }
}
