use crate::domain::model::{CreationRequest, CustomerGroup, ProductSchema, Reference};
use crate::domain::ports::CatalogClient;
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// 各遠端操作的呼叫次數快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub schema_listings: usize,
    pub customer_group_queries: usize,
    pub customer_group_creates: usize,
    pub channel_queries: usize,
    pub product_creates: usize,
}

#[derive(Default)]
struct Counters {
    schema_listings: AtomicUsize,
    customer_group_queries: AtomicUsize,
    customer_group_creates: AtomicUsize,
    channel_queries: AtomicUsize,
    product_creates: AtomicUsize,
}

/// 記憶體內的商品目錄，實作與 HTTP 客戶端相同的介面
#[derive(Default)]
pub struct InMemoryCatalog {
    schemas: Vec<ProductSchema>,
    channels: HashMap<String, Reference>,
    customer_groups: Mutex<Vec<CustomerGroup>>,
    products: Mutex<Vec<CreationRequest>>,
    failing_skus: HashSet<String>,
    latency: Option<Duration>,
    counters: Counters,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: ProductSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn with_channel(mut self, key: &str, id: &str) -> Self {
        self.channels.insert(key.to_string(), Reference::channel(id));
        self
    }

    pub fn with_customer_group(self, name: &str, id: &str) -> Self {
        if let Ok(mut groups) = self.customer_groups.lock() {
            groups.push(CustomerGroup {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
        self
    }

    /// 含此 sku 的商品建立請求會以 400 失敗
    pub fn failing_on_sku(mut self, sku: &str) -> Self {
        self.failing_skus.insert(sku.to_string());
        self
    }

    /// 每個遠端呼叫前的人工延遲
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            schema_listings: self.counters.schema_listings.load(Ordering::SeqCst),
            customer_group_queries: self.counters.customer_group_queries.load(Ordering::SeqCst),
            customer_group_creates: self.counters.customer_group_creates.load(Ordering::SeqCst),
            channel_queries: self.counters.channel_queries.load(Ordering::SeqCst),
            product_creates: self.counters.product_creates.load(Ordering::SeqCst),
        }
    }

    pub fn created_products(&self) -> Vec<CreationRequest> {
        self.products
            .lock()
            .map(|products| products.clone())
            .unwrap_or_default()
    }

    pub fn customer_groups(&self) -> Vec<CustomerGroup> {
        self.customer_groups
            .lock()
            .map(|groups| groups.clone())
            .unwrap_or_default()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn poisoned(operation: &str) -> ImportError {
    ImportError::RemoteError {
        operation: operation.to_string(),
        status: 500,
        body: "in-memory catalog lock poisoned".to_string(),
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn query_all_product_schemas(&self) -> Result<Vec<ProductSchema>> {
        self.counters.schema_listings.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.schemas.clone())
    }

    async fn find_customer_group_by_name(&self, name: &str) -> Result<Option<CustomerGroup>> {
        self.counters
            .customer_group_queries
            .fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let groups = self
            .customer_groups
            .lock()
            .map_err(|_| poisoned("query customer group"))?;
        Ok(groups.iter().find(|g| g.name == name).cloned())
    }

    async fn create_customer_group(&self, name: &str) -> Result<CustomerGroup> {
        self.counters
            .customer_group_creates
            .fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let mut groups = self
            .customer_groups
            .lock()
            .map_err(|_| poisoned("create customer group"))?;
        let group = CustomerGroup {
            id: format!("cg-{}", groups.len() + 1),
            name: name.to_string(),
        };
        groups.push(group.clone());
        Ok(group)
    }

    async fn find_channel_by_key(&self, key: &str) -> Result<Option<Reference>> {
        self.counters.channel_queries.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.channels.get(key).cloned())
    }

    async fn create_product(&self, request: &CreationRequest) -> Result<String> {
        self.counters.product_creates.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let failing = request
            .variants
            .iter()
            .filter_map(|v| v.sku.as_deref())
            .find(|sku| self.failing_skus.contains(*sku));
        if let Some(sku) = failing {
            return Err(ImportError::RemoteError {
                operation: "create product".to_string(),
                status: 400,
                body: format!("duplicate sku {}", sku),
            });
        }

        let mut products = self
            .products
            .lock()
            .map_err(|_| poisoned("create product"))?;
        products.push(request.clone());
        Ok(format!("product-{}", products.len()))
    }
}
