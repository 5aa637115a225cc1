use crate::domain::model::{CreationRequest, CustomerGroup, ProductSchema, Reference};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 遠端商品目錄服務的窄介面；逾時由呼叫端以 `utils::deadline::within` 控制
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// 分頁取回全部 product type
    async fn query_all_product_schemas(&self) -> Result<Vec<ProductSchema>>;

    async fn find_customer_group_by_name(&self, name: &str) -> Result<Option<CustomerGroup>>;

    async fn create_customer_group(&self, name: &str) -> Result<CustomerGroup>;

    async fn find_channel_by_key(&self, key: &str) -> Result<Option<Reference>>;

    /// 回傳新建商品的 id
    async fn create_product(&self, request: &CreationRequest) -> Result<String>;
}
