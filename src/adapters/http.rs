use crate::domain::model::{
    CreationRequest, CustomerGroup, Image, PriceDraft, ProductSchema, Reference, VariantDraft,
};
use crate::domain::ports::CatalogClient;
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

const PAGE_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
struct PagedQueryResponse<T> {
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    total: Option<usize>,
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

/// commercetools 風格的 REST 商品目錄客戶端
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpCatalogClient {
    pub fn new(api_url: &str, project_key: &str, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/{}", api_url.trim_end_matches('/'), project_key),
            auth_token,
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn expect_success(operation: &str, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("📡 {}: response status {}", operation, status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("❌ {} failed with status {}: {}", operation, status, body);
        Err(ImportError::RemoteError {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn query_page<T: DeserializeOwned>(
        &self,
        operation: &str,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<PagedQueryResponse<T>> {
        let request = self.authorized(self.client.get(self.endpoint(resource)).query(params));
        let response = Self::expect_success(operation, request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn find_by_predicate<T: DeserializeOwned>(
        &self,
        operation: &str,
        resource: &str,
        predicate: String,
    ) -> Result<Option<T>> {
        let page: PagedQueryResponse<T> = self
            .query_page(
                operation,
                resource,
                &[("where", predicate), ("limit", "1".to_string())],
            )
            .await?;
        Ok(page.results.into_iter().next())
    }

    async fn create<T: DeserializeOwned>(
        &self,
        operation: &str,
        resource: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let request = self.authorized(self.client.post(self.endpoint(resource)).json(body));
        let response = Self::expect_success(operation, request.send().await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn query_all_product_schemas(&self) -> Result<Vec<ProductSchema>> {
        let mut schemas = Vec::new();
        let mut offset = 0;

        loop {
            let page: PagedQueryResponse<ProductSchema> = self
                .query_page(
                    "query product types",
                    "product-types",
                    &[
                        ("limit", PAGE_SIZE.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;

            let fetched = page.results.len();
            schemas.extend(page.results);
            offset = page.offset + fetched;
            tracing::debug!("📡 Fetched {} product types (offset {})", fetched, offset);

            let exhausted = match page.total {
                Some(total) => offset >= total,
                None => fetched < PAGE_SIZE,
            };
            if fetched == 0 || exhausted {
                break;
            }
        }

        Ok(schemas)
    }

    async fn find_customer_group_by_name(&self, name: &str) -> Result<Option<CustomerGroup>> {
        self.find_by_predicate(
            "query customer group",
            "customer-groups",
            equals_predicate("name", name),
        )
        .await
    }

    async fn create_customer_group(&self, name: &str) -> Result<CustomerGroup> {
        self.create(
            "create customer group",
            "customer-groups",
            &json!({ "groupName": name, "key": name }),
        )
        .await
    }

    async fn find_channel_by_key(&self, key: &str) -> Result<Option<Reference>> {
        let found: Option<IdResponse> = self
            .find_by_predicate("query channel", "channels", equals_predicate("key", key))
            .await?;
        Ok(found.map(|channel| Reference::channel(channel.id)))
    }

    async fn create_product(&self, request: &CreationRequest) -> Result<String> {
        let created: IdResponse = self
            .create("create product", "products", &product_payload(request))
            .await?;
        Ok(created.id)
    }
}

/// `field="value"` 查詢條件；值中的 `\` 與 `"` 需跳脫
fn equals_predicate(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}=\"{}\"", field, escaped)
}

/// 第一個 variant 作為 masterVariant，其餘放入 variants
pub fn product_payload(request: &CreationRequest) -> serde_json::Value {
    let mut variants = request.variants.iter().map(variant_payload);
    let master = variants.next();

    let mut body = json!({
        "productType": request.product_type,
        "name": request.name,
        "slug": request.slug,
        "variants": variants.collect::<Vec<_>>(),
    });
    if let Some(master) = master {
        body["masterVariant"] = master;
    }
    body
}

fn variant_payload(variant: &VariantDraft) -> serde_json::Value {
    let mut body = json!({
        "prices": variant.prices.iter().map(price_payload).collect::<Vec<_>>(),
        "images": variant.images.iter().map(image_payload).collect::<Vec<_>>(),
        "attributes": variant.attributes,
    });
    if let Some(sku) = &variant.sku {
        body["sku"] = json!(sku);
    }
    body
}

fn price_payload(price: &PriceDraft) -> serde_json::Value {
    let mut body = json!({
        "value": {
            "currencyCode": price.currency_code,
            "centAmount": price.cent_amount,
        }
    });
    if let Some(country) = &price.country_code {
        body["country"] = json!(country);
    }
    if let Some(group) = &price.customer_group {
        body["customerGroup"] = json!(group);
    }
    if let Some(channel) = &price.channel {
        body["channel"] = json!(channel);
    }
    body
}

fn image_payload(image: &Image) -> serde_json::Value {
    json!({
        "url": image.url,
        "dimensions": { "w": image.width, "h": image.height },
    })
}
