use crate::domain::model::CreationRequest;
use crate::domain::ports::CatalogClient;
use crate::utils::deadline;
use crate::utils::error::{ImportError, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// 同時送出整批建立請求，全部完成後才判定結果
pub struct ProductWriter {
    client: Arc<dyn CatalogClient>,
    timeout: Duration,
    dry_run: bool,
}

impl ProductWriter {
    pub fn new(client: Arc<dyn CatalogClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 任一請求失敗時，其餘請求仍會跑完，最後回傳 ChunkWriteFailed
    pub async fn write(&self, requests: &[CreationRequest]) -> Result<usize> {
        if requests.is_empty() {
            return Ok(0);
        }

        if self.dry_run {
            for request in requests {
                tracing::info!(
                    "🧪 Dry run: would create product {} with {} variants",
                    product_label(request),
                    request.variants.len()
                );
            }
            return Ok(0);
        }

        let outcomes = join_all(requests.iter().map(|request| {
            deadline::within("create product", self.timeout, self.client.create_product(request))
        }))
        .await;

        let total = outcomes.len();
        let mut failed = 0;
        let mut first_error: Option<ImportError> = None;

        for (request, outcome) in requests.iter().zip(outcomes) {
            match outcome {
                Ok(id) => tracing::debug!("🆕 Created product {} as {}", product_label(request), id),
                Err(e) => {
                    tracing::error!("❌ Failed to create product {}: {}", product_label(request), e);
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(total),
            Some(e) => Err(ImportError::ChunkWriteFailed {
                failed,
                total,
                first_error: e.to_string(),
            }),
        }
    }
}

fn product_label(request: &CreationRequest) -> String {
    let sku = request
        .variants
        .first()
        .and_then(|variant| variant.sku.as_deref())
        .unwrap_or("<no sku>");
    let slug = request.slug.values().next().map(String::as_str).unwrap_or("<no slug>");
    format!("'{}' (sku {})", slug, sku)
}
