use crate::utils::error::{ImportError, Result};
use std::future::Future;
use std::time::Duration;

/// 以明確的逾時等待遠端呼叫；逾時視為該呼叫失敗
pub async fn within<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!("⏱️ {} timed out after {:?}", operation, limit);
            Err(ImportError::Timeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            })
        }
    }
}
