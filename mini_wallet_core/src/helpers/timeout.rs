use anyhow::{Result, anyhow};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Await a collaborator call, failing it once `limit` has elapsed.
pub async fn bounded<T, F>(limit: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("{} timed out after {:?}", what, limit);
            Err(anyhow!("{} timed out after {}s", what, limit.as_secs_f32()))
        }
    }
}
