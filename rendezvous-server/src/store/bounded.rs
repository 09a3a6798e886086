use rendezvous_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs a store call under `limit`. An expired call surfaces as
/// `Error::StoreTimeout` and is not retried.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Store call '{}' exceeded {:?}", op, limit);
            Err(Error::StoreTimeout(op))
        }
    }
}
