//! Bounded store calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{SchedulingError, StoreError};

/// Awaits `call` for at most `timeout`.
///
/// An elapsed timeout surfaces as the retryable
/// [`SchedulingError::ServiceUnavailable`]; store failures go through the
/// regular [`StoreError`] mapping.
pub async fn bounded<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T, SchedulingError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(SchedulingError::from),
        Err(_) => {
            warn!(
                operation = operation,
                timeout_ms = timeout.as_millis() as u64,
                "Store call timed out"
            );
            Err(SchedulingError::ServiceUnavailable(format!(
                "{operation} timed out, please retry"
            )))
        }
    }
}
