use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::RpcConfig;
use crate::error::FetchError;

const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Timeout, retry and concurrency policy shared by every balance RPC call.
#[derive(Debug, Clone)]
pub struct RpcPolicy {
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    limiter: Arc<Semaphore>,
}

impl RpcPolicy {
    pub fn new(config: &RpcConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        }
    }

    /// Run one RPC call under the policy.
    ///
    /// Each attempt holds a concurrency permit and is bounded by the timeout.
    /// Retryable failures back off exponentially; the last error is returned
    /// once attempts run out.
    pub async fn call<F, Fut, T>(
        &self,
        network: &str,
        method: &'static str,
        mut f: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 0;

        loop {
            let result = {
                let _permit = self
                    .limiter
                    .acquire()
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                match tokio::time::timeout(self.timeout, f()).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(self.timeout)),
                }
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        network,
                        method,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "RPC call failed, retrying..."
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, MAX_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
