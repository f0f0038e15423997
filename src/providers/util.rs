use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Base delay; doubles after every failed attempt
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let mut attempt = 1;
    let mut delay = delay_ms;
    loop {
        match operation().await.map_err(Into::into) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!("Attempt {}/{} failed: {}. Retrying...", attempt, retries, err);
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = delay.saturating_mul(2);
            }
        }
    }
}

/// Runs `fut` under `deadline`. `None` when it did not finish in time.
pub async fn with_deadline<T>(
    label: &str,
    deadline: Duration,
    fut: impl Future<Output = T>,
) -> Option<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(
                task = label,
                ?deadline,
                "Task hit its deadline, keeping previous value"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_with_retry_succeeds_after_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, Error> = with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(anyhow::anyhow!("transient"))
                    } else {
                        Ok(7)
                    }
                }
            },
            3,
            1,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), Error> = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow::anyhow!("down")) }
            },
            2,
            1,
        )
        .await;
        assert_eq!(result.unwrap_err().to_string(), "down");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            1
        };
        assert_eq!(with_deadline("slow", Duration::from_secs(1), slow).await, None);
        assert_eq!(with_deadline("fast", Duration::from_secs(1), async { 2 }).await, Some(2));
    }
}
