use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retries an async operation with a bounded attempt count and a fixed
/// delay between attempts.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `max_attempts`: Total number of runs before giving up
/// - `delay`: Pause between attempts
///
/// # Returns
/// Either the first successful result or the last error.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    max_attempts: usize,
    delay: Duration,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(err);
                }
                warn!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, max_attempts, err
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(42)
            },
            3,
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(anyhow!("transient"))
                    } else {
                        Ok(7)
                    }
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow!("down")) }
            },
            3,
            Duration::from_millis(1),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
