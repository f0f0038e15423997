//! Pure parsers for fetched pages and feeds.
//!
//! Nothing here does I/O. Parsing is CPU-bound, so async callers go through
//! [`offload`] to keep it off the runtime's I/O workers.

pub mod deposits;
pub mod feed;
pub mod gold;
pub mod html;
pub mod press;
pub mod tables;

use tracing::warn;

/// Runs a parser on the blocking pool. A panicking parser reads as `None`.
pub async fn offload<T, F>(label: &'static str, parse: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(parse).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(parser = label, error = %e, "Parser task failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offload_returns_value() {
        assert_eq!(offload("sum", || 2 + 2).await, Some(4));
    }

    #[tokio::test]
    async fn test_offload_isolates_panics() {
        let result: Option<u32> = offload("boom", || panic!("bad markup")).await;
        assert_eq!(result, None);
    }
}
