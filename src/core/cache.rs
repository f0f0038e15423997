use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Run-scoped memo shared between concurrent producers.
///
/// Lives for a single pipeline run; nothing here outlives the process.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.lock().await;
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!(?key, "Cache HIT");
        } else {
            debug!(?key, "Cache MISS");
        }
        value
    }

    pub async fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock().await;
        debug!(?key, "Cache PUT");
        cache.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = Cache::<String, Vec<f64>>::new();

        assert!(cache.get(&"https://cbu.uz/common/json/".to_string()).await.is_none());

        cache
            .put("https://cbu.uz/common/json/".to_string(), vec![12850.5])
            .await;

        assert_eq!(
            cache.get(&"https://cbu.uz/common/json/".to_string()).await,
            Some(vec![12850.5])
        );
        assert!(cache.get(&"other".to_string()).await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_clones_share_entries() {
        let cache = Cache::<String, u32>::new();
        let shared = cache.clone();

        shared.put("usd".to_string(), 1).await;
        assert_eq!(cache.get(&"usd".to_string()).await, Some(1));
    }
}
