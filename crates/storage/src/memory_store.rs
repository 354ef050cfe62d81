//! In-memory TTL cache using DashMap, with collapsed concurrent loads

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
	value: V,
	stored_at: Instant,
}

impl<V> CacheEntry<V> {
	fn is_expired(&self, ttl: Duration) -> bool {
		self.stored_at.elapsed() > ttl
	}
}

/// Short-lived cache of values keyed by `K`
///
/// Concurrent misses on the same key wait for a single load. Failed loads
/// are not cached; the next caller loads again.
#[derive(Clone)]
pub struct TtlCache<K, V>
where
	K: Eq + Hash,
{
	name: &'static str,
	entries: Arc<DashMap<K, CacheEntry<V>>>,
	loads: Arc<DashMap<K, Arc<Mutex<()>>>>,
	ttl: Duration,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V>
where
	K: Eq + Hash,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TtlCache")
			.field("name", &self.name)
			.field("entries", &self.entries.len())
			.field("ttl", &self.ttl)
			.finish()
	}
}

impl<K, V> TtlCache<K, V>
where
	K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
{
	/// Create a cache; `name` only appears in logs
	pub fn new(name: &'static str, ttl: Duration) -> Self {
		Self {
			name,
			entries: Arc::new(DashMap::new()),
			loads: Arc::new(DashMap::new()),
			ttl,
		}
	}

	/// Fresh value for `key`, if any
	pub fn get(&self, key: &K) -> Option<V> {
		self.entries.remove_if(key, |_, entry| {
			let is_expired = entry.is_expired(self.ttl);
			if is_expired {
				debug!(
					"{} cache entry {:?} expired (age: {:?})",
					self.name,
					key,
					entry.stored_at.elapsed()
				);
			}
			is_expired
		});

		self.entries.get(key).map(|entry| entry.value.clone())
	}

	pub fn insert(&self, key: K, value: V) {
		self.entries.insert(
			key,
			CacheEntry {
				value,
				stored_at: Instant::now(),
			},
		);
	}

	/// Cached value for `key`, loading it with `load` on a miss
	pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<V, E>>,
	{
		if let Some(value) = self.get(&key) {
			debug!("{} cache hit for {:?}", self.name, key);
			return Ok(value);
		}

		let gate = self
			.loads
			.entry(key.clone())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();

		let result = {
			let _load = gate.lock().await;

			// Filled by the caller we waited on
			if let Some(value) = self.get(&key) {
				debug!("{} cache filled by concurrent load for {:?}", self.name, key);
				Ok(value)
			} else {
				debug!("{} cache miss for {:?}, loading", self.name, key);
				let loaded = load().await;
				if let Ok(value) = &loaded {
					self.insert(key.clone(), value.clone());
				}
				loaded
			}
		};

		drop(gate);
		self.loads
			.remove_if(&key, |_, gate| Arc::strong_count(gate) == 1);

		result
	}

	/// Remove every expired entry
	pub fn cleanup_expired(&self) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
		let removed = before.saturating_sub(self.entries.len());

		if removed > 0 {
			debug!("Cleaned up {} expired {} cache entries", removed, self.name);
		}
		removed
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[tokio::test]
	async fn test_value_expires_after_ttl() {
		let cache = TtlCache::new("test", Duration::from_millis(30));
		cache.insert("rooms", 1);
		assert_eq!(cache.get(&"rooms"), Some(1));

		tokio::time::sleep(Duration::from_millis(60)).await;
		assert_eq!(cache.get(&"rooms"), None);
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn test_concurrent_misses_collapse_into_one_load() {
		let cache = TtlCache::new("test", Duration::from_secs(60));
		let loads = Arc::new(AtomicUsize::new(0));

		let tasks = (0..10).map(|_| {
			let cache = cache.clone();
			let loads = loads.clone();
			async move {
				cache
					.get_or_try_insert_with("finishing".to_string(), || async move {
						loads.fetch_add(1, Ordering::SeqCst);
						tokio::time::sleep(Duration::from_millis(30)).await;
						Ok::<_, String>(vec!["turnkey".to_string()])
					})
					.await
			}
		});

		let results = futures::future::join_all(tasks).await;
		assert!(results
			.iter()
			.all(|r| r == &Ok(vec!["turnkey".to_string()])));
		assert_eq!(loads.load(Ordering::SeqCst), 1);
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_load_is_not_cached() {
		let cache: TtlCache<&str, u32> = TtlCache::new("test", Duration::from_secs(60));

		let first = cache
			.get_or_try_insert_with("k", || async { Err::<u32, _>("upstream down") })
			.await;
		assert_eq!(first, Err("upstream down"));
		assert!(cache.get(&"k").is_none());

		let second = cache
			.get_or_try_insert_with("k", || async { Ok::<_, &str>(7) })
			.await;
		assert_eq!(second, Ok(7));
		assert_eq!(cache.get(&"k"), Some(7));
	}

	#[tokio::test]
	async fn test_cleanup_expired() {
		let cache = TtlCache::new("test", Duration::from_millis(10));
		cache.insert(1, "a");
		cache.insert(2, "b");
		tokio::time::sleep(Duration::from_millis(30)).await;
		assert_eq!(cache.cleanup_expired(), 2);
	}
}
