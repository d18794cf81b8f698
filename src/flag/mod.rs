mod store;
mod task;

pub use store::{FlagStore, RedisFlagStore};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use task::Task;
use tokio::sync::Mutex;

/// How long a cached flag value stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(5);
/// Upper bound for a primary store read or write.
const STORE_TIMEOUT: Duration = Duration::from_millis(500);
/// Upper bound for the pre-write reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// On-disk fallback document.
#[derive(Debug, Serialize, Deserialize)]
struct LocalState {
    #[serde(default = "default_enabled")]
    bot_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug)]
struct Cached {
    value: bool,
    refreshed: Option<Instant>,
}

/// The shared "bot enabled" flag, mediating between the primary store, a
/// short-lived in-memory copy and a local fallback file. Reads and writes
/// never error and never block past the store timeout; when every tier is
/// down the flag reads as enabled.
pub struct FlagCache {
    store: Arc<dyn FlagStore>,
    ttl: Duration,
    fallback: PathBuf,
    cached: Mutex<Cached>,
    /// Most recently scheduled fallback write. Replaced on every schedule so
    /// rapid toggles coalesce into the newest value.
    pending: Mutex<Option<Task>>,
}

impl FlagCache {
    pub fn new(store: Arc<dyn FlagStore>, fallback: PathBuf) -> Self {
        Self::with_ttl(store, fallback, CACHE_TTL)
    }

    fn with_ttl(store: Arc<dyn FlagStore>, fallback: PathBuf, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            fallback,
            cached: Mutex::new(Cached {
                value: true,
                refreshed: None,
            }),
            pending: Mutex::new(None),
        }
    }

    /// Answers whether the bot is enabled.
    pub async fn read(&self) -> bool {
        {
            let cached = self.cached.lock().await;
            if let Some(refreshed) = cached.refreshed {
                if refreshed.elapsed() < self.ttl {
                    return cached.value;
                }
            }
        }

        let value = match tokio::time::timeout(STORE_TIMEOUT, self.store.get()).await {
            Ok(Ok(stored)) => stored
                .map(|raw| raw.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            Ok(Err(e)) => {
                log::warn!("Flag store read failed, using fallback: {}", e);
                self.read_fallback().await
            }
            Err(_) => {
                log::warn!("Flag store read timed out, using fallback");
                self.read_fallback().await
            }
        };

        // Cache fallback values too, so a persistent outage doesn't re-pay
        // the store timeout on every read within the TTL window.
        let mut cached = self.cached.lock().await;
        cached.value = value;
        cached.refreshed = Some(Instant::now());
        value
    }

    /// Sets the flag. The primary store is only attempted when a quick
    /// reachability probe passes; otherwise, or when the store write fails,
    /// the value goes to the local fallback file in the background. The
    /// in-memory copy is refreshed before returning either way, so reads
    /// inside the TTL window already see the new value.
    pub async fn write(&self, value: bool) {
        let stored = if self.store.probe(PROBE_TIMEOUT).await {
            match tokio::time::timeout(STORE_TIMEOUT, self.store.set(value)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    log::warn!("Flag store write failed: {}", e);
                    false
                }
                Err(_) => {
                    log::warn!("Flag store write timed out");
                    false
                }
            }
        } else {
            false
        };
        if !stored {
            self.schedule_fallback_write(value).await;
        }

        let mut cached = self.cached.lock().await;
        cached.value = value;
        cached.refreshed = Some(Instant::now());
    }

    async fn read_fallback(&self) -> bool {
        match tokio::fs::read(&self.fallback).await {
            Ok(raw) => match serde_json::from_slice::<LocalState>(&raw) {
                Ok(state) => state.bot_enabled,
                Err(e) => {
                    log::warn!(
                        "Fallback flag file {} is corrupt: {}",
                        self.fallback.display(),
                        e
                    );
                    true
                }
            },
            // A missing file simply means nothing was ever persisted.
            Err(_) => true,
        }
    }

    async fn schedule_fallback_write(&self, value: bool) {
        let path = self.fallback.clone();
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.cancel().await;
        }
        *pending = Some(Task::spawn(async move {
            if let Err(e) = write_local_flag(&path, value).await {
                log::warn!("Failed to persist flag to {}: {}", path.display(), e);
            }
        }));
    }

    /// Waits for a scheduled fallback write to finish.
    #[cfg(test)]
    async fn flush(&self) {
        if let Some(pending) = self.pending.lock().await.take() {
            pending.join().await;
        }
    }
}

async fn write_local_flag(path: &Path, value: bool) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    let raw = serde_json::to_vec(&LocalState { bot_enabled: value })?;
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(&raw).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockStore {
        value: StdMutex<Option<String>>,
        reachable: AtomicBool,
        fail: AtomicBool,
        hang: AtomicBool,
        get_calls: AtomicUsize,
        set_calls: AtomicUsize,
    }

    impl MockStore {
        fn holding(value: &str) -> Arc<Self> {
            let store = Self::default();
            *store.value.lock().unwrap() = Some(value.to_string());
            store.reachable.store(true, Ordering::SeqCst);
            Arc::new(store)
        }

        fn empty() -> Arc<Self> {
            let store = Self::default();
            store.reachable.store(true, Ordering::SeqCst);
            Arc::new(store)
        }

        fn failing() -> Arc<Self> {
            let store = Self::default();
            store.fail.store(true, Ordering::SeqCst);
            Arc::new(store)
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn hanging() -> Arc<Self> {
            let store = Self::default();
            store.hang.store(true, Ordering::SeqCst);
            Arc::new(store)
        }
    }

    #[async_trait]
    impl FlagStore for MockStore {
        async fn get(&self) -> Result<Option<String>> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if self.hang.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store down");
            }
            Ok(self.value.lock().unwrap().clone())
        }

        async fn set(&self, value: bool) -> Result<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store down");
            }
            *self.value.lock().unwrap() =
                Some(if value { "true" } else { "false" }.to_string());
            Ok(())
        }

        async fn probe(&self, _timeout: Duration) -> bool {
            self.reachable.load(Ordering::SeqCst)
        }
    }

    fn cache_at(store: &Arc<MockStore>, dir: &tempfile::TempDir) -> (FlagCache, PathBuf) {
        let path = dir.path().join("bot_state.json");
        let cache = FlagCache::new(Arc::clone(store) as Arc<dyn FlagStore>, path.clone());
        (cache, path)
    }

    fn read_file(path: &Path) -> bool {
        let raw = std::fs::read(path).unwrap();
        serde_json::from_slice::<LocalState>(&raw).unwrap().bot_enabled
    }

    #[tokio::test]
    async fn reads_within_ttl_hit_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::holding("false");
        let (cache, _path) = cache_at(&store, &dir);

        assert!(!cache.read().await);
        assert!(!cache.read().await);
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_cache_refreshes_from_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::holding("false");
        let cache = FlagCache::with_ttl(
            Arc::clone(&store) as Arc<dyn FlagStore>,
            dir.path().join("bot_state.json"),
            Duration::ZERO,
        );

        assert!(!cache.read().await);
        *store.value.lock().unwrap() = Some("true".to_string());
        assert!(cache.read().await);
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn absent_value_means_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::empty();
        let (cache, _path) = cache_at(&store, &dir);

        assert!(cache.read().await);
    }

    #[tokio::test]
    async fn falls_back_to_local_file_when_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::failing();
        let (cache, path) = cache_at(&store, &dir);
        std::fs::write(&path, r#"{"bot_enabled": false}"#).unwrap();

        assert!(!cache.read().await);
        // The fallback value was cached; the next read skips the store.
        assert!(!cache.read().await);
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn defaults_to_enabled_when_every_tier_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::failing();
        let (cache, _path) = cache_at(&store, &dir);

        assert!(cache.read().await);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_store_cannot_stall_readers() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::hanging();
        let (cache, _path) = cache_at(&store, &dir);

        let value = tokio::time::timeout(Duration::from_secs(1), cache.read())
            .await
            .expect("read must stay bounded");
        assert!(value);
    }

    #[tokio::test]
    async fn write_refreshes_cache_before_the_file_lands() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::unreachable();
        let (cache, _path) = cache_at(&store, &dir);

        cache.write(false).await;
        assert!(!cache.read().await);
        // Served from cache, the dead store was never queried.
        assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rapid_writes_coalesce_to_the_last_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::unreachable();
        let (cache, path) = cache_at(&store, &dir);

        cache.write(false).await;
        cache.write(true).await;
        cache.flush().await;

        assert!(read_file(&path));
        assert_eq!(store.set_calls.load(Ordering::SeqCst), 0);
        assert!(cache.read().await);
    }

    #[tokio::test]
    async fn reachable_store_takes_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::holding("true");
        let (cache, path) = cache_at(&store, &dir);

        cache.write(false).await;
        assert_eq!(store.set_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*store.value.lock().unwrap(), Some("false".to_string()));
        // No fallback write was scheduled.
        cache.flush().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn store_write_failure_degrades_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::holding("true");
        store.fail.store(true, Ordering::SeqCst);
        let (cache, path) = cache_at(&store, &dir);

        cache.write(false).await;
        cache.flush().await;

        assert_eq!(store.set_calls.load(Ordering::SeqCst), 1);
        assert!(!read_file(&path));
    }
}
