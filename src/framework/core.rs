//! # Core Batching Loader
//!
//! This module defines the generic building blocks of the loader.
//!
//! ## Key Types
//!
//! - [`BatchFetch`]: The trait that every bulk lookup strategy must implement.
//! - [`BatchLoader`]: The loader task that groups keys into batches.
//! - [`LoaderClient`]: The cloneable client for requesting keys.
//! - [`LoaderError`]: Errors delivered to callers (e.g., Closed, Fetch).

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION (Bulk fetch strategy and its result)
// =============================================================================

/// Trait that any bulk lookup strategy must implement to be driven by a [`BatchLoader`].
///
/// # Architecture Note
/// The loader only knows how to *group* keys. What a key means and how a batch of
/// keys is resolved is entirely up to the implementor, so the same loader task drives
/// the user-state fan-out in production and a recording mock in tests.
///
/// The associated types pin the key, value and error of one loader instance; a loader
/// for `String -> User` cannot be handed a fetcher that produces anything else.
#[async_trait]
pub trait BatchFetch: Send + Sync + 'static {
    /// The cache and coalescing key. Uniqueness is plain `Eq`.
    type Key: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// The resolved value. Cloned once per waiter and once into the cache.
    type Value: Clone + Send + Sync + 'static;

    /// The per-key error. Cloned to every waiter of the failing key.
    type Error: std::error::Error + Clone + Send + Sync + 'static;

    /// Resolves one batch of distinct keys.
    ///
    /// Results are matched to keys through the returned [`Batch`] maps, never by
    /// position. Keys absent from both maps resolve to `Ok(None)`; entries for keys
    /// that were not requested are ignored.
    async fn fetch(&self, keys: Vec<Self::Key>) -> Batch<Self::Key, Self::Value, Self::Error>;
}

/// Result of one bulk fetch, keyed by the requested key.
#[derive(Debug, Clone)]
pub struct Batch<K, V, E> {
    pub values: HashMap<K, V>,
    pub errors: HashMap<K, E>,
}

impl<K, V, E> Default for Batch<K, V, E> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            errors: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V, E> Batch<K, V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_value(&mut self, key: K, value: V) {
        self.values.insert(key, value);
    }

    pub fn insert_error(&mut self, key: K, error: E) {
        self.errors.insert(key, error);
    }

    /// Folds another partial batch into this one. Values win over errors for the
    /// same key, since a later strategy may have resolved what an earlier one failed.
    pub fn merge(&mut self, other: Batch<K, V, E>) {
        for (key, error) in other.errors {
            if !self.values.contains_key(&key) {
                self.errors.insert(key, error);
            }
        }
        for (key, value) in other.values {
            self.errors.remove(&key);
            self.values.insert(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.errors.is_empty()
    }
}

// =============================================================================
// 2. MESSAGES, ERRORS & CONFIG
// =============================================================================

/// Errors delivered to loader callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoaderError<E> {
    #[error("Loader closed")]
    Closed,
    #[error("Loader dropped response channel")]
    Dropped,
    #[error("Fetch failed: {0}")]
    Fetch(E),
    #[error("Fetch aborted: {0}")]
    Aborted(String),
}

/// Result handed to every waiter of a key.
pub type LoadResult<V, E> = Result<Option<V>, LoaderError<E>>;

/// Type alias for the one-shot response channel used by the loader.
pub type Response<V, E> = oneshot::Sender<LoadResult<V, E>>;

/// Internal message type sent to the loader task.
pub enum LoaderRequest<F: BatchFetch> {
    Load {
        key: F::Key,
        respond_to: Response<F::Value, F::Error>,
    },
    Prime {
        key: F::Key,
        value: F::Value,
    },
    Clear {
        key: F::Key,
    },
}

/// Tuning for one loader instance.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Batch window, measured from the first key added to an empty batch.
    pub wait: Duration,
    /// Dispatch early once this many distinct keys are pending.
    pub max_batch: Option<usize>,
    /// Expiry for cached values. `None` keeps them until cleared.
    pub cache_ttl: Option<Duration>,
    /// Capacity of the request channel.
    pub buffer_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(250),
            max_batch: None,
            cache_ttl: None,
            buffer_size: 256,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Sent back to the loader task when a spawned fetch finishes.
struct Completion<F: BatchFetch> {
    keys: Vec<F::Key>,
    outcome: Result<Batch<F::Key, F::Value, F::Error>, String>,
}

// =============================================================================
// 3. THE LOADER TASK
// =============================================================================

/// The loader task that groups keys into batches.
///
/// # Architecture Note
/// This struct is the "Server" half of the loader. It owns the pending batch, the
/// waiter registries and the cache, and it is the only place those are touched, so
/// registering a waiter and cutting a batch are mutually exclusive without a lock.
///
/// The fetch itself never runs on this task: each batch is spawned, and its
/// [`Batch`] comes back as a completion message. A slow fetch therefore only delays
/// the keys inside it, never the next batch window.
///
/// # Key lifecycle
///
/// 1. **Cached**: answered immediately from the cache.
/// 2. **Pending**: the waiter joins the current batch; the first pending key starts
///    the window.
/// 3. **In flight**: the waiter joins the running fetch instead of starting another.
/// 4. **Resolved**: every waiter gets the same result; values are cached, errors and
///    misses are not.
pub struct BatchLoader<F: BatchFetch> {
    receiver: mpsc::Receiver<LoaderRequest<F>>,
    fetcher: Arc<F>,
    config: LoaderConfig,
    cache: HashMap<F::Key, CacheEntry<F::Value>>,
    pending_order: Vec<F::Key>,
    pending: HashMap<F::Key, Vec<Response<F::Value, F::Error>>>,
    in_flight: HashMap<F::Key, Vec<Response<F::Value, F::Error>>>,
    deadline: Option<Instant>,
    next_sweep: Option<Instant>,
}

impl<F: BatchFetch> BatchLoader<F> {
    /// Creates a new `BatchLoader` and its associated `LoaderClient`.
    ///
    /// The loader does nothing until [`BatchLoader::run`] is spawned.
    pub fn new(fetcher: F, config: LoaderConfig) -> (Self, LoaderClient<F>) {
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
        let next_sweep = config.cache_ttl.map(|ttl| Instant::now() + ttl);
        let loader = Self {
            receiver,
            fetcher: Arc::new(fetcher),
            config,
            cache: HashMap::new(),
            pending_order: Vec::new(),
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            deadline: None,
            next_sweep,
        };
        (loader, LoaderClient::new(sender))
    }

    /// Runs the loader's event loop until every client is dropped.
    ///
    /// On close the pending batch is flushed immediately and the loop waits for all
    /// in-flight fetches, so no waiter is left hanging.
    pub async fn run(mut self) {
        let fetcher_type = std::any::type_name::<F>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(fetcher_type, wait_ms = self.config.wait.as_millis() as u64, "Loader started");

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion<F>>();
        let mut open = true;

        loop {
            if !open && self.pending.is_empty() && self.in_flight.is_empty() {
                break;
            }

            let deadline = self.deadline;
            tokio::select! {
                msg = self.receiver.recv(), if open => match msg {
                    Some(request) => self.handle_request(request, &done_tx, fetcher_type),
                    None => {
                        open = false;
                        self.dispatch(&done_tx, fetcher_type);
                    }
                },
                Some(done) = done_rx.recv() => self.complete(done, fetcher_type),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.dispatch(&done_tx, fetcher_type);
                }
            }
        }

        info!(fetcher_type, cached = self.cache.len(), "Shutdown");
    }

    fn handle_request(
        &mut self,
        request: LoaderRequest<F>,
        done_tx: &mpsc::UnboundedSender<Completion<F>>,
        fetcher_type: &str,
    ) {
        self.sweep_expired(fetcher_type);
        match request {
            LoaderRequest::Load { key, respond_to } => {
                if let Some(value) = self.cached(&key) {
                    debug!(fetcher_type, %key, "Cache hit");
                    let _ = respond_to.send(Ok(Some(value)));
                    return;
                }

                if let Some(waiters) = self.in_flight.get_mut(&key) {
                    debug!(fetcher_type, %key, "Joined in-flight fetch");
                    waiters.push(respond_to);
                    return;
                }

                if let Some(waiters) = self.pending.get_mut(&key) {
                    waiters.push(respond_to);
                    return;
                }

                if self.pending.is_empty() {
                    self.deadline = Some(Instant::now() + self.config.wait);
                }
                self.pending_order.push(key.clone());
                self.pending.insert(key, vec![respond_to]);

                if self
                    .config
                    .max_batch
                    .is_some_and(|max| self.pending_order.len() >= max)
                {
                    self.dispatch(done_tx, fetcher_type);
                }
            }
            LoaderRequest::Prime { key, value } => {
                if self.cached(&key).is_none() {
                    debug!(fetcher_type, %key, "Primed");
                    self.cache
                        .insert(key, CacheEntry::new(value, self.config.cache_ttl));
                }
            }
            LoaderRequest::Clear { key } => {
                if self.cache.remove(&key).is_some() {
                    debug!(fetcher_type, %key, "Cleared");
                }
            }
        }
    }

    /// Drops every expired entry, at most once per TTL period.
    fn sweep_expired(&mut self, fetcher_type: &str) {
        let (Some(ttl), Some(due)) = (self.config.cache_ttl, self.next_sweep) else {
            return;
        };
        let now = Instant::now();
        if now < due {
            return;
        }

        let before = self.cache.len();
        self.cache.retain(|_, entry| !entry.is_expired());
        self.next_sweep = Some(now + ttl);

        let evicted = before - self.cache.len();
        if evicted > 0 {
            debug!(fetcher_type, evicted, "Swept expired entries");
        }
    }

    fn cached(&mut self, key: &F::Key) -> Option<F::Value> {
        match self.cache.get(key) {
            Some(entry) if entry.is_expired() => {
                self.cache.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Cuts the pending batch and spawns its fetch.
    fn dispatch(&mut self, done_tx: &mpsc::UnboundedSender<Completion<F>>, fetcher_type: &str) {
        self.deadline = None;
        if self.pending_order.is_empty() {
            return;
        }

        let keys = std::mem::take(&mut self.pending_order);
        for key in &keys {
            if let Some(waiters) = self.pending.remove(key) {
                self.in_flight.insert(key.clone(), waiters);
            }
        }
        info!(fetcher_type, batch_size = keys.len(), "Dispatching batch");

        let fetcher = Arc::clone(&self.fetcher);
        let done_tx = done_tx.clone();
        let batch_keys = keys.clone();
        tokio::spawn(async move {
            // Inner task so a panicking fetch still reports back.
            let fetch = tokio::spawn(async move { fetcher.fetch(batch_keys).await });
            let outcome = fetch.await.map_err(|e| e.to_string());
            let _ = done_tx.send(Completion { keys, outcome });
        });
    }

    fn complete(&mut self, done: Completion<F>, fetcher_type: &str) {
        self.sweep_expired(fetcher_type);
        let Completion { keys, outcome } = done;

        let mut batch = match outcome {
            Ok(batch) => batch,
            Err(reason) => {
                warn!(fetcher_type, batch_size = keys.len(), %reason, "Fetch aborted");
                for key in keys {
                    for waiter in self.in_flight.remove(&key).unwrap_or_default() {
                        let _ = waiter.send(Err(LoaderError::Aborted(reason.clone())));
                    }
                }
                return;
            }
        };

        let (mut resolved, mut failed, mut missing) = (0usize, 0usize, 0usize);
        for key in keys {
            let waiters = self.in_flight.remove(&key).unwrap_or_default();
            let result = if let Some(value) = batch.values.remove(&key) {
                resolved += 1;
                self.cache.insert(
                    key.clone(),
                    CacheEntry::new(value.clone(), self.config.cache_ttl),
                );
                Ok(Some(value))
            } else if let Some(error) = batch.errors.remove(&key) {
                failed += 1;
                Err(LoaderError::Fetch(error))
            } else {
                missing += 1;
                Ok(None)
            };

            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }

        let ignored = batch.values.len() + batch.errors.len();
        if ignored > 0 {
            debug!(fetcher_type, ignored, "Fetch returned entries for unrequested keys");
        }
        debug!(fetcher_type, resolved, failed, missing, "Batch complete");
    }
}

// =============================================================================
// 4. THE CLIENT
// =============================================================================

/// A cloneable handle for requesting keys from a [`BatchLoader`].
///
/// Holds only a sender, so cloning is cheap and clones can be shared across tasks.
pub struct LoaderClient<F: BatchFetch> {
    sender: mpsc::Sender<LoaderRequest<F>>,
}

impl<F: BatchFetch> Clone for LoaderClient<F> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<F: BatchFetch> LoaderClient<F> {
    pub fn new(sender: mpsc::Sender<LoaderRequest<F>>) -> Self {
        Self { sender }
    }

    /// Loads one key, waiting for the batch that contains it.
    pub async fn load(&self, key: F::Key) -> LoadResult<F::Value, F::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(LoaderRequest::Load { key, respond_to })
            .await
            .map_err(|_| LoaderError::Closed)?;
        response.await.map_err(|_| LoaderError::Dropped)?
    }

    /// Loads every key and returns one result per key, in request order.
    ///
    /// Repeated keys are not filtered here; they coalesce inside the loader and
    /// receive identical results.
    pub async fn load_all(&self, keys: Vec<F::Key>) -> Vec<LoadResult<F::Value, F::Error>> {
        futures::future::join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Seeds the cache unless a live entry already exists.
    pub async fn prime(&self, key: F::Key, value: F::Value) -> Result<(), LoaderError<F::Error>> {
        self.sender
            .send(LoaderRequest::Prime { key, value })
            .await
            .map_err(|_| LoaderError::Closed)
    }

    /// Evicts a cached value so the next `load` fetches again.
    pub async fn clear(&self, key: F::Key) -> Result<(), LoaderError<F::Error>> {
        self.sender
            .send(LoaderRequest::Clear { key })
            .await
            .map_err(|_| LoaderError::Closed)
    }
}

// =============================================================================
// 5. TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::{MockError, MockFetch};

    fn config() -> LoaderConfig {
        LoaderConfig {
            wait: Duration::from_millis(250),
            ..LoaderConfig::default()
        }
    }

    fn start(mock: &MockFetch<String, u32>, config: LoaderConfig) -> LoaderClient<MockFetch<String, u32>> {
        let (loader, client) = BatchLoader::new(mock.clone(), config);
        tokio::spawn(loader.run());
        client
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_coalesce_into_one_fetch() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("a".to_string()).return_ok(1);
        mock.on_key("b".to_string()).return_ok(2);
        mock.on_key("c".to_string()).return_ok(3);
        let client = start(&mock, config());

        let mut handles = vec![];
        for i in 0..30 {
            let client = client.clone();
            let key = ["a", "b", "c"][i % 3].to_string();
            handles.push(tokio::spawn(async move { client.load(key).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_some());
        }

        let calls = mock.calls();
        assert_eq!(calls.len(), 1, "one fetch for the whole window");
        let mut keys = calls[0].clone();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
        mock.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_all_repeated_keys_share_one_result() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("k1".to_string()).return_ok(10);
        mock.on_key("k2".to_string()).return_ok(20);
        let client = start(&mock, config());

        let results = client
            .load_all(vec!["k1".into(), "k1".into(), "k2".into()])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(Some(10)));
        assert_eq!(results[0], results[1]);
        assert_eq!(results[2], Ok(Some(20)));
        assert_eq!(mock.calls(), vec![vec!["k1".to_string(), "k2".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_and_unrequested_entries_are_tolerated() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("known".to_string()).return_ok(1);
        mock.return_unrequested("stranger".to_string(), 99);
        let client = start(&mock, config());

        let results = client
            .load_all(vec!["known".into(), "unknown".into()])
            .await;

        assert_eq!(results, vec![Ok(Some(1)), Ok(None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_reach_every_waiter_and_are_not_cached() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("bad".to_string())
            .return_err(MockError("backend down".into()));
        let client = start(&mock, config());

        let results = client.load_all(vec!["bad".into(), "bad".into()]).await;
        for result in &results {
            assert_eq!(
                result,
                &Err(LoaderError::Fetch(MockError("backend down".into())))
            );
        }

        // A fresh load starts a new batch instead of replaying the error.
        let _ = client.load("bad".into()).await;
        assert_eq!(mock.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_values_skip_the_fetch() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("a".to_string()).return_ok(7);
        let client = start(&mock, config());

        assert_eq!(client.load("a".into()).await, Ok(Some(7)));
        assert_eq!(client.load("a".into()).await, Ok(Some(7)));
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_misses_are_not_cached() {
        let mock = MockFetch::<String, u32>::new();
        let client = start(&mock, config());

        assert_eq!(client.load("ghost".into()).await, Ok(None));
        assert_eq!(client.load("ghost".into()).await, Ok(None));
        assert_eq!(mock.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ttl_expires_entries() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("a".to_string()).return_ok(1);
        let client = start(
            &mock,
            LoaderConfig {
                cache_ttl: Some(Duration::from_secs(5)),
                ..config()
            },
        );

        client.load("a".into()).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        client.load("a".into()).await.unwrap();
        assert_eq!(mock.fetch_count(), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        client.load("a".into()).await.unwrap();
        assert_eq!(mock.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_swept_without_being_read() {
        let mock = MockFetch::<String, u32>::new();
        let (mut loader, _client) = BatchLoader::new(
            mock,
            LoaderConfig {
                cache_ttl: Some(Duration::from_secs(1)),
                ..config()
            },
        );
        let (done_tx, _done_rx) = mpsc::unbounded_channel();

        for i in 0..1000 {
            let request = LoaderRequest::Prime {
                key: format!("old-{i}"),
                value: i,
            };
            loader.handle_request(request, &done_tx, "MockFetch");
        }
        assert_eq!(loader.cache.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        for i in 0..10 {
            let request = LoaderRequest::Prime {
                key: format!("new-{i}"),
                value: i,
            };
            loader.handle_request(request, &done_tx, "MockFetch");
        }
        assert_eq!(loader.cache.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prime_and_clear() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("a".to_string()).return_ok(1);
        let client = start(&mock, config());

        client.prime("a".into(), 42).await.unwrap();
        assert_eq!(client.load("a".into()).await, Ok(Some(42)));
        assert_eq!(mock.fetch_count(), 0);

        client.clear("a".into()).await.unwrap();
        assert_eq!(client.load("a".into()).await, Ok(Some(1)));
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_batch_dispatches_early() {
        let mock = MockFetch::<String, u32>::new();
        let client = start(
            &mock,
            LoaderConfig {
                max_batch: Some(2),
                ..config()
            },
        );

        client
            .load_all(vec!["a".into(), "b".into(), "c".into()])
            .await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[1], vec!["c".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_joins_in_flight_fetch() {
        let mock = MockFetch::<String, u32>::new().with_delay(Duration::from_millis(500));
        mock.on_key("slow".to_string()).return_ok(5);
        let client = start(&mock, config());

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.load("slow".into()).await })
        };
        // Past the window, while the fetch is still running.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let second = client.load("slow".into()).await;

        assert_eq!(first.await.unwrap(), Ok(Some(5)));
        assert_eq!(second, Ok(Some(5)));
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_fetch_aborts_waiters() {
        let mock = MockFetch::<String, u32>::new().panic_on_fetch();
        let client = start(&mock, config());

        let result = client.load("boom".into()).await;
        assert!(matches!(result, Err(LoaderError::Aborted(_))));

        // The loader itself survives.
        let again = client.load("boom".into()).await;
        assert!(matches!(again, Err(LoaderError::Aborted(_))));
    }

    #[tokio::test]
    async fn test_load_on_closed_loader() {
        let mock = MockFetch::<String, u32>::new();
        let (loader, client) = BatchLoader::new(mock, config());
        drop(loader);

        assert_eq!(client.load("a".into()).await, Err(LoaderError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_exits_after_last_client_dropped() {
        let mock = MockFetch::<String, u32>::new();
        mock.on_key("a".to_string()).return_ok(1);
        let (loader, client) = BatchLoader::new(mock.clone(), config());
        let handle = tokio::spawn(loader.run());

        let pending = {
            let client = client.clone();
            tokio::spawn(async move { client.load("a".into()).await })
        };
        tokio::task::yield_now().await;
        drop(client);

        assert_eq!(pending.await.unwrap(), Ok(Some(1)));
        handle.await.unwrap();
    }

    #[test]
    fn test_batch_merge_prefers_values() {
        let mut left: Batch<&str, u32, MockError> = Batch::new();
        left.insert_error("a", MockError("down".into()));
        left.insert_error("b", MockError("down".into()));

        let mut right = Batch::new();
        right.insert_value("a", 1);

        left.merge(right);
        assert_eq!(left.values.get("a"), Some(&1));
        assert!(!left.errors.contains_key("a"));
        assert!(left.errors.contains_key("b"));
    }
}
