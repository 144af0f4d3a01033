//! # Mock Framework
//!
//! Utilities for testing loader callers in isolation.
//!
//! [`MockFetch`] implements [`BatchFetch`] with canned per-key answers and records
//! every batch it receives, so tests can assert *how* keys were grouped, not just
//! what came back.
//!
//! ```rust,ignore
//! let mock = MockFetch::<String, u32>::new();
//! mock.on_key("a".to_string()).return_ok(1);
//! mock.on_key("b".to_string()).return_err(MockError("down".into()));
//!
//! let (loader, client) = BatchLoader::new(mock.clone(), LoaderConfig::default());
//! tokio::spawn(loader.run());
//! // ... use client ...
//! assert_eq!(mock.fetch_count(), 1);
//! mock.verify(); // Ensures every programmed key was requested
//! ```

use crate::framework::{Batch, BatchFetch};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Error returned by [`MockFetch`] for keys programmed with `return_err`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Mock fetch error: {0}")]
pub struct MockError(pub String);

struct MockState<K, V> {
    values: HashMap<K, V>,
    errors: HashMap<K, MockError>,
    unrequested: HashMap<K, V>,
    calls: Vec<Vec<K>>,
}

/// A recording [`BatchFetch`] with programmable answers.
///
/// Clones share state, so keep one clone in the test and hand the other to the loader.
pub struct MockFetch<K, V> {
    state: Arc<Mutex<MockState<K, V>>>,
    delay: Option<Duration>,
    panic_on_fetch: bool,
}

impl<K, V> Clone for MockFetch<K, V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            delay: self.delay,
            panic_on_fetch: self.panic_on_fetch,
        }
    }
}

impl<K, V> Default for MockFetch<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockFetch<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a mock that answers every key with "no value".
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                values: HashMap::new(),
                errors: HashMap::new(),
                unrequested: HashMap::new(),
                calls: Vec::new(),
            })),
            delay: None,
            panic_on_fetch: false,
        }
    }

    /// Sleeps this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panics inside every fetch.
    pub fn panic_on_fetch(mut self) -> Self {
        self.panic_on_fetch = true;
        self
    }

    /// Programs the answer for one key.
    pub fn on_key(&self, key: K) -> KeyExpectationBuilder<K, V> {
        KeyExpectationBuilder {
            key,
            state: self.state.clone(),
        }
    }

    /// Adds a value for a key nobody asked for to every batch.
    pub fn return_unrequested(&self, key: K, value: V) {
        let mut state = self.state.lock().unwrap();
        state.unrequested.insert(key, value);
    }

    /// Every batch received so far, in arrival order.
    pub fn calls(&self) -> Vec<Vec<K>> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Verifies that every programmed key was requested at least once.
    pub fn verify(&self) {
        let state = self.state.lock().unwrap();
        let requested: HashSet<&K> = state.calls.iter().flatten().collect();
        let unmet = state
            .values
            .keys()
            .chain(state.errors.keys())
            .filter(|key| !requested.contains(key))
            .count();
        if unmet > 0 {
            panic!("Not all expectations were met. {} remaining", unmet);
        }
    }
}

/// Builder for per-key answers.
pub struct KeyExpectationBuilder<K, V> {
    key: K,
    state: Arc<Mutex<MockState<K, V>>>,
}

impl<K: Eq + Hash, V> KeyExpectationBuilder<K, V> {
    /// Answers the key with a value.
    pub fn return_ok(self, value: V) {
        let mut state = self.state.lock().unwrap();
        state.errors.remove(&self.key);
        state.values.insert(self.key, value);
    }

    /// Answers the key with an error.
    pub fn return_err(self, error: MockError) {
        let mut state = self.state.lock().unwrap();
        state.values.remove(&self.key);
        state.errors.insert(self.key, error);
    }
}

#[async_trait]
impl<K, V> BatchFetch for MockFetch<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;
    type Error = MockError;

    async fn fetch(&self, keys: Vec<K>) -> Batch<K, V, MockError> {
        self.state.lock().unwrap().calls.push(keys.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on_fetch {
            panic!("mock fetch panicked");
        }

        let state = self.state.lock().unwrap();
        let mut batch = Batch::new();
        for key in keys {
            if let Some(value) = state.values.get(&key) {
                batch.insert_value(key, value.clone());
            } else if let Some(error) = state.errors.get(&key) {
                batch.insert_error(key, error.clone());
            }
        }
        for (key, value) in &state.unrequested {
            batch.insert_value(key.clone(), value.clone());
        }
        batch
    }
}
