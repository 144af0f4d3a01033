//! Bridge configuration loaded from environment variables.
//!
//! Every setting has a default, so the bridge starts with zero configuration for
//! local development.

use crate::framework::LoaderConfig;
use std::str::FromStr;
use std::time::Duration;

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Namespace prefix of pub/sub channel names.
    /// Env: `BRIDGE_KEY_PREFIX`
    /// Default: `events`
    pub key_prefix: String,

    /// Batch window of the user-state loader.
    /// Env: `BRIDGE_BATCH_WAIT_MS`
    /// Default: `250`
    pub batch_wait: Duration,

    /// Keys per batch before dispatching early (0 = unlimited).
    /// Env: `BRIDGE_MAX_BATCH`
    /// Default: `0`
    pub max_batch: usize,

    /// Lifetime of cached users (0 = never expire).
    /// Env: `BRIDGE_CACHE_TTL_MS`
    /// Default: `60000`
    pub cache_ttl: Duration,

    /// Capacity of the inbound frame queue.
    /// Env: `BRIDGE_QUEUE_CAPACITY`
    /// Default: `1024`
    pub queue_capacity: usize,

    /// Concurrent dispatches before the subscription loop stops reading.
    /// Env: `BRIDGE_MAX_IN_FLIGHT`
    /// Default: `64`
    pub max_in_flight: usize,

    /// Capacity of the loader request channel.
    /// Env: `BRIDGE_LOADER_BUFFER`
    /// Default: `256`
    pub loader_buffer: usize,

    /// Base URL avatar images are served from.
    /// Env: `BRIDGE_CDN_URL`
    /// Default: `https://cdn.localhost`
    pub cdn_url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            key_prefix: "events".to_string(),
            batch_wait: Duration::from_millis(250),
            max_batch: 0,
            cache_ttl: Duration::from_secs(60),
            queue_capacity: 1024,
            max_in_flight: 64,
            loader_buffer: 256,
            cdn_url: "https://cdn.localhost".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`BridgeConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(prefix) = lookup("BRIDGE_KEY_PREFIX") {
            config.key_prefix = prefix;
        }
        if let Some(ms) = parsed::<u64>(&lookup, "BRIDGE_BATCH_WAIT_MS") {
            config.batch_wait = Duration::from_millis(ms);
        }
        if let Some(n) = parsed(&lookup, "BRIDGE_MAX_BATCH") {
            config.max_batch = n;
        }
        if let Some(ms) = parsed::<u64>(&lookup, "BRIDGE_CACHE_TTL_MS") {
            config.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(n) = parsed(&lookup, "BRIDGE_QUEUE_CAPACITY") {
            config.queue_capacity = n;
        }
        if let Some(n) = parsed(&lookup, "BRIDGE_MAX_IN_FLIGHT") {
            config.max_in_flight = n;
        }
        if let Some(n) = parsed(&lookup, "BRIDGE_LOADER_BUFFER") {
            config.loader_buffer = n;
        }
        if let Some(url) = lookup("BRIDGE_CDN_URL") {
            if !url.is_empty() {
                config.cdn_url = url;
            }
        }

        config
    }

    /// Channel the bridge subscribes to: `{prefix}:eventapi:bridge`.
    pub fn bridge_channel(&self) -> String {
        compose_channel(&self.key_prefix, &["eventapi", "bridge"])
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            wait: self.batch_wait,
            max_batch: (self.max_batch > 0).then_some(self.max_batch),
            cache_ttl: (!self.cache_ttl.is_zero()).then_some(self.cache_ttl),
            buffer_size: self.loader_buffer,
        }
    }
}

fn compose_channel(prefix: &str, parts: &[&str]) -> String {
    std::iter::once(prefix)
        .filter(|p| !p.is_empty())
        .chain(parts.iter().copied())
        .collect::<Vec<_>>()
        .join(":")
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}
