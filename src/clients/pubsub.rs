//! # Pub/Sub Transport
//!
//! The bridge only needs one operation from the transport: attach a bounded queue
//! to a channel name. [`LocalPubSub`] is an in-process broker with the same
//! delivery semantics (publishers wait when a subscriber's queue is full).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PubSubError {
    #[error("Subscription rejected for {channel}: {reason}")]
    Rejected { channel: String, reason: String },
}

/// Channel subscription consumed by the bridge.
#[async_trait]
pub trait PubSub: Send + Sync + 'static {
    /// Delivers every future message on `channel` into `sink` until it closes.
    async fn subscribe(&self, channel: &str, sink: mpsc::Sender<String>)
        -> Result<(), PubSubError>;
}

/// In-process broker.
#[derive(Debug, Default)]
pub struct LocalPubSub {
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl LocalPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes to every live subscriber of `channel`; returns how many received it.
    ///
    /// Waits while a subscriber's queue is full. Closed subscribers are pruned.
    pub async fn publish(&self, channel: &str, message: impl Into<String>) -> usize {
        let message = message.into();
        let targets = {
            let subscribers = match self.subscribers.lock() {
                Ok(guard) => guard,
                Err(poison) => poison.into_inner(),
            };
            subscribers.get(channel).cloned().unwrap_or_default()
        };

        let mut delivered = 0;
        for target in &targets {
            if target.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered < targets.len() {
            let mut subscribers = match self.subscribers.lock() {
                Ok(guard) => guard,
                Err(poison) => poison.into_inner(),
            };
            if let Some(list) = subscribers.get_mut(channel) {
                list.retain(|sender| !sender.is_closed());
            }
        }

        debug!(channel, delivered, "Published");
        delivered
    }
}

#[async_trait]
impl PubSub for LocalPubSub {
    async fn subscribe(
        &self,
        channel: &str,
        sink: mpsc::Sender<String>,
    ) -> Result<(), PubSubError> {
        if channel.is_empty() {
            return Err(PubSubError::Rejected {
                channel: channel.to_string(),
                reason: "empty channel name".to_string(),
            });
        }

        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        subscribers.entry(channel.to_string()).or_default().push(sink);
        info!(channel, "Subscribed");
        Ok(())
    }
}
