//! # Push Sink
//!
//! Hands dispatch messages to whatever owns the client sessions.

use crate::model::OutboundMessage;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SinkError {
    #[error("Session not connected: {0}")]
    SessionGone(String),

    #[error("Push sink closed")]
    Closed,
}

/// Delivers a message to exactly one session.
#[async_trait]
pub trait PushSink: Send + Sync + 'static {
    async fn whisper(&self, session_id: &str, message: OutboundMessage) -> Result<(), SinkError>;
}

/// A [`PushSink`] that forwards `(session_id, message)` pairs into a channel.
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<(String, OutboundMessage)>,
}

impl ChannelSink {
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<(String, OutboundMessage)>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl PushSink for ChannelSink {
    #[instrument(skip(self, message))]
    async fn whisper(&self, session_id: &str, message: OutboundMessage) -> Result<(), SinkError> {
        debug!("Sending message");
        self.sender
            .send((session_id.to_string(), message))
            .await
            .map_err(|_| SinkError::Closed)
    }
}
