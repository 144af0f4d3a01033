//! # Command Dispatcher
//!
//! The subscription loop of the bridge. Each frame goes through
//! `Received -> Parsed -> Dispatched -> Completed | Failed` on its own task, so
//! independent commands land in the same loader batch window. A semaphore caps the
//! number of dispatches in flight; when it is exhausted the loop stops pulling from
//! the queue and the transport sees backpressure.

use crate::bridge::{BridgeError, CommandContext, CosmeticsHandler, RootContext};
use crate::clients::PushSink;
use crate::model::{Command, CommandEnvelope, OutboundMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

/// Terminal state of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran; `delivered` messages reached the sink.
    Completed { delivered: usize },
    /// Well-formed frame for a command nobody handles.
    Unrouted,
    /// Dropped: malformed frame, undecodable body or handler error.
    Failed,
}

/// Routes bridged frames to their handlers. Clones share handlers and the in-flight limit.
#[derive(Clone)]
pub struct Dispatcher {
    cosmetics: Arc<CosmeticsHandler>,
    sink: Arc<dyn PushSink>,
    root: RootContext,
    permits: Arc<Semaphore>,
    max_in_flight: u32,
}

impl Dispatcher {
    pub fn new(
        cosmetics: CosmeticsHandler,
        sink: Arc<dyn PushSink>,
        root: RootContext,
        max_in_flight: usize,
    ) -> Self {
        let max_in_flight = u32::try_from(max_in_flight.max(1)).unwrap_or(u32::MAX);
        Self {
            cosmetics: Arc::new(cosmetics),
            sink,
            root,
            permits: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    /// Consumes frames until the root context is cancelled or the queue closes, then
    /// waits for the dispatches still running. Those are not interrupted, so their
    /// messages are still delivered.
    pub async fn run(self, mut receiver: mpsc::Receiver<String>) {
        info!(max_in_flight = self.max_in_flight, "Dispatcher started");

        loop {
            let message = tokio::select! {
                _ = self.root.cancelled() => break,
                message = receiver.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            // A received frame is always dispatched, even if shutdown starts meanwhile.
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };

            let dispatcher = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                dispatcher.process(&message).await;
            });
        }

        info!("Draining in-flight dispatches");
        let _ = self.permits.acquire_many(self.max_in_flight).await;
        info!("Shutdown");
    }

    /// Runs one frame to completion.
    pub async fn process(&self, message: &str) -> DispatchOutcome {
        let command = match decode(message) {
            Ok((_, Some(command))) => command,
            Ok((name, None)) => {
                debug!(command = %name, "No handler for command");
                return DispatchOutcome::Unrouted;
            }
            Err(e) => {
                warn!(error = %e, "Dropping bridged frame");
                return DispatchOutcome::Failed;
            }
        };

        let name = command.name();
        let (ctx, _guard) = self.root.child(command.session_id());
        debug!(command = name, session_id = ?ctx.session_id(), "Dispatching");

        match self.route(&ctx, command).await {
            Ok(messages) => {
                let delivered = self.deliver(name, messages).await;
                DispatchOutcome::Completed { delivered }
            }
            Err(e) => {
                error!(command = name, error = %e, "Command failed");
                DispatchOutcome::Failed
            }
        }
    }

    async fn route(
        &self,
        ctx: &CommandContext,
        command: Command,
    ) -> Result<Vec<OutboundMessage>, BridgeError> {
        match command {
            Command::Cosmetics(payload) => self.cosmetics.handle(ctx, payload.body).await,
        }
    }

    async fn deliver(&self, command: &str, messages: Vec<OutboundMessage>) -> usize {
        let mut delivered = 0;
        for message in messages {
            let session_id = message.whisper.clone();
            match self.sink.whisper(&session_id, message).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(command, %session_id, error = %e, "Delivery failed"),
            }
        }
        delivered
    }
}

/// Parses a frame and decodes it for its command name, which is returned alongside.
fn decode(message: &str) -> Result<(String, Option<Command>), BridgeError> {
    let envelope = CommandEnvelope::parse(message)?;
    let command = Command::decode(&envelope)?;
    Ok((envelope.name, command))
}
