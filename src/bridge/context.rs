//! Cancellation scopes for bridged commands.
//!
//! A [`RootContext`] lives as long as the bridge; cancelling it stops the
//! subscription loop. Every dispatch derives a [`CommandContext`] from it that
//! carries the requesting session, and gets a [`CancelGuard`] that cancels the child
//! when it goes out of scope, on every exit path including unwinding.
//!
//! Root cancellation does not reach children: a command already dispatched runs to
//! completion so its result is still delivered during shutdown.

use std::sync::Arc;
use tokio::sync::watch;

/// Bridge-wide cancellation scope. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct RootContext {
    cancel: Arc<watch::Sender<bool>>,
}

impl Default for RootContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RootContext {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
        }
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once [`RootContext::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.cancel.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Derives the context of one command.
    pub fn child(&self, session_id: impl Into<String>) -> (CommandContext, CancelGuard) {
        let (cancel, cancelled) = watch::channel(false);
        let context = CommandContext {
            session_id: session_id.into(),
            cancelled,
        };
        (context, CancelGuard { cancel })
    }
}

/// Per-command scope: the session identity plus a flag that trips once the
/// command's guard drops, so a context kept past its dispatch reads as stale.
#[derive(Debug, Clone)]
pub struct CommandContext {
    session_id: String,
    cancelled: watch::Receiver<bool>,
}

impl CommandContext {
    /// The requesting session, `None` when the producer sent none.
    pub fn session_id(&self) -> Option<&str> {
        Some(self.session_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

/// Cancels its [`CommandContext`] when dropped.
#[derive(Debug)]
pub struct CancelGuard {
    cancel: watch::Sender<bool>,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}
