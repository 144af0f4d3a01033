use crate::bridge::{BridgeError, CosmeticsHandler, Dispatcher, RootContext};
use crate::clients::{Modelizer, PubSub, PushSink, UserStore};
use crate::lifecycle::BridgeConfig;
use crate::user_state::{self, UserStateLoader};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// The collaborators the bridge is wired to.
pub struct BridgeDeps {
    pub store: Arc<dyn UserStore>,
    pub sink: Arc<dyn PushSink>,
    pub modelizer: Arc<dyn Modelizer>,
}

/// The runtime orchestrator of the event bridge.
///
/// `BridgeSystem` is responsible for:
/// - **Lifecycle Management**: Starting and stopping the loader and dispatcher tasks
/// - **Dependency Wiring**: Handing the loader client to the cosmetics handler
/// - **Subscription**: Attaching the dispatcher's queue to the bridge channel
///
/// # Example
///
/// ```ignore
/// let system = BridgeSystem::start(&config, &pubsub, deps).await?;
///
/// // Frames published on `system.channel()` are now processed.
///
/// system.shutdown().await?;
/// ```
pub struct BridgeSystem {
    /// Client of the user-state loader, shared with the cosmetics handler.
    pub loader: UserStateLoader,

    channel: String,
    root: RootContext,

    /// Dispatcher first, loader last (used for ordered shutdown).
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl BridgeSystem {
    /// Creates the loader, handler and dispatcher, subscribes to the bridge channel
    /// and spawns the long-lived tasks.
    pub async fn start(
        config: &BridgeConfig,
        pubsub: &dyn PubSub,
        deps: BridgeDeps,
    ) -> Result<Self, BridgeError> {
        let (loader, loader_client) = user_state::new_loader(deps.store, config.loader_config());
        let loader_handle = tokio::spawn(loader.run());

        let root = RootContext::new();
        let handler = CosmeticsHandler::new(loader_client.clone(), deps.modelizer);
        let dispatcher = Dispatcher::new(handler, deps.sink, root.clone(), config.max_in_flight);

        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let channel = config.bridge_channel();
        pubsub.subscribe(&channel, sender).await?;

        let dispatcher_handle = tokio::spawn(dispatcher.run(receiver));
        info!(%channel, "Bridge started");

        Ok(Self {
            loader: loader_client,
            channel,
            root,
            handles: vec![dispatcher_handle, loader_handle],
        })
    }

    /// The channel the bridge listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Gracefully shuts down the bridge.
    ///
    /// Cancels the root context so the dispatcher stops reading, then drops the
    /// loader client and waits for every task. Commands already dispatched finish and
    /// deliver their messages before the dispatcher task returns.
    /// Returns an error if any task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down bridge...");

        self.root.cancel();
        drop(self.loader);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Bridge task failed: {:?}", e);
                return Err(format!("Bridge task failed: {:?}", e));
            }
        }

        info!("Bridge shutdown complete.");
        Ok(())
    }
}
