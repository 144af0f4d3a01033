//! # Cosmetics Bridge Demo
//!
//! Starts the bridge against in-memory collaborators, publishes a cosmetics request
//! the way another process would, and prints what gets whispered back.

use cosmetics_bridge::clients::{AvatarModelizer, ChannelSink, InMemoryUserStore, LocalPubSub};
use cosmetics_bridge::lifecycle::{setup_tracing, BridgeConfig, BridgeDeps, BridgeSystem};
use cosmetics_bridge::model::{Avatar, Permissions, User};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = BridgeConfig::from_env();
    info!(?config, "Starting cosmetics bridge demo");

    let store = Arc::new(InMemoryUserStore::with_users([
        User::new("u1", "alice")
            .with_connection("twitch", "1001", "alice_tv")
            .with_avatar(Avatar {
                id: "av_alice".into(),
                animated: true,
            })
            .with_permissions(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION),
        User::new("u2", "bob")
            .with_connection("twitch", "1002", "bob_tv")
            .with_avatar_id("av_bob"),
    ]));
    let (sink, mut outbox) = ChannelSink::new(64);
    let pubsub = LocalPubSub::new();

    let system = BridgeSystem::start(
        &config,
        &pubsub,
        BridgeDeps {
            store,
            sink: Arc::new(sink),
            modelizer: Arc::new(AvatarModelizer::new(config.cdn_url.clone())),
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    let frame = r#"cosmetics:{"session_id":"demo-session","body":{"platform":"TWITCH","identifiers":["1001","1002","9999"],"kinds":["AVATAR"]}}"#;
    let span = tracing::info_span!("bridge_request");
    async {
        info!("Publishing cosmetics request");
        pubsub.publish(system.channel(), frame).await;
    }
    .instrument(span)
    .await;

    let wait = config.batch_wait + Duration::from_secs(1);
    match tokio::time::timeout(wait, outbox.recv()).await {
        Ok(Some((session_id, message))) => {
            let json = message.to_json().map_err(|e| e.to_string())?;
            info!(%session_id, %json, "Whispered");
        }
        Ok(None) => warn!("Push sink closed"),
        Err(_) => warn!("No cosmetics dispatched"),
    }

    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
