use cosmetics_bridge::clients::{
    AvatarModelizer, ChannelSink, InMemoryUserStore, LocalPubSub, PubSub,
};
use cosmetics_bridge::lifecycle::{BridgeConfig, BridgeDeps, BridgeSystem};
use cosmetics_bridge::model::{Avatar, OutboundMessage, Permissions, User};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    system: BridgeSystem,
    pubsub: LocalPubSub,
    store: Arc<InMemoryUserStore>,
    outbox: mpsc::Receiver<(String, OutboundMessage)>,
}

async fn start() -> Harness {
    let store = Arc::new(InMemoryUserStore::with_users([
        User::new("u1", "alice")
            .with_connection("twitch", "1001", "alice_tv")
            .with_avatar(Avatar {
                id: "av1".into(),
                animated: true,
            })
            .with_permissions(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION),
        User::new("u2", "bob")
            .with_connection("youtube", "UC2", "bob_yt")
            .with_avatar_id("av2")
            .with_permissions(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION),
    ]));
    let (sink, outbox) = ChannelSink::new(16);
    let pubsub = LocalPubSub::new();

    let system = BridgeSystem::start(
        &BridgeConfig::default(),
        &pubsub,
        BridgeDeps {
            store: store.clone(),
            sink: Arc::new(sink),
            modelizer: Arc::new(AvatarModelizer::new("https://cdn.test")),
        },
    )
    .await
    .expect("Failed to start bridge");

    Harness {
        system,
        pubsub,
        store,
        outbox,
    }
}

fn cosmetics_frame(session: &str, platform: &str, identifiers: &[&str]) -> String {
    let body = serde_json::json!({
        "session_id": session,
        "body": { "platform": platform, "identifiers": identifiers },
    });
    format!("cosmetics:{body}")
}

/// Full end-to-end flow: publish a frame, receive the whisper.
#[tokio::test(start_paused = true)]
async fn test_bridged_request_is_whispered_back() {
    let mut harness = start().await;
    assert_eq!(harness.system.channel(), "events:eventapi:bridge");

    let delivered = harness
        .pubsub
        .publish(
            "events:eventapi:bridge",
            cosmetics_frame("session-42", "TWITCH", &["1001", "9999"]),
        )
        .await;
    assert_eq!(delivered, 1);

    let (session_id, message) = harness.outbox.recv().await.expect("No message whispered");
    assert_eq!(session_id, "session-42");

    let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
    assert_eq!(json["op"], "DISPATCH");
    assert_eq!(json["wh"], "session-42");
    assert_eq!(json["d"]["type"], "cosmetics.create");
    assert_eq!(json["d"]["body"]["id"], "u1");
    assert_eq!(json["d"]["body"]["kind"], "COSMETIC");
    assert_eq!(json["d"]["body"]["object"]["kind"], "AVATAR");

    harness
        .system
        .shutdown()
        .await
        .expect("Failed to shutdown bridge");
}

/// Unknown commands and malformed frames never reach the store or the sink, and
/// never stop the loop.
#[tokio::test(start_paused = true)]
async fn test_bad_frames_are_dropped_and_loop_survives() {
    let mut harness = start().await;
    let channel = harness.system.channel().to_string();

    harness
        .pubsub
        .publish(&channel, r#"foo:{"session_id":"s1","body":{}}"#)
        .await;
    harness.pubsub.publish(&channel, "no separator").await;
    harness.pubsub.publish(&channel, "cosmetics:{broken").await;

    let nothing = tokio::time::timeout(Duration::from_secs(2), harness.outbox.recv()).await;
    assert!(nothing.is_err(), "nothing should be whispered");
    assert_eq!(harness.store.lookup_count(), 0);

    harness
        .pubsub
        .publish(&channel, cosmetics_frame("s2", "youtube", &["UC2"]))
        .await;
    let (session_id, message) = harness.outbox.recv().await.unwrap();
    assert_eq!(session_id, "s2");
    assert_eq!(message.data.body.id, "u2");

    harness.system.shutdown().await.unwrap();
}

/// Requests from different sessions inside one window share one store lookup.
#[tokio::test(start_paused = true)]
async fn test_requests_from_many_sessions_coalesce() {
    let mut harness = start().await;
    let channel = harness.system.channel().to_string();

    for session in ["a", "b", "c", "d"] {
        harness
            .pubsub
            .publish(&channel, cosmetics_frame(session, "twitch", &["1001"]))
            .await;
    }

    let mut sessions = Vec::new();
    for _ in 0..4 {
        let (session_id, _) = harness.outbox.recv().await.unwrap();
        sessions.push(session_id);
    }
    sessions.sort();
    assert_eq!(sessions, vec!["a", "b", "c", "d"]);
    assert_eq!(harness.store.lookup_count(), 1);

    harness.system.shutdown().await.unwrap();
}

/// A second request for a cached user is answered without touching the store.
#[tokio::test(start_paused = true)]
async fn test_cached_user_skips_the_store() {
    let mut harness = start().await;
    let channel = harness.system.channel().to_string();

    harness
        .pubsub
        .publish(&channel, cosmetics_frame("s1", "twitch", &["1001"]))
        .await;
    harness.outbox.recv().await.unwrap();

    harness
        .pubsub
        .publish(&channel, cosmetics_frame("s2", "twitch", &["1001"]))
        .await;
    harness.outbox.recv().await.unwrap();

    assert_eq!(harness.store.lookup_count(), 1);
    harness.system.shutdown().await.unwrap();
}

/// A command already dispatched when shutdown starts is still answered.
#[tokio::test(start_paused = true)]
async fn test_shutdown_delivers_in_flight_whispers() {
    let mut harness = start().await;
    let channel = harness.system.channel().to_string();

    harness
        .pubsub
        .publish(&channel, cosmetics_frame("s1", "twitch", &["1001"]))
        .await;
    // Inside the batch window: the handler is waiting on the loader.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.store.lookup_count(), 0);

    harness.system.shutdown().await.unwrap();

    let (session_id, message) = harness.outbox.recv().await.expect("No message whispered");
    assert_eq!(session_id, "s1");
    assert_eq!(message.data.body.id, "u1");
    assert_eq!(harness.store.lookup_count(), 1);
}

#[tokio::test]
async fn test_shutdown_with_no_traffic() {
    let harness = start().await;
    harness.system.shutdown().await.unwrap();
}

struct RejectingPubSub;

#[async_trait::async_trait]
impl PubSub for RejectingPubSub {
    async fn subscribe(
        &self,
        channel: &str,
        _sink: mpsc::Sender<String>,
    ) -> Result<(), cosmetics_bridge::clients::PubSubError> {
        Err(cosmetics_bridge::clients::PubSubError::Rejected {
            channel: channel.to_string(),
            reason: "not authorized".to_string(),
        })
    }
}

#[tokio::test]
async fn test_start_fails_when_subscription_is_rejected() {
    let (sink, _outbox) = ChannelSink::new(1);
    let result = BridgeSystem::start(
        &BridgeConfig::default(),
        &RejectingPubSub,
        BridgeDeps {
            store: Arc::new(InMemoryUserStore::new()),
            sink: Arc::new(sink),
            modelizer: Arc::new(AvatarModelizer::new("https://cdn.test")),
        },
    )
    .await;
    assert!(result.is_err());
}
