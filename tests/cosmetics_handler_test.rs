use cosmetics_bridge::bridge::{BridgeError, CosmeticsHandler, RootContext};
use cosmetics_bridge::clients::{AvatarModelizer, InMemoryUserStore};
use cosmetics_bridge::framework::LoaderConfig;
use cosmetics_bridge::model::{
    Avatar, CosmeticKind, Permissions, Platform, User, UserStateCommandBody,
};
use cosmetics_bridge::user_state;
use std::sync::Arc;

fn animated(user: User) -> User {
    user.with_permissions(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION)
}

fn store() -> Arc<InMemoryUserStore> {
    Arc::new(InMemoryUserStore::with_users([
        animated(
            User::new("u1", "alice")
                .with_connection("twitch", "1001", "alice_tv")
                .with_avatar(Avatar {
                    id: "av1".into(),
                    animated: true,
                }),
        ),
        // Avatar but no permission.
        User::new("u2", "bob")
            .with_connection("twitch", "1002", "bob_tv")
            .with_avatar_id("av2"),
        // Permission but no avatar.
        animated(User::new("u3", "carol").with_connection("twitch", "1003", "carol_tv")),
        animated(
            User::new("u4", "dave")
                .with_connection("twitch", "1004", "dave_tv")
                .with_avatar_id("av4"),
        ),
    ]))
}

fn handler(store: &Arc<InMemoryUserStore>) -> CosmeticsHandler {
    let (loader, client) = user_state::new_loader(store.clone(), LoaderConfig::default());
    tokio::spawn(loader.run());
    CosmeticsHandler::new(client, Arc::new(AvatarModelizer::new("https://cdn.test")))
}

fn body(identifiers: &[&str]) -> UserStateCommandBody {
    UserStateCommandBody {
        platform: Platform::from("TWITCH"),
        identifiers: identifiers.iter().map(|i| i.to_string()).collect(),
        kinds: Vec::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_only_eligible_users_are_dispatched_in_identifier_order() {
    let store = store();
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("session-1");

    let messages = handler
        .handle(&ctx, body(&["1004", "1002", "1003", "1001"]))
        .await
        .unwrap();

    let ids: Vec<&str> = messages.iter().map(|m| m.data.body.id.as_str()).collect();
    assert_eq!(ids, vec!["u4", "u1"]);
    for message in &messages {
        assert_eq!(message.whisper, "session-1");
        assert!(message.data.body.contextual);
    }
    assert_eq!(messages[1].data.body.object["id"], "av1");
    assert_eq!(store.lookup_count(), 1, "one store call for the whole request");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_identifiers_are_skipped() {
    let store = store();
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("s1");

    let messages = handler
        .handle(&ctx, body(&["404", "1001", "405"]))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].data.body.id, "u1");
}

#[tokio::test(start_paused = true)]
async fn test_missing_session_yields_nothing() {
    let store = store();
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("");

    let messages = handler.handle(&ctx, body(&["1001"])).await.unwrap();
    assert!(messages.is_empty());
    assert_eq!(store.lookup_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_same_user_twice_is_dispatched_once() {
    let store = store();
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("s1");

    let messages = handler
        .handle(&ctx, body(&["1001", "id:1001"]))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_kinds_without_avatar_skip_lookups() {
    let store = store();
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("s1");

    let mut request = body(&["1001"]);
    request.kinds = vec![CosmeticKind::Badge, CosmeticKind::Paint];
    assert!(handler.handle(&ctx, request).await.unwrap().is_empty());
    assert_eq!(store.lookup_count(), 0);

    let mut request = body(&["1001"]);
    request.kinds = vec![CosmeticKind::Avatar];
    assert_eq!(handler.handle(&ctx, request).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_is_not_a_handler_error() {
    let store = store();
    store.fail_platform("twitch", "connection refused");
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("s1");

    let messages = handler.handle(&ctx, body(&["1001", "1004"])).await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_share_one_lookup() {
    let store = store();
    let handler = Arc::new(handler(&store));
    let root = RootContext::new();

    let mut tasks = Vec::new();
    for session in ["s1", "s2", "s3"] {
        let handler = handler.clone();
        let (ctx, guard) = root.child(session);
        tasks.push(tokio::spawn(async move {
            let _guard = guard;
            handler.handle(&ctx, body(&["1001", "1004"])).await
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().len(), 2);
    }
    assert_eq!(store.lookup_count(), 1);
}

#[tokio::test]
async fn test_closed_loader_is_an_error() {
    let store = store();
    let (loader, client) = user_state::new_loader(store.clone(), LoaderConfig::default());
    drop(loader);
    let handler = CosmeticsHandler::new(client, Arc::new(AvatarModelizer::new("https://cdn.test")));
    let root = RootContext::new();
    let (ctx, _guard) = root.child("s1");

    let result = handler.handle(&ctx, body(&["1001"])).await;
    assert!(matches!(result, Err(BridgeError::Loader(_))));
}

#[tokio::test(start_paused = true)]
async fn test_command_finishes_after_root_is_cancelled() {
    let store = store();
    let handler = handler(&store);
    let root = RootContext::new();
    let (ctx, _guard) = root.child("s1");
    root.cancel();

    let messages = handler.handle(&ctx, body(&["1001"])).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].data.body.id, "u1");
}
