//! # Cosmetics Command
//!
//! Answers "what cosmetics do these users have?" for one session. Identifiers are
//! resolved through the user-state loader, so concurrent requests for the same
//! users share one store round-trip.

use crate::bridge::{BridgeError, CommandContext};
use crate::clients::Modelizer;
use crate::framework::LoaderError;
use crate::model::{
    CosmeticKind, DispatchPayload, OutboundMessage, Permissions, User, UserStateCommandBody,
};
use crate::user_state::{compose_key, UserStateLoader};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Identifier type used for every cosmetics lookup.
const ID_TYPE: &str = "id";

pub struct CosmeticsHandler {
    loader: UserStateLoader,
    modelizer: Arc<dyn Modelizer>,
}

impl CosmeticsHandler {
    pub fn new(loader: UserStateLoader, modelizer: Arc<dyn Modelizer>) -> Self {
        Self { loader, modelizer }
    }

    /// Resolves the identifiers and builds one whispered dispatch per eligible user,
    /// in identifier order.
    #[instrument(
        skip_all,
        fields(platform = %body.platform, identifiers = body.identifiers.len())
    )]
    pub async fn handle(
        &self,
        ctx: &CommandContext,
        body: UserStateCommandBody,
    ) -> Result<Vec<OutboundMessage>, BridgeError> {
        if !body.wants(CosmeticKind::Avatar) {
            debug!(kinds = ?body.kinds, "No supported cosmetic kind requested");
            return Ok(Vec::new());
        }

        let Some(session_id) = ctx.session_id() else {
            error!("Missing session id");
            return Ok(Vec::new());
        };

        let keys = user_state_keys(&body);
        let results = self.loader.load_all(keys.clone()).await;

        let mut seen = HashSet::new();
        let mut messages = Vec::new();
        for (key, result) in keys.iter().zip(results) {
            let user = match result {
                Ok(Some(user)) => user,
                Ok(None) => {
                    debug!(%key, "No user");
                    continue;
                }
                Err(e @ (LoaderError::Closed | LoaderError::Dropped)) => {
                    return Err(BridgeError::Loader(e.to_string()));
                }
                Err(e) => {
                    warn!(%key, error = %e, "Lookup failed");
                    continue;
                }
            };

            if !seen.insert(user.id.clone()) || !is_eligible(&user) {
                continue;
            }

            let avatar = self.modelizer.avatar(&user);
            messages.push(OutboundMessage::dispatch(
                DispatchPayload::create_cosmetic(user.id.clone(), avatar),
                session_id,
            ));
        }

        debug!(messages = messages.len(), "Cosmetics resolved");
        Ok(messages)
    }
}

/// Loader keys for a request: `{platform}|id:{identifier}` per identifier.
///
/// Identifiers may already carry the `id:` prefix; it is not doubled.
pub fn user_state_keys(body: &UserStateCommandBody) -> Vec<String> {
    body.identifiers
        .iter()
        .map(|identifier| {
            let value = identifier
                .strip_prefix("id:")
                .unwrap_or(identifier.as_str());
            compose_key(&body.platform, ID_TYPE, value)
        })
        .collect()
}

/// Has an avatar and may show it animated.
pub fn is_eligible(user: &User) -> bool {
    user.has_avatar() && user.has_permission(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;

    fn body(platform: &str, identifiers: &[&str]) -> UserStateCommandBody {
        UserStateCommandBody {
            platform: Platform::from(platform),
            identifiers: identifiers.iter().map(|i| i.to_string()).collect(),
            kinds: Vec::new(),
        }
    }

    #[test]
    fn test_keys_use_id_type() {
        assert_eq!(
            user_state_keys(&body("TWITCH", &["123", "id:456", "username:bob"])),
            vec!["twitch|id:123", "twitch|id:456", "twitch|id:username:bob"]
        );
    }

    #[test]
    fn test_eligibility_needs_avatar_and_permission() {
        let base = User::new("u1", "alice");
        assert!(!is_eligible(&base));
        assert!(!is_eligible(&base.clone().with_avatar_id("av")));
        assert!(!is_eligible(
            &base
                .clone()
                .with_permissions(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION)
        ));
        assert!(is_eligible(
            &base
                .with_avatar_id("av")
                .with_permissions(Permissions::FEATURE_PROFILE_PICTURE_ANIMATION)
        ));
    }
}
