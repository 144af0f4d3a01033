//! Presentation objects for resolved users.

use crate::model::User;
use serde_json::{json, Value};

/// Builds the view model embedded in a dispatch. Must be pure.
pub trait Modelizer: Send + Sync + 'static {
    fn avatar(&self, user: &User) -> Value;
}

/// Renders a user's profile picture as an `AVATAR` cosmetic hosted on a CDN.
#[derive(Debug, Clone)]
pub struct AvatarModelizer {
    cdn_url: String,
}

impl AvatarModelizer {
    pub fn new(cdn_url: impl Into<String>) -> Self {
        Self {
            cdn_url: cdn_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Modelizer for AvatarModelizer {
    fn avatar(&self, user: &User) -> Value {
        let (avatar_id, animated) = match &user.avatar {
            Some(avatar) => (avatar.id.as_str(), avatar.animated),
            None => (user.avatar_id.as_str(), false),
        };

        json!({
            "id": avatar_id,
            "kind": "AVATAR",
            "data": {
                "id": avatar_id,
                "user_id": user.id,
                "animated": animated,
                "host": {
                    "url": format!("{}/user/{}/av_{}", self.cdn_url, user.id, avatar_id),
                },
            },
        })
    }
}
