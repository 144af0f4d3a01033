use serde::{Deserialize, Serialize};
use std::fmt;

/// A connection platform (e.g. `twitch`, `youtube`, `kick`).
///
/// Producers send platforms in either case (`TWITCH` / `twitch`); the value is
/// normalized to lower case on construction so composite keys and connection
/// matching compare equal regardless of who built them. An empty platform means
/// "internal account" in the key syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Platform {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Platform {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role permission bits held by a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(u64);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    /// Allows an animated profile picture to be shown as a cosmetic.
    pub const FEATURE_PROFILE_PICTURE_ANIMATION: Permissions = Permissions(1 << 24);

    pub const fn union(self, other: Permissions) -> Self {
        Self(self.0 | other.0)
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A linked third-party account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConnection {
    pub platform: Platform,
    pub id: String,
    pub username: String,
}

/// Uploaded profile picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: String,
    pub animated: bool,
}

/// Represents a platform account as resolved from the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    /// Legacy avatar reference; empty when unset.
    #[serde(default)]
    pub avatar_id: String,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub connections: Vec<UserConnection>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl User {
    /// Creates a user with no avatar, connections or permissions.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: id.into(),
            display_name: username.clone(),
            username,
            avatar_id: String::new(),
            avatar: None,
            connections: Vec::new(),
            permissions: Permissions::NONE,
        }
    }

    pub fn with_connection(
        mut self,
        platform: impl Into<Platform>,
        id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        self.connections.push(UserConnection {
            platform: platform.into(),
            id: id.into(),
            username: username.into(),
        });
        self
    }

    pub fn with_avatar(mut self, avatar: Avatar) -> Self {
        self.avatar = Some(avatar);
        self
    }

    pub fn with_avatar_id(mut self, avatar_id: impl Into<String>) -> Self {
        self.avatar_id = avatar_id.into();
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = self.permissions.union(permissions);
        self
    }

    /// True when either avatar reference is set.
    pub fn has_avatar(&self) -> bool {
        self.avatar.is_some() || !self.avatar_id.is_empty()
    }

    pub fn has_permission(&self, permission: Permissions) -> bool {
        self.permissions.contains(permission)
    }

    /// Every connection linked on `platform`; a user may link several accounts there.
    pub fn connections_on<'a>(
        &'a self,
        platform: &'a Platform,
    ) -> impl Iterator<Item = &'a UserConnection> + 'a {
        self.connections.iter().filter(move |c| &c.platform == platform)
    }
}
