//! # Entity Store
//!
//! The [`UserStore`] trait is the bridge's view of the user database: bulk lookups
//! by linked connection and, reserved for later, by internal id or username.
//! [`InMemoryUserStore`] backs the demo binary and the tests.

use crate::model::{Platform, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors reported per identifier by a store lookup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// No user matches the identifier. A normal "no result" outcome.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The backend could not serve the lookup.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::UnknownUser(_))
    }
}

/// Outcome of one bulk lookup.
///
/// `users` are not aligned with the requested identifiers; callers match them back
/// through the user's own fields.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub users: Vec<User>,
    pub errors: Vec<StoreError>,
}

/// Bulk user lookups consumed by the user-state fetcher.
///
/// The internal-account lookups have no-op default implementations: no bridged
/// command requests them yet, but the fan-out already routes to them.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Users whose connection on `platform` has one of `ids`.
    async fn users_by_connection_id(&self, platform: &Platform, ids: &[String]) -> Lookup;

    /// Users whose connection on `platform` has one of `usernames`.
    async fn users_by_connection_username(
        &self,
        platform: &Platform,
        usernames: &[String],
    ) -> Lookup;

    /// Users by internal account id.
    #[tracing::instrument(skip(self))]
    async fn users_by_id(&self, ids: &[String]) -> Lookup {
        debug!("Internal id lookup not served");
        Lookup::default()
    }

    /// Users by internal account username.
    #[tracing::instrument(skip(self))]
    async fn users_by_username(&self, usernames: &[String]) -> Lookup {
        debug!("Internal username lookup not served");
        Lookup::default()
    }
}

/// A [`UserStore`] over an in-process map.
///
/// Supports failure injection per platform so partial-failure paths can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    failing: RwLock<HashMap<Platform, String>>,
    lookups: AtomicUsize,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    pub fn insert(&self, user: User) {
        let mut users = match self.users.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        users.insert(user.id.clone(), user);
    }

    /// Makes every lookup on `platform` fail with a backend error.
    pub fn fail_platform(&self, platform: impl Into<Platform>, reason: impl Into<String>) {
        let mut failing = match self.failing.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        failing.insert(platform.into(), reason.into());
    }

    /// Number of connection lookups served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup_by(
        &self,
        platform: &Platform,
        wanted: &[String],
        field: impl Fn(&crate::model::UserConnection) -> &str,
        case_insensitive: bool,
    ) -> Lookup {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let failing = match self.failing.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        if let Some(reason) = failing.get(platform) {
            return Lookup {
                users: Vec::new(),
                errors: vec![StoreError::Backend(reason.clone())],
            };
        }

        let users = match self.users.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        let mut lookup = Lookup::default();
        for identifier in wanted {
            let found = users.values().find(|user| {
                user.connections_on(platform).any(|conn| {
                    if case_insensitive {
                        field(conn).eq_ignore_ascii_case(identifier)
                    } else {
                        field(conn) == identifier
                    }
                })
            });
            match found {
                Some(user) => lookup.users.push(user.clone()),
                None => lookup
                    .errors
                    .push(StoreError::UnknownUser(format!("{platform}:{identifier}"))),
            }
        }
        lookup
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn users_by_connection_id(&self, platform: &Platform, ids: &[String]) -> Lookup {
        self.lookup_by(platform, ids, |conn| conn.id.as_str(), false)
    }

    async fn users_by_connection_username(
        &self,
        platform: &Platform,
        usernames: &[String],
    ) -> Lookup {
        self.lookup_by(platform, usernames, |conn| conn.username.as_str(), true)
    }
}
