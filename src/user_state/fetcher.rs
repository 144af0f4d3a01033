//! # User-State Fan-out
//!
//! [`UserStateFetcher`] is the [`BatchFetch`] behind the user-state loader. One batch
//! of composite keys is classified into buckets, every non-empty bucket is resolved
//! by its own task, and the partial results are merged by a single collector that
//! receives them over a channel.
//!
//! ```text
//!              ┌─ foreign_id ───────► twitch, youtube, ... ─┐
//! keys ─► classify ─ foreign_username ► twitch, youtube, ... ─┼─► collector ─► Batch
//!              ├─ id ───────────────► users_by_id ───────────┤
//!              └─ username ─────────► users_by_username ─────┘
//! ```
//!
//! Failures stay inside their bucket: a backend error stops that bucket's remaining
//! platform groups and is attached to its unresolved keys, while sibling buckets
//! keep whatever they resolved.

use crate::clients::{Lookup, StoreError, UserStore};
use crate::framework::{Batch, BatchFetch};
use crate::model::{Platform, User};
use crate::user_state::identifier::{group_by_platform, Buckets, Classified, IdentifierBucket};
use crate::user_state::UserStateError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

pub type UserStateBatch = Batch<String, User, UserStateError>;

/// Resolves composite user-state keys against a [`UserStore`].
#[derive(Clone)]
pub struct UserStateFetcher {
    store: Arc<dyn UserStore>,
}

impl UserStateFetcher {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFetch for UserStateFetcher {
    type Key = String;
    type Value = User;
    type Error = UserStateError;

    #[instrument(skip_all, fields(batch_size = keys.len()))]
    async fn fetch(&self, keys: Vec<String>) -> UserStateBatch {
        let buckets = Buckets::from_keys(&keys);
        if !buckets.dropped().is_empty() {
            debug!(dropped = buckets.dropped().len(), "Unclassified keys dropped");
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<UserStateBatch>();
        let mut tasks = Vec::new();
        for (bucket, entries) in buckets.into_groups() {
            let bucket_keys: Vec<String> = entries.iter().map(|entry| entry.key.clone()).collect();
            let store = Arc::clone(&self.store);
            let tx = tx.clone();
            let handle = tokio::spawn(async move {
                let partial = resolve_bucket(store.as_ref(), bucket, entries).await;
                let _ = tx.send(partial);
            });
            tasks.push((bucket, bucket_keys, handle));
        }
        drop(tx);

        let collector = async move {
            let mut merged = UserStateBatch::new();
            while let Some(partial) = rx.recv().await {
                merged.merge(partial);
            }
            merged
        };
        let joined = futures::future::join_all(
            tasks
                .into_iter()
                .map(|(bucket, keys, handle)| async move { (bucket, keys, handle.await) }),
        );
        let (mut merged, joined) = tokio::join!(collector, joined);

        for (bucket, keys, outcome) in joined {
            if let Err(join_error) = outcome {
                error!(%bucket, error = %join_error, "Bucket task failed");
                let mut failed = UserStateBatch::new();
                for key in keys {
                    failed.insert_error(
                        key,
                        UserStateError::TaskFailed {
                            bucket,
                            reason: join_error.to_string(),
                        },
                    );
                }
                merged.merge(failed);
            }
        }

        debug!(
            resolved = merged.values.len(),
            failed = merged.errors.len(),
            "Fan-out complete"
        );
        merged
    }
}

async fn resolve_bucket(
    store: &dyn UserStore,
    bucket: IdentifierBucket,
    entries: Vec<Classified>,
) -> UserStateBatch {
    if bucket.is_foreign() {
        resolve_foreign(store, bucket, entries).await
    } else {
        resolve_internal(store, bucket, entries).await
    }
}

/// One store call per platform group; stops at the first backend error.
async fn resolve_foreign(
    store: &dyn UserStore,
    bucket: IdentifierBucket,
    entries: Vec<Classified>,
) -> UserStateBatch {
    let mut batch = UserStateBatch::new();
    let mut groups = group_by_platform(entries).into_iter();

    while let Some((platform, group)) = groups.next() {
        let values = values_of(&group);
        let lookup = match bucket {
            IdentifierBucket::ForeignId => store.users_by_connection_id(&platform, &values).await,
            _ => store.users_by_connection_username(&platform, &values).await,
        };
        debug!(
            %bucket,
            %platform,
            requested = values.len(),
            found = lookup.users.len(),
            "Platform group resolved"
        );

        match_foreign(&mut batch, bucket, &platform, &group, &lookup.users);

        if let Some(source) = first_failure(lookup) {
            error!(%bucket, %platform, error = %source, "Lookup failed");
            let failure = UserStateError::Lookup {
                bucket,
                platform: Some(platform),
                source,
            };
            let unresolved = group.into_iter().chain(groups.by_ref().flat_map(|(_, g)| g));
            attach_failure(&mut batch, unresolved, &failure);
            break;
        }
    }
    batch
}

/// One store call for the whole bucket.
async fn resolve_internal(
    store: &dyn UserStore,
    bucket: IdentifierBucket,
    entries: Vec<Classified>,
) -> UserStateBatch {
    let mut batch = UserStateBatch::new();
    let values = values_of(&entries);
    let lookup = match bucket {
        IdentifierBucket::Id => store.users_by_id(&values).await,
        _ => store.users_by_username(&values).await,
    };

    for entry in &entries {
        let found = lookup.users.iter().find(|user| match bucket {
            IdentifierBucket::Id => user.id == entry.value,
            _ => user.username.eq_ignore_ascii_case(&entry.value),
        });
        if let Some(user) = found {
            batch.insert_value(entry.key.clone(), user.clone());
        }
    }

    if let Some(source) = first_failure(lookup) {
        error!(%bucket, error = %source, "Lookup failed");
        let failure = UserStateError::Lookup {
            bucket,
            platform: None,
            source,
        };
        attach_failure(&mut batch, entries, &failure);
    }
    batch
}

fn values_of(entries: &[Classified]) -> Vec<String> {
    entries.iter().map(|entry| entry.value.clone()).collect()
}

/// The first error that is not a plain "not found".
fn first_failure(lookup: Lookup) -> Option<StoreError> {
    lookup.errors.into_iter().find(|error| !error.is_not_found())
}

fn match_foreign(
    batch: &mut UserStateBatch,
    bucket: IdentifierBucket,
    platform: &Platform,
    group: &[Classified],
    users: &[User],
) {
    for entry in group {
        let found = users.iter().find(|user| {
            user.connections_on(platform).any(|conn| match bucket {
                IdentifierBucket::ForeignId => conn.id == entry.value,
                _ => conn.username.eq_ignore_ascii_case(&entry.value),
            })
        });
        if let Some(user) = found {
            batch.insert_value(entry.key.clone(), user.clone());
        }
    }
}

fn attach_failure(
    batch: &mut UserStateBatch,
    entries: impl IntoIterator<Item = Classified>,
    failure: &UserStateError,
) {
    for entry in entries {
        if !batch.values.contains_key(&entry.key) {
            batch.insert_error(entry.key, failure.clone());
        }
    }
}
