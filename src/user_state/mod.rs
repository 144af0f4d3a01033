//! # User-State Loader
//!
//! Wires the generic [`BatchLoader`](crate::framework::BatchLoader) to the user-state
//! fan-out: composite keys in, [`User`](crate::model::User)s out.

pub mod error;
pub mod fetcher;
pub mod identifier;

pub use error::UserStateError;
pub use fetcher::{UserStateBatch, UserStateFetcher};
pub use identifier::{classify, compose_key, Buckets, Classified, IdentifierBucket};

use crate::clients::UserStore;
use crate::framework::{BatchLoader, LoaderClient, LoaderConfig};
use std::sync::Arc;

/// Client handle of the user-state loader.
pub type UserStateLoader = LoaderClient<UserStateFetcher>;

/// Creates the user-state loader task and its client. Spawn the task with `run()`.
pub fn new_loader(
    store: Arc<dyn UserStore>,
    config: LoaderConfig,
) -> (BatchLoader<UserStateFetcher>, UserStateLoader) {
    BatchLoader::new(UserStateFetcher::new(store), config)
}
