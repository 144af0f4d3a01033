use crate::clients::StoreError;
use crate::model::Platform;
use crate::user_state::IdentifierBucket;
use thiserror::Error;

/// Per-key error produced by the user-state fan-out.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserStateError {
    /// A store lookup failed; attached to every key its bucket had not resolved.
    #[error("{bucket} lookup failed: {source}")]
    Lookup {
        bucket: IdentifierBucket,
        platform: Option<Platform>,
        source: StoreError,
    },

    /// The bucket task died before reporting.
    #[error("{bucket} task failed: {reason}")]
    TaskFailed {
        bucket: IdentifierBucket,
        reason: String,
    },
}
