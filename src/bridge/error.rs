use crate::clients::PubSubError;
use crate::model::FrameError;
use thiserror::Error;

/// Errors raised while decoding or handling a bridged command, or while subscribing.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Loader unavailable: {0}")]
    Loader(String),

    #[error(transparent)]
    Subscribe(#[from] PubSubError),
}
