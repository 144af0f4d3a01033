//! # Event Bridge
//!
//! Turns `"<command>:<json>"` frames from the bridge channel into session-targeted
//! push messages.

pub mod context;
pub mod cosmetics;
pub mod dispatcher;
pub mod error;

pub use context::{CancelGuard, CommandContext, RootContext};
pub use cosmetics::CosmeticsHandler;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::BridgeError;
