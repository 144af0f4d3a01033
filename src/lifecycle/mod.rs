//! Runtime orchestration and lifecycle management.
//!
//! # Main Components
//!
//! - [`BridgeSystem`] - Starts, wires and shuts down the bridge tasks
//! - [`BridgeConfig`] - Environment-driven settings
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod bridge_system;
pub mod config;
pub mod tracing;

pub use bridge_system::*;
pub use config::*;
pub use self::tracing::*;
