//! External collaborators of the bridge, each behind a trait, with in-memory
//! implementations for the demo and tests.

pub mod modelizer;
pub mod pubsub;
pub mod push;
pub mod store;

pub use modelizer::*;
pub use pubsub::*;
pub use push::*;
pub use store::*;
