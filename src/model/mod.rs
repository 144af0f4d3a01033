//! Pure data structures shared by the bridge: users, command frames and push messages.

pub mod command;
pub mod message;
pub mod user;

pub use command::*;
pub use message::*;
pub use user::*;
