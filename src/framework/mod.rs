//! Generic batching loader.
//!
//! This module provides the request-coalescing engine the bridge uses to turn many
//! concurrent single-key lookups into a few bulk fetches.
//!
//! # Main Components
//!
//! - [`BatchFetch`] - Trait that bulk lookup strategies implement to be driven by a loader
//! - [`BatchLoader`] - The loader task that owns the pending batch, waiters and cache
//! - [`LoaderClient`] - Cloneable handle used by callers to `load` / `load_all`
//! - [`LoaderError`] - Errors delivered to waiters
//!
//! # Testing
//!
//! See [`mock`] module for a recording fetcher with a fluent expectation API.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use core::*;
