//! # Observability & Tracing
//!
//! [`setup_tracing`] installs structured logging for the bridge.
//!
//! Log lines carry structured fields rather than prose, so the workflow of one frame
//! can be followed by filtering on them:
//!
//! - **Loader**: `fetcher_type`, `batch_size`, `key`
//! - **Fan-out**: `bucket`, `platform`, `requested`, `found`
//! - **Dispatch**: `command`, `session_id`
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle and batch dispatch (default)
//! RUST_LOG=info cargo run
//!
//! # Per-key cache hits, platform groups, delivered messages
//! RUST_LOG=debug cargo run
//!
//! # Only the loader
//! RUST_LOG=cosmetics_bridge::framework=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` one bridged request reads like:
//!
//! ```text
//! INFO Loader started fetcher_type="UserStateFetcher" wait_ms=250
//! INFO Subscribed channel="events:eventapi:bridge"
//! INFO Dispatcher started max_in_flight=64
//! INFO Dispatching batch fetcher_type="UserStateFetcher" batch_size=3
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins; without it the level is `info`.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
