#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Cosmetics Bridge
//!
//! > **The event-bridge command processor of a real-time cosmetics backend.**
//!
//! Other processes publish `"<command>:<json>"` frames on a pub/sub channel. The
//! bridge decodes them, resolves the users they mention through a batching loader,
//! and whispers one push message per result back to the session that asked.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why a batching loader?
//!
//! Cosmetics requests arrive in bursts: many sessions join a channel at once and each
//! asks about the same handful of users. The loader turns that burst into one store
//! round-trip per lookup strategy:
//! - **Coalescing**: every concurrent request for a key waits on the same fetch.
//! - **Bounded latency**: a batch never waits longer than its window.
//! - **Isolation**: the loader is an actor; its state is never shared behind a lock.
//!
//! ## 🚀 Core Concepts
//!
//! ### Generics: The Power of `F`
//! You'll see `BatchLoader<F: BatchFetch>` in the engine. The loader only knows how to
//! *group* keys; what a key means is up to the fetcher. The user-state fan-out is one
//! fetcher, and [`framework::mock::MockFetch`] is another.
//!
//! ### Keys as a micro-syntax
//! User-state keys look like `twitch|id:123` or `|username:bob`. See
//! [`user_state::identifier`] for the four buckets they classify into.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Partial failure
//! Each lookup bucket runs as its own task and reports through a channel. A failing
//! platform poisons only the keys it was responsible for.
//!
//! ### 2. Cancellation
//! Every dispatched command runs inside a [`bridge::CommandContext`] that carries the
//! session id and is cancelled by a guard when the dispatch ends.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured fields. See [`lifecycle::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! - **Role**: Generic batching, coalescing and caching.
//! - **Key items**: [`BatchFetch`](framework::BatchFetch), [`BatchLoader`](framework::BatchLoader),
//!   [`LoaderClient`](framework::LoaderClient).
//!
//! ### 2. The Fan-out ([`user_state`])
//! - **Role**: Classifies keys and resolves them against the user store.
//! - **Key items**: [`UserStateFetcher`](user_state::UserStateFetcher), [`classify`](user_state::classify).
//!
//! ### 3. The Bridge ([`bridge`])
//! - **Role**: Subscription loop, routing and command handlers.
//! - **Key items**: [`Dispatcher`](bridge::Dispatcher), [`CosmeticsHandler`](bridge::CosmeticsHandler).
//!
//! ### 4. The Interface ([`clients`])
//! - **Role**: Traits for the store, push sink, pub/sub and modelizer, with in-memory implementations.
//!
//! ### 5. The Orchestrator ([`lifecycle`])
//! - **Role**: Configuration, tracing setup, startup and graceful shutdown.
//! - **Key items**: [`BridgeSystem`](lifecycle::BridgeSystem), [`BridgeConfig`](lifecycle::BridgeConfig).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod bridge;
pub mod clients;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod user_state;
