//! Core systems primitives for a low-latency trading platform: a bounded
//! single-producer/single-consumer ring, a bounded multi-producer/
//! multi-consumer ring (Vyukov ticket scheme), a fixed-capacity typed
//! memory pool, an asynchronous batching logger, and the pinned event loop
//! that composes them into a trade engine's hot path.
//!
//! Every allocation lives on the stack or in one of the fixed-capacity
//! arenas set up at construction; nothing on the hot path touches the
//! global allocator.

pub mod backoff;
pub mod config;
pub mod engine;
pub mod logger;
pub mod metrics;
pub mod mpmc;
pub mod pool;
pub mod spsc;
pub mod thread_pin;

mod invariants;

pub use backoff::Backoff;
pub use mpmc::Mpmc;
pub use pool::{Pool, ZeroPolicy};
pub use spsc::Spsc;
pub use thread_pin::pin_current_thread_to;
