// crates/geotiles-core/src/sync/mod.rs

//! # Synchronization
//!
//! Retry with exponential backoff ([`retry`]) and the bounded-concurrency
//! pool that publishes artifacts ([`SyncOrchestrator`]).

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{JobOutcome, JobTarget, SyncJob, SyncOrchestrator, SyncReport};
pub use retry::{retry, Attempted, RetryPolicy};
