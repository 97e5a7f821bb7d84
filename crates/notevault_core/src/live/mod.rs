//! Reactive read streams over the note store.
//!
//! # Responsibility
//! - Track which tables changed through per-table version counters.
//! - Re-run queries when a table they read changes and publish the result.
//!
//! # Invariants
//! - A stream holds the latest value and never re-emits an unchanged one.
//! - Dropping a stream stops its background task.
//! - Streams must be created inside a Tokio runtime.

mod query;
mod tracker;

pub use query::LiveQuery;
pub use tracker::{InvalidationTracker, Table, TableVersions};
