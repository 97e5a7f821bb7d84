//! In-memory note state for the UI layer.
//!
//! # Responsibility
//! - Hold observable snapshots (all notes, favorites, the open note).
//! - Route UI actions to the data services and refresh affected snapshots.
//!
//! # Invariants
//! - A failed write leaves every snapshot untouched.
//! - Subscriptions live until the synchronizer is closed or dropped.

mod note_sync;

pub use note_sync::{NoteSynchronizer, SyncError, SyncResult};
