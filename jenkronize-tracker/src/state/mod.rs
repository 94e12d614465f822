//! Persisted tracker state
//!
//! The state file maps every tracked job's name to its last synced build. It
//! is read once at startup and rewritten after every successful sync by a
//! single writer task, so concurrent workers never race on the file.

mod store;
mod writer;

pub use store::{Snapshot, StateError, StateStore, reconcile};
pub use writer::{StateHandle, StateWriter};
