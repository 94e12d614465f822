//! Service layer
//!
//! Services hold the per-build work a worker performs once it decided to
//! sync: fetching every artifact of a build concurrently, and pruning cached
//! builds that fell out of the retention window.

pub mod download;
pub mod retention;

pub use download::{AggregateError, download_build};
pub use retention::remove_outdated_builds;
