//! Repository layer
//!
//! Repositories abstract communication with the CI server behind a trait so
//! the scheduler can be driven by an in-memory fake in tests. They hold no
//! business logic of their own.

mod builds;

pub use builds::BuildSource;
pub use builds::HttpBuildSource;
