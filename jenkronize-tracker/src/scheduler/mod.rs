//! Scheduler layer
//!
//! The tracker owns the configured jobs and runs one independent worker per
//! job. Each worker polls its job, downloads new builds and applies
//! retention, sharing only the alert flags and the state writer with the
//! others.

mod alerts;
mod tracker;
mod worker;

pub use alerts::Alerts;
pub use tracker::Tracker;
pub use worker::{JobWorker, WorkerContext};
