//! Core domain types
//!
//! These types are shared between the client (which produces builds and
//! artifacts from API responses) and the tracker (which records and persists
//! the last synchronized build of every tracked job).

pub mod build;
pub mod job;
