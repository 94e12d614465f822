//! Jenkronize Core
//!
//! Core types shared by the Jenkronize CI client and the tracker daemon.
//!
//! This crate contains:
//! - Domain types: tracked jobs, builds and artifacts
//! - DTOs: the Jenkins JSON API payloads the client deserializes

pub mod domain;
pub mod dto;
