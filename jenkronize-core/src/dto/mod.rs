//! Data Transfer Objects
//!
//! Wire representations of the Jenkins JSON API. Only the fields the client
//! actually reads are modeled; everything else in the payload is ignored.

pub mod jenkins;
