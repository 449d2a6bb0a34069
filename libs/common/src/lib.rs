//! Shared infrastructure for the estate site services
//!
//! Database pooling and migrations, the Redis handle used for short-lived
//! state, and the error types both of them report.

pub mod cache;
pub mod database;
pub mod error;
