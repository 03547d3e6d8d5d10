//! txgate — library crate for integration testing.
//!
//! Re-exports modules needed by integration tests in `tests/`.

pub mod api;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod notification;
pub mod policy;
pub mod queue;
pub mod spend;
pub mod store;
