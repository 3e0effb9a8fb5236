//! Error handling
//!
//! Defines error types and their mapping onto API responses.

pub mod handlers;
pub mod types;

pub use types::*;
