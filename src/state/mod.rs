//! Per-user mock state
//!
//! Owns the opaque state record of every provisioned user.

pub mod store;

pub use store::{SharedState, StateRecord, StateStore};
