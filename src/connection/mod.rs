//! Per-user connection endpoints
//!
//! Handles endpoint allocation, bookkeeping, and event delivery to
//! subscribers of each user's channel.

pub mod endpoint;
pub mod registry;

pub use endpoint::{ConnectionEndpoint, EndpointAddress};
pub use registry::ConnectionRegistry;
