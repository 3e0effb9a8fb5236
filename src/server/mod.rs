//! Server core functionality
//!
//! HTTP listener, shared handler state, and the API routes exposing the
//! user registry and interaction log toggles.

pub mod core;
pub mod responses;
pub mod routes;

pub use self::core::{AppState, Server};
pub use routes::router;
