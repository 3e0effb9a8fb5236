//! User provisioning
//!
//! Orchestrates the state store and the connection registry so that every
//! user id gets both resources together.

pub mod id;
pub mod registry;
pub mod results;

pub use id::{IdGenerator, UuidGenerator};
pub use registry::UserRegistry;
pub use results::AddUserResult;
