//! Interaction log capture toggles
//!
//! Tracks which users have interaction logging enabled and with which
//! configuration.

pub mod toggle;
pub mod validation;

pub use toggle::InteractionLogToggle;
