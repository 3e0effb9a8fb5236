//! Error handlers
//!
//! Maps errors onto HTTP status codes and the wire `errorCode` values.

use crate::error::types::{RegistryError, ServerError, ToggleError};
use log::{error, warn};

/// Log a server error at a level matching who caused it
pub fn handle_error(err: &ServerError) {
    match error_to_status(err) {
        400..=499 => warn!("Request rejected: {}", err),
        _ => error!("Server error: {}", err),
    }
}

/// Convert error to HTTP status code
pub fn error_to_status(err: &ServerError) -> u16 {
    match err {
        ServerError::Toggle(_) => 400,
        ServerError::Registry(RegistryError::State(_)) => 400,
        ServerError::Registry(RegistryError::Connection(_)) => 400,
        ServerError::Registry(RegistryError::IdGenerationExhausted(_)) => 500,
        ServerError::Config(_) => 500,
        ServerError::IoError(_) => 500,
    }
}

/// Convert error to the `errorCode` reported to clients
pub fn error_to_code(err: &ServerError) -> &'static str {
    match err {
        ServerError::Toggle(ToggleError::MissingState) => "MISSING-STATE",
        ServerError::Toggle(ToggleError::InvalidEnabledValue { .. }) => "INVALID-ENABLED-VALUE",
        ServerError::Toggle(ToggleError::UserNotFound(_)) => "USER-NOT-FOUND",
        ServerError::Registry(RegistryError::State(_))
        | ServerError::Registry(RegistryError::Connection(_)) => "Cannot add user",
        ServerError::Registry(RegistryError::IdGenerationExhausted(_))
        | ServerError::Config(_)
        | ServerError::IoError(_) => "INTERNAL-ERROR",
    }
}

/// Message reported to clients: the underlying error without its category
pub fn error_to_message(err: &ServerError) -> String {
    match err {
        ServerError::Registry(e) => e.to_string(),
        ServerError::Toggle(e) => e.to_string(),
        ServerError::Config(_) | ServerError::IoError(_) => "Internal server error".to_string(),
    }
}
