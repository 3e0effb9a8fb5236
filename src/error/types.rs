//! Error types
//!
//! Defines domain-specific error types for each module of the server.

use std::fmt;
use std::io;
use std::net::SocketAddr;

/// State store errors
#[derive(Debug)]
pub enum StateError {
    CapacityExhausted(usize),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::CapacityExhausted(limit) => {
                write!(f, "State store is full ({} users)", limit)
            }
        }
    }
}

impl std::error::Error for StateError {}

/// Connection registry errors
#[derive(Debug)]
pub enum ConnectionError {
    CapacityExhausted(usize),
    NoAvailablePort,
    PortBindingFailed(SocketAddr, io::Error),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::CapacityExhausted(limit) => {
                write!(f, "Connection registry is full ({} endpoints)", limit)
            }
            ConnectionError::NoAvailablePort => {
                write!(f, "No available port for connection endpoint")
            }
            ConnectionError::PortBindingFailed(addr, e) => {
                write!(f, "Failed to bind to {}: {}", addr, e)
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Interaction log toggle errors
#[derive(Debug, PartialEq, Eq)]
pub enum ToggleError {
    /// Request body has no `enabled` key
    MissingState,
    /// `enabled` is present but not the expected boolean literal
    InvalidEnabledValue { expected: bool },
    /// Disable for a user that is not enabled
    UserNotFound(String),
}

impl fmt::Display for ToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleError::MissingState => {
                write!(f, "Did not find expected 'enabled' key within post body")
            }
            ToggleError::InvalidEnabledValue { expected } => {
                write!(f, "Enabled value must be {}", expected)
            }
            ToggleError::UserNotFound(_) => write!(f, "User not found in interactionService"),
        }
    }
}

impl std::error::Error for ToggleError {}

/// User registry (orchestration) errors
#[derive(Debug)]
pub enum RegistryError {
    State(StateError),
    Connection(ConnectionError),
    IdGenerationExhausted(usize),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::State(e) => write!(f, "{}", e),
            RegistryError::Connection(e) => write!(f, "{}", e),
            RegistryError::IdGenerationExhausted(attempts) => write!(
                f,
                "Could not generate an unused user id after {} attempts",
                attempts
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<StateError> for RegistryError {
    fn from(error: StateError) -> Self {
        RegistryError::State(error)
    }
}

impl From<ConnectionError> for RegistryError {
    fn from(error: ConnectionError) -> Self {
        RegistryError::Connection(error)
    }
}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ServerError {
    Registry(RegistryError),
    Toggle(ToggleError),
    Config(config::ConfigError),
    IoError(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Registry(e) => write!(f, "Registry error: {}", e),
            ServerError::Toggle(e) => write!(f, "Interaction log error: {}", e),
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<RegistryError> for ServerError {
    fn from(error: RegistryError) -> Self {
        ServerError::Registry(error)
    }
}

impl From<ToggleError> for ServerError {
    fn from(error: ToggleError) -> Self {
        ServerError::Toggle(error)
    }
}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::IoError(error)
    }
}
