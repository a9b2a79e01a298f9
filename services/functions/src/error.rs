//! services/functions/src/error.rs
//!
//! Defines the primary error type for the entire functions service.

use crate::config::ConfigError;
use herbwise_core::ports::PortError;

/// The primary error type for the `functions` service.
#[derive(Debug, thiserror::Error)]
pub enum FunctionsError {
    /// The environment was missing or malformed at startup.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A standard Input/Output error, e.g. binding the listen socket.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else that has no more specific home.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
