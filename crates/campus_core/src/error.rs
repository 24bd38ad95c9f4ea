//! Error types for campus_core

use thiserror::Error;

/// Errors raised by the core primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A key name in a script or binding could not be parsed
    #[error("Unknown key name: {0}")]
    UnknownKey(String),
}

/// Result type for campus_core operations
pub type Result<T> = std::result::Result<T, CoreError>;
