//! Error types for campus_select

use thiserror::Error;

/// A remote search or candidate computation failed
///
/// Fetch errors never escape a widget. They show up as an empty option list
/// plus a `Failed` status the host can render as "search failed".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure (connection refused, DNS, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service answered with an error status
    #[error("Remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// The request did not finish in time
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
}

/// Errors raised while configuring or driving a selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// A configuration value is out of range
    #[error("Invalid selector configuration: {0}")]
    InvalidConfig(String),

    /// The background search task has stopped
    #[error("Search driver is no longer running")]
    DriverStopped,
}

/// Result type for campus_select operations
pub type Result<T> = std::result::Result<T, SelectError>;
