//! Error kinds for skillcraft operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases,
/// e.g. telling a malformed model answer (`InvalidPlan`) apart from a failing
/// step (`FunctionInvokeFailed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    /// Invalid argument passed to a function
    InvalidArgument,

    // =========================================================================
    // Planning errors
    // =========================================================================
    /// The goal handed to a planner was empty
    InvalidGoal,

    /// The planner response (or a persisted plan) could not be turned into a plan
    InvalidPlan,

    /// A function was not found in the registry
    FunctionNotFound,

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// A plan step failed while running
    FunctionInvokeFailed,

    /// A step has neither a bound function nor sub-steps
    FunctionNotBound,

    /// Execution was cancelled before the next step started
    Cancelled,

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Stored plan not found
    StorageNotFound,

    /// Storage operation failed
    StorageFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed
    InferenceFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Planning
            ErrorKind::InvalidGoal => "InvalidGoal",
            ErrorKind::InvalidPlan => "InvalidPlan",
            ErrorKind::FunctionNotFound => "FunctionNotFound",

            // Execution
            ErrorKind::FunctionInvokeFailed => "FunctionInvokeFailed",
            ErrorKind::FunctionNotBound => "FunctionNotBound",
            ErrorKind::Cancelled => "Cancelled",

            // Storage
            ErrorKind::StorageNotFound => "StorageNotFound",
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
