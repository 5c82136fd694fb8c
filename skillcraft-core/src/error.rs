//! Skillcraft error types
//!
//! Re-exports skillcraft-error and provides plan/skill specific conveniences.

// Re-export the core error types
pub use skillcraft_error::{Error, ErrorKind, ErrorStatus, Result};

// =============================================================================
// Plan/skill specific error constructors
// =============================================================================

/// Create a FunctionNotFound error
pub fn function_not_found(collection: Option<&str>, name: impl Into<String>) -> Error {
    Error::function_not_found(collection, name)
}

/// Create a FunctionNotBound error
pub fn function_not_bound(step: impl Into<String>) -> Error {
    Error::function_not_bound(step)
}

/// Create a FunctionInvokeFailed error for the step at `index`.
///
/// The underlying cause is attached as the source; its message is repeated in
/// ours so a single-line log still says why the step failed.
pub fn step_failed(step: impl Into<String>, index: usize, cause: Error) -> Error {
    let step = step.into();
    Error::new(
        ErrorKind::FunctionInvokeFailed,
        format!(
            "error occurred while running plan step '{}': {}",
            step,
            cause.message()
        ),
    )
    .with_context("step", step)
    .with_context("step_index", index.to_string())
    .with_context("cause_kind", cause.kind().as_str())
    .set_source(cause)
}

/// Create a Cancelled error
pub fn cancelled(at_step: usize) -> Error {
    Error::cancelled(format!("execution cancelled before step {}", at_step))
        .with_context("step_index", at_step.to_string())
}

/// Create an InvalidPlan error
pub fn invalid_plan(message: impl Into<String>) -> Error {
    Error::invalid_plan(message)
}

/// Create a SerializationFailed error
pub fn serialization_error(message: impl Into<String>) -> Error {
    Error::serialization_failed(message)
}

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create a StorageNotFound error
pub fn storage_not_found(key: impl Into<String>) -> Error {
    let key = key.into();
    Error::new(ErrorKind::StorageNotFound, format!("stored plan '{}' not found", key))
        .with_context("key", key)
}

/// Create a StorageFailed error
pub fn storage_failed(reason: impl Into<String>) -> Error {
    Error::new(ErrorKind::StorageFailed, reason)
}

/// Create an InvalidArgument error
pub fn invalid_argument(message: impl Into<String>) -> Error {
    Error::invalid_argument(message)
}

/// Create a missing-variable error for native functions that require an argument
pub fn missing_variable(function: &str, variable: &str) -> Error {
    Error::invalid_argument(format!("'{}' requires variable '{}'", function, variable))
        .with_context("function", function.to_string())
        .with_context("variable", variable.to_string())
}
