//! The main Error type for skillcraft

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for all skillcraft operations.
///
/// This error type provides:
/// - `kind`: What type of error occurred
/// - `message`: Human-readable description
/// - `status`: Whether the error is retryable
/// - `operation`: What operation caused the error
/// - `context`: Key-value pairs for debugging
/// - `source`: The underlying error (if any)
///
/// # Example
///
/// ```rust
/// use skillcraft_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::InferenceFailed, "model returned empty response")
///     .with_operation("planner::create_plan")
///     .with_status(ErrorStatus::Temporary)
///     .with_context("model", "gpt-4o")
///     .with_context("max_tokens", "1024");
///
/// assert_eq!(err.kind(), ErrorKind::InferenceFailed);
/// assert!(err.status().is_retryable());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up the first context value recorded under `key`
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the source error (if any)
    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the error status
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark as temporary (retryable)
    pub fn temporary(mut self) -> Self {
        self.status = ErrorStatus::Temporary;
        self
    }

    /// Mark as permanent (not retryable)
    pub fn permanent(mut self) -> Self {
        self.status = ErrorStatus::Permanent;
        self
    }

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    // =========================================================================
    // Status mutations
    // =========================================================================

    /// Mark as persistent after failed retries
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Convenient From implementations (be careful not to leak raw errors!)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an Unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Create an Unsupported error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an InvalidGoal error
    pub fn invalid_goal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGoal, message)
    }

    /// Create an InvalidPlan error
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPlan, message)
    }

    /// Create a FunctionNotFound error
    pub fn function_not_found(collection: Option<&str>, name: impl Into<String>) -> Self {
        let name = name.into();
        let qualified = match collection {
            Some(collection) => format!("{}.{}", collection, name),
            None => name.clone(),
        };
        let err = Self::new(
            ErrorKind::FunctionNotFound,
            format!("function '{}' not found", qualified),
        )
        .with_context("function", name);
        match collection {
            Some(collection) => err.with_context("collection", collection),
            None => err,
        }
    }

    /// Create a FunctionNotBound error
    pub fn function_not_bound(step: impl Into<String>) -> Self {
        let step = step.into();
        Self::new(
            ErrorKind::FunctionNotBound,
            format!("step '{}' has no function and no sub-steps", step),
        )
        .with_context("step", step)
    }

    /// Create a Cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an InferenceFailed error
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    /// Create a SerializationFailed error
    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationFailed, message)
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::InvalidPlan, "plan deserialized to null");
        assert_eq!(err.kind(), ErrorKind::InvalidPlan);
        assert_eq!(err.message(), "plan deserialized to null");
        assert_eq!(err.status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::FunctionInvokeFailed, "timeout")
            .with_operation("plan::invoke_next_step")
            .with_context("step", "FileIOSkill.WriteAsync")
            .with_context("step_index", "1");

        assert_eq!(err.operation(), "plan::invoke_next_step");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()[0], ("step", "FileIOSkill.WriteAsync".to_string()));
        assert_eq!(err.context_value("step_index"), Some("1"));
        assert_eq!(err.context_value("missing"), None);
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::IoFailed, "write failed")
            .with_operation("store::save")
            .with_operation("cli::plan");

        assert_eq!(err.operation(), "cli::plan");
        assert_eq!(err.context().len(), 1);
        assert_eq!(err.context()[0], ("called", "store::save".to_string()));
    }

    #[test]
    fn test_temporary_status() {
        let err = Error::new(ErrorKind::InferenceFailed, "rate limited");
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::InvalidGoal, "empty");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_persist() {
        let err = Error::new(ErrorKind::NetworkFailed, "connection refused").temporary();
        assert!(err.is_retryable());

        let err = err.persist();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), ErrorStatus::Persistent);
    }

    #[test]
    fn test_display() {
        let err = Error::new(ErrorKind::InferenceFailed, "model unavailable")
            .with_operation("semantic::invoke")
            .with_context("model", "claude-3")
            .with_context("attempt", "3");

        let display = format!("{}", err);
        assert!(display.contains("InferenceFailed"));
        assert!(display.contains("temporary"));
        assert!(display.contains("semantic::invoke"));
        assert!(display.contains("model: claude-3"));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = Error::function_not_found(Some("FileIOSkill"), "WriteAsync");
        assert_eq!(err.kind(), ErrorKind::FunctionNotFound);
        assert!(err.message().contains("FileIOSkill.WriteAsync"));
        assert_eq!(err.context_value("collection"), Some("FileIOSkill"));

        let err = Error::function_not_found(None, "Joke");
        assert!(err.message().contains("'Joke'"));
        assert_eq!(err.context_value("collection"), None);

        let err = Error::function_not_bound("FunSkill.Joke");
        assert_eq!(err.kind(), ErrorKind::FunctionNotBound);

        assert_eq!(Error::invalid_goal("empty").kind(), ErrorKind::InvalidGoal);
        assert_eq!(Error::cancelled("stop").kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_set_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::new(ErrorKind::FileNotFound, "plan.json not found").set_source(io_err);

        assert!(err.source_ref().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.operation(), "io");
    }
}
