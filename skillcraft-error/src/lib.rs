//! # skillcraft-error
//!
//! Unified error handling for skillcraft, following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., InvalidPlan, FunctionInvokeFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use skillcraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::FunctionNotFound, "function 'WriteAsync' not found")
//!         .with_operation("planner::create_plan")
//!         .with_context("collection", "FileIOSkill")
//!         .with_context("function", "WriteAsync"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, skillcraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using skillcraft Error
pub type Result<T> = std::result::Result<T, Error>;
