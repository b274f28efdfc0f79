//! Unified error interface for warden.
//!
//! Every warden error type implements [`ErrorCode`] so callers get a
//! machine-readable code and a recoverability hint regardless of which
//! crate produced the error.
//!
//! Expected denials (permission denied, rate limited) are **not** errors:
//! they are values carried by the gatekeeper's decision. Only genuinely
//! exceptional failures, such as malformed role data or configuration,
//! implement this trait.
//!
//! # Example
//!
//! ```
//! use warden_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum SourceError {
//!     Missing(String),
//!     Busy,
//! }
//!
//! impl ErrorCode for SourceError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Missing(_) => "SOURCE_MISSING",
//!             Self::Busy => "SOURCE_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! let err = SourceError::Busy;
//! assert_eq!(err.code(), "SOURCE_BUSY");
//! assert!(err.is_recoverable());
//! ```

/// Machine-readable error code interface.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**, e.g. `"INDEX_UNKNOWN_GRANT"`
/// - **Prefixed by crate area**: `INDEX_`, `CONFIG_`
/// - **Stable**: codes are part of the administrative API contract
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying (or fixing input and retrying) may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows warden conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use warden_types::{assert_error_code, ErrorCode};
///
/// struct Broken;
///
/// impl ErrorCode for Broken {
///     fn code(&self) -> &'static str { "INDEX_BROKEN" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&Broken, "INDEX_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Asserts [`assert_error_code`] for every error in `errors`.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
