//! Error types for the window dispatch engine.
//!
//! Failures are reported twice: the failing operation returns a
//! [`WindowError`], and the context records the matching [`ErrorCode`] in its
//! last-error slot so it can be inspected later through
//! [`WindowContext::last_error`](crate::WindowContext::last_error).

use std::cell::Cell;
use std::fmt;

use thiserror::Error;

use crate::backend::WindowHandle;
use crate::logging::targets;

/// Closed set of error codes kept in the last-error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ErrorCode {
    /// No error has occurred.
    #[default]
    None = 0,
    /// The native window could not be created.
    CreateWindowFailed = 1,
    /// The per-window state could not be allocated after the native window
    /// was created. The native window is destroyed again.
    AllocateStateFailed = 2,
    /// The one-time window class registration failed.
    RegisterClassFailed = 3,
}

impl ErrorCode {
    /// Convert a raw code back into an [`ErrorCode`].
    ///
    /// Returns `None` for values outside the defined range.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::CreateWindowFailed),
            2 => Some(Self::AllocateStateFailed),
            3 => Some(Self::RegisterClassFailed),
            _ => None,
        }
    }

    /// The raw numeric value of this code.
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Human-readable message for this code.
    pub fn message(self) -> &'static str {
        error_message(self.as_raw())
    }

    /// Whether this code denotes an actual failure.
    pub fn is_error(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Message returned by [`error_message`] for codes outside the defined set.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Return the fixed message for a raw error code.
///
/// Any value that is not one of the [`ErrorCode`] discriminants yields
/// [`UNKNOWN_ERROR_MESSAGE`].
pub fn error_message(code: u32) -> &'static str {
    match ErrorCode::from_raw(code) {
        Some(ErrorCode::None) => "No error",
        Some(ErrorCode::CreateWindowFailed) => "Failed to create window",
        Some(ErrorCode::AllocateStateFailed) => "Failed to allocate window state",
        Some(ErrorCode::RegisterClassFailed) => "Failed to register window class",
        None => UNKNOWN_ERROR_MESSAGE,
    }
}

/// Errors reported by a [`NativeBackend`](crate::NativeBackend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The native window system rejected the request.
    #[error("native call failed: {0}")]
    Os(String),

    /// A window class with this name is already registered.
    #[error("window class `{0}` is already registered")]
    ClassExists(String),

    /// No window class with this name has been registered.
    #[error("window class `{0}` is not registered")]
    UnknownClass(String),

    /// The handle does not refer to a live native window.
    #[error("invalid window handle {0}")]
    InvalidWindow(WindowHandle),

    /// The backend does not support the requested operation.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

/// Errors returned by [`WindowContext`](crate::WindowContext) operations.
#[derive(Error, Debug)]
pub enum WindowError {
    /// The native window could not be created.
    #[error("failed to create window: {0}")]
    CreateWindow(#[source] BackendError),

    /// The per-window state could not be allocated.
    #[error("failed to allocate window state")]
    AllocateState,

    /// The window class could not be registered.
    ///
    /// Registration is attempted once per context; every creation after a
    /// failed registration reports this error without retrying.
    #[error("failed to register window class `{class}`")]
    RegisterClass {
        /// Name of the class that failed to register.
        class: String,
    },
}

impl WindowError {
    /// The last-error code that corresponds to this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CreateWindow(_) => ErrorCode::CreateWindowFailed,
            Self::AllocateState => ErrorCode::AllocateStateFailed,
            Self::RegisterClass { .. } => ErrorCode::RegisterClassFailed,
        }
    }
}

/// A specialized Result type for window operations.
pub type Result<T> = std::result::Result<T, WindowError>;

/// The last-error slot of a context.
///
/// Overwritten by every failing operation, never accumulated.
#[derive(Debug, Default)]
pub(crate) struct ErrorRegistry {
    last: Cell<ErrorCode>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, code: ErrorCode) {
        tracing::debug!(target: targets::CORE, ?code, "recording last error");
        self.last.set(code);
    }

    pub fn last(&self) -> ErrorCode {
        self.last.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        for code in [
            ErrorCode::None,
            ErrorCode::CreateWindowFailed,
            ErrorCode::AllocateStateFailed,
            ErrorCode::RegisterClassFailed,
        ] {
            assert_eq!(ErrorCode::from_raw(code.as_raw()), Some(code));
        }
        assert_eq!(ErrorCode::from_raw(4), None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(error_message(0), "No error");
        assert_eq!(error_message(1), "Failed to create window");
        assert_eq!(error_message(2), "Failed to allocate window state");
        assert_eq!(error_message(3), "Failed to register window class");
        assert_eq!(error_message(4), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(u32::MAX), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(ErrorCode::RegisterClassFailed.to_string(), "Failed to register window class");
    }

    #[test]
    fn test_window_error_codes() {
        let err = WindowError::CreateWindow(BackendError::Os("refused".into()));
        assert_eq!(err.code(), ErrorCode::CreateWindowFailed);
        assert!(std::error::Error::source(&err).is_some());

        assert_eq!(WindowError::AllocateState.code(), ErrorCode::AllocateStateFailed);
        let err = WindowError::RegisterClass {
            class: "main".into(),
        };
        assert_eq!(err.code(), ErrorCode::RegisterClassFailed);
        assert_eq!(err.to_string(), "failed to register window class `main`");
    }

    #[test]
    fn test_registry_overwrites() {
        let registry = ErrorRegistry::new();
        assert_eq!(registry.last(), ErrorCode::None);
        assert!(!registry.last().is_error());

        registry.record(ErrorCode::CreateWindowFailed);
        registry.record(ErrorCode::AllocateStateFailed);
        assert_eq!(registry.last(), ErrorCode::AllocateStateFailed);
    }
}
