//! Error types for telemetry clients.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors fall into
//! three broad kinds, exposed through [`TelemetryError::kind`]:
//!
//! - [`ErrorKind::NotFound`]: a missing file, registry entry or session string
//! - [`ErrorKind::NotImplemented`]: an operation the client variant cannot perform
//! - [`ErrorKind::General`]: parse failures, I/O failures and malformed headers
//!
//! Conditions that are absent but not erroneous (an unknown channel name, an
//! out-of-range array entry, no session info parsed yet) are reported as
//! `None` by the client accessors instead.
//!
//! ```rust
//! use paddock::{ErrorKind, TelemetryError};
//!
//! let error = TelemetryError::not_found("session info string");
//! assert_eq!(error.kind(), ErrorKind::NotFound);
//! assert!(!error.is_retryable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Coarse classification of a [`TelemetryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotImplemented,
    General,
}

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("{operation} is not implemented for {client}")]
    NotImplemented { operation: String, client: String },

    #[error("Failed to connect to telemetry source: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IBT file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SDK version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },

    #[error("Memory access violation at offset {offset:#x}")]
    Memory { offset: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },

    #[error("Buffer operation failed: {context}")]
    Buffer { context: String },
}

impl TelemetryError {
    /// Classify this error into the three-way taxonomy used by callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TelemetryError::NotFound { .. } => ErrorKind::NotFound,
            TelemetryError::NotImplemented { .. } => ErrorKind::NotImplemented,
            TelemetryError::File { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                ErrorKind::NotFound
            }
            _ => ErrorKind::General,
        }
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::Timeout { .. } => true,
            TelemetryError::Buffer { .. } => true,
            TelemetryError::NotFound { .. } => false,
            TelemetryError::NotImplemented { .. } => false,
            TelemetryError::Memory { .. } => false,
            TelemetryError::File { .. } => false,
            TelemetryError::Version { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::NotFound { .. } => vec![
                "Check the file path or client identifier",
                "Wait for the simulator to publish session info",
            ],
            TelemetryError::NotImplemented { .. } => vec![
                "Use a live client for broadcast and wait operations",
                "Use a disk client for seeking and sample cursors",
            ],
            TelemetryError::Connection { .. } => vec![
                "Ensure iRacing is running",
                "Check Windows permissions for shared memory access",
                "Try restarting iRacing",
            ],
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Verify IBT file format and version",
                "Check file permissions",
            ],
            TelemetryError::Memory { .. } => vec![
                "Check memory access bounds",
                "Verify shared memory is still valid",
            ],
            TelemetryError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Verify iRacing is responding",
            ],
            TelemetryError::Version { .. } => vec![
                "Update iRacing to latest version",
                "Update library to compatible version",
            ],
            TelemetryError::Parse { .. } => vec![
                "Verify source data integrity",
                "Check the session YAML for unsupported constructs",
            ],
            TelemetryError::UnsupportedPlatform { .. } => vec![
                "Use IBT file playback on this platform",
                "Use an in-process memory source for testing",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
            TelemetryError::Buffer { .. } => vec![
                "Check buffer capacity",
                "Verify buffer access patterns",
            ],
        }
    }

    /// Helper constructor for missing resources.
    pub fn not_found(what: impl Into<String>) -> Self {
        TelemetryError::NotFound { what: what.into() }
    }

    /// Helper constructor for operations a client variant does not support.
    pub fn not_implemented(operation: impl Into<String>, client: impl Into<String>) -> Self {
        TelemetryError::NotImplemented { operation: operation.into(), client: client.into() }
    }

    /// Helper constructor for parse failures.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for memory access errors.
    pub fn memory_access_error(offset: usize) -> Self {
        TelemetryError::Memory { offset }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for buffer operation errors.
    pub fn buffer_operation_error(context: impl Into<String>) -> Self {
        TelemetryError::Buffer { context: context.into() }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        TelemetryError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Parse { context: "Session YAML".to_string(), details: err.to_string() }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            what in "\\w+",
            details in ".*",
            offset in 0usize..0x10000usize,
        ) {
            let missing = TelemetryError::not_found(what.clone());
            prop_assert!(missing.to_string().contains(&what));

            let parse = TelemetryError::parse_error("YAML", details.clone());
            prop_assert!(parse.to_string().contains(&details));

            let memory = TelemetryError::memory_access_error(offset);
            let offset_hex = format!("{:#x}", offset);
            prop_assert!(memory.to_string().contains(&offset_hex));
        }
    }

    #[test]
    fn kinds_follow_the_three_way_taxonomy() {
        assert_eq!(TelemetryError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(
            TelemetryError::not_implemented("broadcast", "disk").kind(),
            ErrorKind::NotImplemented
        );
        assert_eq!(TelemetryError::parse_error("a", "b").kind(), ErrorKind::General);
        assert_eq!(TelemetryError::Version { expected: 2, found: 1 }.kind(), ErrorKind::General);
    }

    #[test]
    fn missing_file_io_errors_classify_as_not_found() {
        let err = TelemetryError::file_error(
            PathBuf::from("/nope.ibt"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = TelemetryError::file_error(
            PathBuf::from("/locked.ibt"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
        );
        assert_eq!(err.kind(), ErrorKind::General);
    }

    #[test]
    fn yaml_errors_become_parse_errors() {
        let yaml_err = serde_yaml_ng::from_str::<i32>("[unclosed").unwrap_err();
        let err: TelemetryError = yaml_err.into();
        assert!(matches!(err, TelemetryError::Parse { .. }));
        assert_eq!(err.kind(), ErrorKind::General);
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();
    }

    #[test]
    fn recovery_methods_work() {
        let connection_error = TelemetryError::connection_failed("test");
        let memory_error = TelemetryError::memory_access_error(0x1000);

        assert!(connection_error.is_retryable());
        assert!(!memory_error.is_retryable());

        for suggestion in connection_error.recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
        assert!(!TelemetryError::not_found("x").recovery_suggestions().is_empty());
    }
}
