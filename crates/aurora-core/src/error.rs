//! Shared error type across Aurora crates.

use thiserror::Error;

use crate::exposition::ParseError;

/// Stable error codes, used as log fields and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Cannot begin watching the configured directory.
    Subscription,
    /// The notification mechanism reported an error mid-stream.
    Notification,
    /// A metrics file could not be read.
    Read,
    /// A metrics file does not conform to the exposition format.
    Parse,
    /// Invalid or unreadable configuration.
    Config,
    /// A metric name collides with the exporter's own instrumentation.
    ReservedName,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Subscription => "SUBSCRIPTION",
            ErrorCode::Notification => "NOTIFICATION",
            ErrorCode::Read => "READ",
            ErrorCode::Parse => "PARSE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::ReservedName => "RESERVED_NAME",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Whether the error must stop the caller (as opposed to being logged and skipped).
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::Subscription | ErrorCode::Config)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, AuroraError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum AuroraError {
    #[error("subscription failed: {0}")]
    Subscription(String),
    #[error("notification error: {0}")]
    Notification(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("reserved metric name: {0}")]
    ReservedName(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AuroraError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            AuroraError::Subscription(_) => ErrorCode::Subscription,
            AuroraError::Notification(_) => ErrorCode::Notification,
            AuroraError::Read(_) => ErrorCode::Read,
            AuroraError::Parse(_) => ErrorCode::Parse,
            AuroraError::Config(_) => ErrorCode::Config,
            AuroraError::ReservedName(_) => ErrorCode::ReservedName,
            AuroraError::Internal(_) => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposition::ParseErrorKind;

    #[test]
    fn parse_errors_convert_and_are_recoverable() {
        let err: AuroraError = ParseError::new(3, ParseErrorKind::MissingValue).into();
        assert_eq!(err.code(), ErrorCode::Parse);
        assert!(!err.code().is_fatal());
        assert_eq!(err.to_string(), "parse failed: line 3: missing sample value");
    }

    #[test]
    fn only_startup_errors_are_fatal() {
        assert!(AuroraError::Subscription("gone".into()).code().is_fatal());
        assert!(AuroraError::Config("bad".into()).code().is_fatal());
        assert!(!AuroraError::Read("denied".into()).code().is_fatal());
        assert!(!AuroraError::Notification("overflow".into()).code().is_fatal());
    }
}
