//! Error types for the clamstream library.
//!
//! Errors fall into two classes that callers must treat differently:
//!
//! - **Connection class** (`ConnectionFailed`, `Timeout`, `Io`,
//!   `SessionClosed`): the transport is no longer trustworthy. The session
//!   must be closed and reopened before the next unit of work.
//! - **Protocol class** (`Protocol`): the daemon answered but the reply could
//!   not be interpreted. Only the current item failed; the session is intact.
//!
//! The library never panics; all errors are returned as `Result` values.

use std::time::Duration;
use thiserror::Error;

/// The main error type for session and scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Failed to connect to the daemon, or a write on the session failed.
    #[error("connection to clamd at {address} failed: {message}")]
    ConnectionFailed {
        /// Address of the daemon (`host:port` or socket path).
        address: String,
        /// Error message describing the failure.
        message: String,
    },

    /// A connect, write or read did not complete within the configured timeout.
    #[error("clamd operation '{operation}' timed out after {elapsed:?}")]
    Timeout {
        /// The operation that stalled (e.g. "connect", "read reply").
        operation: &'static str,
        /// The timeout that elapsed.
        elapsed: Duration,
    },

    /// An I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A command was attempted while the session was not open.
    #[error("clamd session is not open")]
    SessionClosed,

    /// The daemon replied with something that cannot be interpreted.
    #[error("unexpected reply from clamd: {details}")]
    Protocol {
        /// What was wrong with the reply.
        details: String,
    },

    /// The byte source of an item could not be opened.
    #[error("cannot open source '{label}': {reason}")]
    SourceUnavailable {
        /// Label of the item whose source failed.
        label: String,
        /// Reason reported by the source.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ScanError {
    /// Returns `true` if the session must be closed and reopened before it
    /// can be used again.
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::Io(_) | Self::SessionClosed
        )
    }

    /// Returns `true` if the daemon answered with an uninterpretable reply.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: &'static str, elapsed: Duration) -> Self {
        Self::Timeout { operation, elapsed }
    }

    /// Creates a `Protocol` error.
    pub fn protocol(details: impl Into<String>) -> Self {
        Self::Protocol {
            details: details.into(),
        }
    }

    /// Creates a `SourceUnavailable` error.
    pub fn source_unavailable(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
