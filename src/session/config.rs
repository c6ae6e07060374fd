//! Session configuration.

use crate::core::error::ScanError;
use crate::core::result::duration_serde;
use crate::protocol::DEFAULT_CHUNK_SIZE;
use crate::session::connector::ClamdAddress;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for a [`ClamdSession`](crate::session::ClamdSession).
///
/// # Example
///
/// ```rust
/// use clamstream::session::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new()
///     .with_tcp("clamd.internal", 3310)
///     .with_timeout(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the daemon listens.
    #[serde(default)]
    pub address: ClamdAddress,

    /// Timeout for connecting, flushing and reading a reply.
    #[serde(default = "default_timeout", with = "duration_serde", rename = "timeout_ms")]
    pub timeout: Duration,

    /// Payload bytes per INSTREAM chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: ClamdAddress::default(),
            timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SessionConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a TCP connection.
    pub fn with_tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.address = ClamdAddress::tcp(host, port);
        self
    }

    /// Uses a Unix socket.
    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.address = ClamdAddress::unix(path);
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Checks the configuration for values the session cannot work with.
    pub fn validate(&self) -> Result<(), ScanError> {
        if let ClamdAddress::Tcp { host, port } = &self.address {
            if host.trim().is_empty() {
                return Err(ScanError::configuration("daemon host must not be empty"));
            }
            if *port == 0 {
                return Err(ScanError::configuration("daemon port must not be 0"));
            }
        }
        if self.timeout.is_zero() {
            return Err(ScanError::configuration("timeout must be greater than 0"));
        }
        if self.chunk_size == 0 {
            return Err(ScanError::configuration("chunk size must be greater than 0"));
        }
        if u32::try_from(self.chunk_size).is_err() {
            return Err(ScanError::configuration("chunk size must fit in 32 bits"));
        }
        Ok(())
    }
}
