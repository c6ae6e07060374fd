//! Transports to the daemon.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite};

/// A duplex byte stream to the daemon.
pub trait DaemonStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> DaemonStream for T {}

/// A boxed daemon stream.
pub type BoxedStream = Box<dyn DaemonStream>;

/// Opens transports to the daemon.
///
/// [`ClamdAddress`] covers TCP and Unix sockets; tests supply in-memory
/// connectors backed by `tokio::io::duplex`.
#[async_trait]
pub trait Connect: Send + Sync + fmt::Debug {
    /// Establishes a new transport.
    async fn connect(&self) -> io::Result<BoxedStream>;

    /// Human-readable address for logs and errors.
    fn address(&self) -> String;
}

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClamdAddress {
    /// TCP `host:port`.
    Tcp {
        /// Host name or IP address.
        host: String,
        /// TCP port, 3310 by convention.
        port: u16,
    },

    /// Local Unix domain socket.
    Unix {
        /// Path to the socket file.
        path: PathBuf,
    },
}

impl ClamdAddress {
    /// Creates a TCP address.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Creates a Unix socket address.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }
}

impl Default for ClamdAddress {
    fn default() -> Self {
        Self::tcp("127.0.0.1", 3310)
    }
}

impl fmt::Display for ClamdAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Self::Unix { path } => write!(f, "unix:{}", path.display()),
        }
    }
}

#[async_trait]
impl Connect for ClamdAddress {
    async fn connect(&self) -> io::Result<BoxedStream> {
        match self {
            Self::Tcp { host, port } => {
                let stream = tokio::net::TcpStream::connect((host.as_str(), *port)).await?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Self::Unix { path } => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            Self::Unix { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "Unix sockets not supported on this platform",
            )),
        }
    }

    fn address(&self) -> String {
        self.to_string()
    }
}
