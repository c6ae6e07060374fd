//! Persistent clamd session.
//!
//! One `ClamdSession` owns one transport. `open` starts an `IDSESSION` so
//! every subsequent `INSTREAM` reuses the same connection; `close` sends
//! `END` and drops the transport.
//!
//! # Protocol
//!
//! ```text
//! open:   zIDSESSION\0
//! scan:   zINSTREAM\0 <len:u32be><bytes> ... <0:u32be>   -> "<n>: stream: OK\0"
//! close:  zEND\0
//! ```

use crate::audit;
use crate::core::{ItemLabel, Result, ScanError, ScanResult, ScanSession, SessionState};
use crate::protocol::{self, Command, RawReply, Reply, StreamError, MAX_REPLY_LEN};
use crate::session::config::SessionConfig;
use crate::session::connector::{BoxedStream, Connect};

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWriteExt, BufStream};
use tracing::{debug, info, warn};

/// A persistent session with a ClamAV daemon.
///
/// # Example
///
/// ```rust,ignore
/// use clamstream::session::{ClamdSession, SessionConfig};
/// use clamstream::core::{ItemLabel, ScanSession};
///
/// let mut session = ClamdSession::from_config(&SessionConfig::new().with_tcp("127.0.0.1", 3310));
/// session.open().await?;
///
/// let mut file = tokio::fs::File::open("upload.bin").await?;
/// let result = session.scan(&mut file, &ItemLabel::new("upload.bin")).await?;
/// if result.is_infected() {
///     println!("infected: {:?}", result.outcome.signature());
/// }
/// session.close().await;
/// ```
pub struct ClamdSession {
    connector: Arc<dyn Connect>,
    timeout: Duration,
    chunk_size: usize,
    state: SessionState,
    stream: Option<BufStream<BoxedStream>>,
    /// Reply-bearing commands sent on the current session.
    requests: u64,
}

impl ClamdSession {
    /// Creates a closed session. Nothing is connected until [`open`].
    ///
    /// [`open`]: ScanSession::open
    pub fn new(connector: impl Connect + 'static, timeout: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            timeout,
            chunk_size: protocol::DEFAULT_CHUNK_SIZE,
            state: SessionState::Closed,
            stream: None,
            requests: 0,
        }
    }

    /// Creates a closed session from configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.address.clone(), config.timeout).with_chunk_size(config.chunk_size)
    }

    /// Creates a session and opens it.
    pub async fn connect(connector: impl Connect + 'static, timeout: Duration) -> Result<Self> {
        let mut session = Self::new(connector, timeout);
        session.open().await?;
        Ok(session)
    }

    /// Sets the chunk size used for streaming.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the chunk size used for streaming.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the number of reply-bearing commands sent on this session.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Asks the daemon for its engine and signature database version.
    pub async fn version(&mut self) -> Result<String> {
        let reply = self.request(Command::Version).await?;
        Ok(reply.text)
    }

    fn stream_mut(&mut self) -> Result<&mut BufStream<BoxedStream>> {
        if self.state != SessionState::SessionOpen {
            return Err(ScanError::SessionClosed);
        }
        self.stream.as_mut().ok_or(ScanError::SessionClosed)
    }

    fn write_failed(&self, step: &str, err: impl fmt::Display) -> ScanError {
        ScanError::connection_failed(self.connector.address(), format!("{}: {}", step, err))
    }

    /// Runs `fut` under the session timeout.
    async fn timed<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::io::Result<T>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ScanError::Io(e)),
            Err(_) => Err(ScanError::timeout(operation, timeout)),
        }
    }

    /// Drops the transport without the `END` handshake; used once the peer
    /// is known to be gone.
    fn drop_transport(&mut self) {
        if self.stream.take().is_some() {
            debug!(address = %self.connector.address(), "clamd closed the connection");
        }
        self.state = SessionState::Closed;
    }

    /// Reads one reply. An unreadable or empty reply is a protocol error; a
    /// stalled read is a timeout.
    async fn read_reply(&mut self) -> Result<Reply> {
        let timeout = self.timeout;
        let stream = self.stream_mut()?;
        let read = tokio::time::timeout(timeout, protocol::read_reply(stream, MAX_REPLY_LEN)).await;
        let raw = match read {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "Error reading reply from clamd");
                self.drop_transport();
                return Err(ScanError::protocol(format!("reading reply failed: {}", e)));
            }
            Err(_) => return Err(ScanError::timeout("read reply", timeout)),
        };

        let RawReply {
            bytes,
            eof,
            overflow,
        } = raw;
        if overflow {
            warn!(limit = MAX_REPLY_LEN, "clamd reply has no terminator within the bound");
            self.drop_transport();
            return Err(ScanError::protocol(format!(
                "reply longer than {} bytes",
                MAX_REPLY_LEN
            )));
        }
        if eof {
            self.drop_transport();
        }
        let reply = protocol::decode_reply(&bytes)?;

        if let Some(id) = reply.request_id {
            if id != self.requests {
                debug!(expected = self.requests, got = id, "Reply for unexpected request id");
            }
        }
        Ok(reply)
    }

    /// Sends a command without payload and reads its reply.
    async fn request(&mut self, command: Command) -> Result<Reply> {
        let timeout = self.timeout;
        let stream = self.stream_mut()?;
        let sent = async {
            protocol::write_command(stream, command).await?;
            stream.flush().await
        };
        let sent = Self::timed(timeout, "send command", sent).await;
        if let Err(e) = sent {
            return Err(match e {
                ScanError::Io(io) => self.write_failed(command.name(), io),
                other => other,
            });
        }
        self.requests += 1;
        self.read_reply().await
    }
}

impl fmt::Debug for ClamdSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClamdSession")
            .field("address", &self.connector.address())
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .field("chunk_size", &self.chunk_size)
            .field("requests", &self.requests)
            .finish()
    }
}

#[async_trait]
impl ScanSession for ClamdSession {
    fn state(&self) -> SessionState {
        self.state
    }

    fn address(&self) -> String {
        self.connector.address()
    }

    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            self.close().await;
        }

        let address = self.connector.address();
        debug!(address = %address, "Connecting to clamd");

        let connected = tokio::time::timeout(self.timeout, self.connector.connect()).await;
        let transport = match connected {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                warn!(address = %address, error = %e, "Failed to open clamd session");
                return Err(ScanError::connection_failed(address, e.to_string()));
            }
            Err(_) => {
                warn!(address = %address, "Timed out connecting to clamd");
                return Err(ScanError::timeout("connect", self.timeout));
            }
        };

        let mut stream = BufStream::with_capacity(MAX_REPLY_LEN, self.chunk_size + 4, transport);
        self.state = SessionState::Idle;

        let handshake = async {
            protocol::write_command(&mut stream, Command::IdSession).await?;
            stream.flush().await
        };
        let handshake = Self::timed(self.timeout, "send IDSESSION", handshake).await;
        if let Err(e) = handshake {
            self.state = SessionState::Closed;
            warn!(address = %address, error = %e, "IDSESSION handshake failed");
            return Err(match e {
                ScanError::Io(io) => ScanError::connection_failed(address, io.to_string()),
                other => other,
            });
        }

        self.stream = Some(stream);
        self.state = SessionState::SessionOpen;
        self.requests = 0;
        debug!("IDSESSION command sent");
        audit::emit_session_opened(&address);
        Ok(())
    }

    async fn close(&mut self) {
        let was_open = self.state == SessionState::SessionOpen;
        let Some(mut stream) = self.stream.take() else {
            self.state = SessionState::Closed;
            return;
        };
        self.state = SessionState::Closed;
        let address = self.connector.address();

        if was_open {
            let goodbye = async {
                protocol::write_command(&mut stream, Command::End).await?;
                stream.flush().await
            };
            let goodbye = Self::timed(self.timeout, "send END", goodbye).await;
            if let Err(e) = goodbye {
                debug!(address = %address, error = %e, "Ignoring error while ending clamd session");
            }
        }
        let shutdown = Self::timed(self.timeout, "shutdown", stream.shutdown()).await;
        if let Err(e) = shutdown {
            debug!(address = %address, error = %e, "Ignoring error while closing clamd socket");
        }

        info!(address = %address, requests = self.requests, "Closed clamd session");
        audit::emit_session_closed(&address, self.requests);
    }

    async fn scan(
        &mut self,
        source: &mut (dyn AsyncRead + Send + Unpin),
        label: &ItemLabel,
    ) -> Result<ScanResult> {
        let started = Instant::now();
        let timeout = self.timeout;
        let chunk_size = self.chunk_size;
        let address = self.connector.address();
        let stream = self.stream_mut()?;

        debug!(label = %label.name, "Scanning");

        let started_stream = Self::timed(
            timeout,
            "send INSTREAM",
            protocol::write_command(stream, Command::InStream),
        )
        .await;
        if let Err(e) = started_stream {
            return Err(match e {
                ScanError::Io(io) => {
                    ScanError::connection_failed(address, format!("writing INSTREAM: {}", io))
                }
                other => other,
            });
        }

        let streamed =
            protocol::stream_source_with_timeout(source, stream, chunk_size, timeout).await;
        let payload = match streamed {
            Ok(payload) => payload,
            Err(StreamError::Stalled(limit)) => {
                warn!(label = %label.name, "clamd stopped reading the stream");
                return Err(ScanError::timeout("send stream", limit));
            }
            Err(StreamError::Sink(e)) => {
                return Err(ScanError::connection_failed(
                    address,
                    format!("sending file data: {}", e),
                ));
            }
            Err(StreamError::Source(e)) => {
                return Err(ScanError::connection_failed(
                    address,
                    format!("source '{}' failed mid-stream: {}", label.name, e),
                ));
            }
        };

        let flushed = Self::timed(timeout, "flush stream", stream.flush()).await;
        if let Err(e) = flushed {
            return Err(match e {
                ScanError::Io(io) => {
                    ScanError::connection_failed(address, format!("flushing: {}", io))
                }
                other => other,
            });
        }
        self.requests += 1;

        let reply = self.read_reply().await?;
        debug!(label = %label.name, response = %reply.text, "clamd response");
        if protocol::is_error_reply(&reply.text) {
            warn!(label = %label.name, response = %reply.text, "clamd reported an error for the stream");
        }

        let result = ScanResult::new(
            label.clone(),
            reply.into_scan_outcome(),
            payload,
            started.elapsed(),
        );
        audit::emit_scan_completed(&address, &result);
        Ok(result)
    }

    async fn ping(&mut self) -> Result<bool> {
        let reply = self.request(Command::Ping).await?;
        Ok(reply.text == "PONG")
    }
}
