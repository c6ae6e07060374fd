//! Scripted session for testing.
//!
//! [`MockSession`] answers scans from a queue of scripted replies without a
//! daemon, so batch behaviour can be tested in isolation.

use crate::core::{
    ItemLabel, PayloadSummary, Result, ScanError, ScanOutcome, ScanResult, ScanSession,
    SessionState,
};
use crate::protocol::DEFAULT_CHUNK_SIZE;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// What the mock answers to one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// `stream: OK`.
    Clean,
    /// `stream: <signature> FOUND`.
    Infected(String),
    /// An undecodable reply.
    ProtocolError(String),
    /// The transport failed mid-exchange.
    ConnectionError(String),
}

/// A session that replays scripted replies.
///
/// # Examples
///
/// ```rust
/// use clamstream::session::{MockReply, MockSession};
///
/// let session = MockSession::new()
///     .with_reply(MockReply::Clean)
///     .with_reply(MockReply::Infected("Eicar-Test-Signature".into()));
/// assert_eq!(session.scanned().len(), 0);
/// ```
#[derive(Debug)]
pub struct MockSession {
    state: SessionState,
    replies: VecDeque<MockReply>,
    default_reply: MockReply,
    failing_opens: usize,
    opens: usize,
    closes: usize,
    scanned: Vec<ItemLabel>,
}

impl MockSession {
    /// Creates a closed mock session that reports every item clean.
    pub fn new() -> Self {
        Self {
            state: SessionState::Closed,
            replies: VecDeque::new(),
            default_reply: MockReply::Clean,
            failing_opens: 0,
            opens: 0,
            closes: 0,
            scanned: Vec::new(),
        }
    }

    /// Queues the reply for the next unscripted scan.
    pub fn with_reply(mut self, reply: MockReply) -> Self {
        self.replies.push_back(reply);
        self
    }

    /// Sets the reply used once the queue is exhausted.
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Makes the next `count` calls to `open` fail.
    pub fn with_failing_opens(mut self, count: usize) -> Self {
        self.failing_opens = count;
        self
    }

    /// Queues another reply.
    pub fn push_reply(&mut self, reply: MockReply) {
        self.replies.push_back(reply);
    }

    /// Labels of every item scanned, in order.
    pub fn scanned(&self) -> &[ItemLabel] {
        &self.scanned
    }

    /// Number of successful opens.
    pub fn opens(&self) -> usize {
        self.opens
    }

    /// Number of calls to `close` that found the session open.
    pub fn closes(&self) -> usize {
        self.closes
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanSession for MockSession {
    fn state(&self) -> SessionState {
        self.state
    }

    fn address(&self) -> String {
        "mock".to_string()
    }

    async fn open(&mut self) -> Result<()> {
        if self.state != SessionState::Closed {
            self.close().await;
        }
        if self.failing_opens > 0 {
            self.failing_opens -= 1;
            return Err(ScanError::connection_failed("mock", "connection refused"));
        }
        self.opens += 1;
        self.state = SessionState::SessionOpen;
        Ok(())
    }

    async fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.closes += 1;
        }
        self.state = SessionState::Closed;
    }

    async fn scan(
        &mut self,
        source: &mut (dyn AsyncRead + Send + Unpin),
        label: &ItemLabel,
    ) -> Result<ScanResult> {
        if !self.is_open() {
            return Err(ScanError::SessionClosed);
        }

        let mut data = Vec::new();
        source.read_to_end(&mut data).await.map_err(|e| {
            ScanError::connection_failed("mock", format!("source failed mid-stream: {}", e))
        })?;
        self.scanned.push(label.clone());

        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());

        let outcome = match reply {
            MockReply::Clean => ScanOutcome::Clean,
            MockReply::Infected(signature) => ScanOutcome::Infected {
                message: format!("stream: {} FOUND", signature),
                signature,
            },
            MockReply::ProtocolError(details) => return Err(ScanError::protocol(details)),
            MockReply::ConnectionError(message) => {
                return Err(ScanError::connection_failed("mock", message))
            }
        };

        let payload = PayloadSummary {
            chunks: data.len().div_ceil(DEFAULT_CHUNK_SIZE) as u64,
            bytes: data.len() as u64,
            blake3: blake3::hash(&data).to_hex().to_string(),
        };
        Ok(ScanResult::new(
            label.clone(),
            outcome,
            payload,
            Duration::from_millis(1),
        ))
    }

    async fn ping(&mut self) -> Result<bool> {
        Ok(self.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script() {
        let mut session = MockSession::new()
            .with_reply(MockReply::Infected("Eicar-Test-Signature".into()))
            .with_reply(MockReply::ProtocolError("garbled".into()));
        session.open().await.unwrap();

        let mut source: &[u8] = b"X5O!P%@AP";
        let result = session.scan(&mut source, &ItemLabel::new("a")).await.unwrap();
        assert_eq!(result.outcome.signature(), Some("Eicar-Test-Signature"));
        assert_eq!(result.payload.bytes, 9);

        let mut source: &[u8] = b"b";
        let err = session.scan(&mut source, &ItemLabel::new("b")).await.unwrap_err();
        assert!(err.is_protocol_error());

        let mut source: &[u8] = b"c";
        assert!(session.scan(&mut source, &ItemLabel::new("c")).await.unwrap().is_clean());
        assert_eq!(session.scanned().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_requires_open() {
        let mut session = MockSession::new();
        let mut source: &[u8] = b"data";
        let err = session.scan(&mut source, &ItemLabel::new("a")).await.unwrap_err();
        assert!(matches!(err, ScanError::SessionClosed));
    }

    #[tokio::test]
    async fn test_mock_failing_opens() {
        let mut session = MockSession::new().with_failing_opens(1);
        assert!(session.open().await.is_err());
        assert!(!session.is_open());
        assert!(session.open().await.is_ok());
        assert_eq!(session.opens(), 1);

        session.close().await;
        session.close().await;
        assert_eq!(session.closes(), 1);
    }
}
