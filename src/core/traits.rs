//! Core traits for the clamstream library.
//!
//! [`ScanSession`] is the seam between the batch driver and a concrete
//! daemon connection. [`ClamdSession`](crate::session::ClamdSession) is the
//! production implementation; [`MockSession`](crate::session::MockSession)
//! scripts outcomes for tests.

use crate::core::error::Result;
use crate::core::result::ScanResult;
use crate::core::types::{ItemLabel, SessionState};

use async_trait::async_trait;
use std::fmt::Debug;
use tokio::io::AsyncRead;

/// A long-lived, sequentially used scanning session.
///
/// # Implementation Notes
///
/// - `scan` takes `&mut self`: one exchange at a time per session. Hosts that
///   share a session between tasks must wrap it in a lock.
/// - `scan` never repairs the session. After an error for which
///   [`ScanError::requires_reconnect`] holds, the caller closes the session
///   and opens it again before the next scan.
/// - `close` never fails and may be called any number of times.
///
/// [`ScanError::requires_reconnect`]: crate::core::ScanError::requires_reconnect
#[async_trait]
pub trait ScanSession: Send + Debug {
    /// Returns the current connection state. No I/O.
    fn state(&self) -> SessionState;

    /// Returns `true` if scans may be issued. No I/O.
    fn is_open(&self) -> bool {
        self.state() == SessionState::SessionOpen
    }

    /// Human-readable address of the daemon, for logs and errors.
    fn address(&self) -> String;

    /// Establishes the transport and starts a daemon session.
    ///
    /// An already open session is closed first.
    async fn open(&mut self) -> Result<()>;

    /// Ends the daemon session and drops the transport. Best effort.
    async fn close(&mut self);

    /// Streams `source` to the daemon and returns its verdict.
    ///
    /// `source` is read to exhaustion; it is not closed.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` if the session is not open.
    /// - `ConnectionFailed`, `Io` or `Timeout` if the transport failed.
    /// - `Protocol` if the reply was empty or could not be decoded.
    async fn scan(
        &mut self,
        source: &mut (dyn AsyncRead + Send + Unpin),
        label: &ItemLabel,
    ) -> Result<ScanResult>;

    /// Checks that the daemon answers on this session.
    async fn ping(&mut self) -> Result<bool>;
}

/// A session shared between tasks; each scan holds the lock for the whole
/// exchange so frames from different callers never interleave on the wire.
pub type SharedSession<S> = std::sync::Arc<tokio::sync::Mutex<S>>;

#[async_trait]
impl<S: ScanSession + ?Sized> ScanSession for Box<S> {
    fn state(&self) -> SessionState {
        (**self).state()
    }

    fn address(&self) -> String {
        (**self).address()
    }

    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn close(&mut self) {
        (**self).close().await
    }

    async fn scan(
        &mut self,
        source: &mut (dyn AsyncRead + Send + Unpin),
        label: &ItemLabel,
    ) -> Result<ScanResult> {
        (**self).scan(source, label).await
    }

    async fn ping(&mut self) -> Result<bool> {
        (**self).ping().await
    }
}
