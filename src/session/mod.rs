//! Sessions with the ClamAV daemon.
//!
//! - [`ClamdSession`]: persistent `IDSESSION` connection over TCP or a Unix socket
//! - [`MockSession`]: scripted replies for testing

mod clamd;
mod config;
mod connector;
mod mock;

pub use clamd::ClamdSession;
pub use config::{SessionConfig, DEFAULT_TIMEOUT};
pub use connector::{BoxedStream, ClamdAddress, Connect, DaemonStream};
pub use mock::{MockReply, MockSession};
