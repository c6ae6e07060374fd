//! # Clamstream
//!
//! A persistent-session ClamAV client that streams objects to `clamd` with
//! the chunked `INSTREAM` protocol, plus a batch driver and a curation task
//! built on top of it.
//!
//! ## Overview
//!
//! Clamstream keeps one `IDSESSION` connection open per worker and reuses it
//! for every object, allowing you to:
//!
//! - Stream any byte source (file, buffer, reader) to the daemon in chunks
//! - Tell connection failures (reconnect) from bad replies (item failed)
//! - Scan the attachments of an item as a batch, fail-fast or accumulating
//! - Render a human-readable report and a status for a curation host
//! - Emit structured audit events for every verdict
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clamstream::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ClamdSession::from_config(&SessionConfig::new().with_tcp("127.0.0.1", 3310));
//!     session.open().await?;
//!
//!     let requests = vec![ScanRequest::from_path("upload.bin")];
//!     let report = scan_batch(&mut session, "123456789/42", requests, BatchPolicy::Accumulate).await;
//!     println!("{}", report.summary());
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Protocol**: Command encoding, chunk framing and reply parsing
//! - **Core**: Fundamental types, the `ScanSession` trait and error handling
//! - **Session**: The clamd session and its transports
//! - **Batch**: Per-owner batches, policies and reports
//! - **Task**: The curation task and its configuration
//! - **Audit**: Structured logging of session and scan events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod batch;
pub mod core;
pub mod protocol;
pub mod session;
pub mod task;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ItemLabel, ItemStatus, ScanError, ScanInput, ScanOutcome, ScanRequest, ScanResult,
    ScanSession, SessionState,
};

pub use crate::batch::{scan_batch, BatchPolicy, BatchReport, BatchScanner, ReportOptions};
pub use crate::session::{ClamdAddress, ClamdSession, SessionConfig};
pub use crate::task::{ClamScanConfig, ClamScanTask, CurateStatus, CurationTask};

/// Prelude module for convenient imports.
///
/// ```rust
/// use clamstream::prelude::*;
/// ```
pub mod prelude {
    pub use crate::batch::{
        scan_batch, BatchPolicy, BatchReport, BatchScanner, BatchStatus, ReportOptions,
    };
    pub use crate::core::{
        ItemLabel, ItemStatus, ScanError, ScanInput, ScanOutcome, ScanRequest, ScanResult,
        ScanSession, SessionState,
    };
    pub use crate::session::{ClamdAddress, ClamdSession, SessionConfig};
    pub use crate::task::{
        ClamScanConfig, ClamScanTask, CurateStatus, CurationItem, CurationTask, TaskOutcome,
    };
}
