//! Core types and traits for the clamstream library.
//!
//! - [`types`] - Scan outcome, session state, item labels and statuses
//! - [`traits`] - The `ScanSession` trait
//! - [`error`] - Structured error types
//! - [`input`] - Byte-source abstraction
//! - [`result`] - Scan result structures

pub mod error;
pub mod input;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{Result, ScanError};
pub use input::{BoxedReader, ScanInput, ScanRequest};
pub use result::{PayloadSummary, ScanResult};
pub use traits::{ScanSession, SharedSession};
pub use types::{ItemLabel, ItemStatus, ScanOutcome, SessionState};
