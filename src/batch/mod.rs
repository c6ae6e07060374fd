//! Scanning the objects of one owner as a unit.
//!
//! A batch runs every item of one owner through a single session, applies
//! the [`BatchPolicy`] to infected or unscannable items and renders a
//! [`BatchReport`].

mod driver;
mod policy;
mod report;

pub use driver::{scan_batch, BatchScanner};
pub use policy::{BatchPolicy, ReportOptions};
pub use report::{
    AbortReason, BatchReport, BatchStatus, ItemResult, CLEAN_MESSAGE, CONNECT_FAIL_MESSAGE,
    DEFAULT_OWNER, INCOMPLETE_MESSAGE, INFECTED_MESSAGE, SCAN_FAIL_MESSAGE,
};
