//! Curation task integration.
//!
//! The host framework drives a [`CurationTask`] through `init`, one
//! `perform` per item and `finish`. [`ClamScanTask`] is the antivirus task;
//! its settings come from a [`ConfigSource`].

mod clamscan;
mod config;
mod item;
mod traits;

pub use clamscan::ClamScanTask;
pub use config::{keys, ClamScanConfig, ConfigSource, EnvSource};
pub use item::CurationItem;
pub use traits::{CurateStatus, CurationTask, TaskOutcome};
