//! The curation task capability.

use crate::batch::BatchStatus;
use crate::core::Result;
use crate::task::item::CurationItem;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status a task hands back to the curation host for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurateStatus {
    /// The task ran and found nothing wrong.
    Success,
    /// The task ran and the item failed it.
    Fail,
    /// The task did not apply to the item.
    Skip,
    /// The task could not run.
    Error,
}

impl fmt::Display for CurateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

impl From<BatchStatus> for CurateStatus {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Success => Self::Success,
            BatchStatus::Failed => Self::Fail,
            BatchStatus::Error => Self::Error,
            BatchStatus::Skipped => Self::Skip,
        }
    }
}

/// What `perform` returns: a status and a human-readable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Status for the host.
    pub status: CurateStatus,
    /// Result text shown to curators.
    pub result: String,
}

impl TaskOutcome {
    /// Creates an outcome.
    pub fn new(status: CurateStatus, result: impl Into<String>) -> Self {
        Self {
            status,
            result: result.into(),
        }
    }
}

/// A task the curation host runs over a sequence of items.
///
/// The host calls `init` once, `perform` once per item and `finish` once,
/// on the same worker.
#[async_trait]
pub trait CurationTask: Send {
    /// Short name of the task, used in logs.
    fn name(&self) -> &str;

    /// Prepares the task before the first item.
    async fn init(&mut self) -> Result<()>;

    /// Runs the task over one item.
    async fn perform(&mut self, item: CurationItem) -> TaskOutcome;

    /// Releases what `init` acquired. Never fails.
    async fn finish(&mut self);
}
