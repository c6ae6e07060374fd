//! The ClamAV curation task.

use crate::batch::{BatchPolicy, BatchReport, BatchScanner, ReportOptions};
use crate::core::{Result, ScanSession};
use crate::session::ClamdSession;
use crate::task::config::ClamScanConfig;
use crate::task::item::CurationItem;
use crate::task::traits::{CurateStatus, CurationTask, TaskOutcome};

use async_trait::async_trait;
use tracing::{error, info};

/// Scans every attachment of an item with ClamAV.
///
/// One session is opened in `init`, reused for every item and closed in
/// `finish`. A session lost mid-run is reopened before the next item.
///
/// # Example
///
/// ```rust,ignore
/// use clamstream::task::{ClamScanConfig, ClamScanTask, CurationItem, CurationTask};
/// use clamstream::core::ScanRequest;
///
/// let mut task = ClamScanTask::from_config(&ClamScanConfig::from_env()?)?;
/// task.init().await?;
/// let outcome = task
///     .perform(CurationItem::new("123456789/42").with_attachment(ScanRequest::from_path("thesis.pdf")))
///     .await;
/// println!("{}: {}", outcome.status, outcome.result);
/// task.finish().await;
/// ```
#[derive(Debug)]
pub struct ClamScanTask<S: ScanSession = ClamdSession> {
    session: S,
    policy: BatchPolicy,
    options: ReportOptions,
    last_report: Option<BatchReport>,
}

impl ClamScanTask<ClamdSession> {
    /// Creates the task from a validated configuration.
    pub fn from_config(config: &ClamScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_session(
            ClamdSession::from_config(&config.session),
            config.policy,
            config.report,
        ))
    }
}

impl<S: ScanSession> ClamScanTask<S> {
    /// Creates the task over an existing session.
    pub fn with_session(session: S, policy: BatchPolicy, options: ReportOptions) -> Self {
        Self {
            session,
            policy,
            options,
            last_report: None,
        }
    }

    /// The session the task scans with.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Report of the most recent `perform`, if any.
    pub fn last_report(&self) -> Option<&BatchReport> {
        self.last_report.as_ref()
    }

    /// Consumes the task and returns its session.
    pub fn into_session(self) -> S {
        self.session
    }
}

#[async_trait]
impl<S: ScanSession> CurationTask for ClamScanTask<S> {
    fn name(&self) -> &str {
        "clamav"
    }

    async fn init(&mut self) -> Result<()> {
        info!(address = %self.session.address(), policy = ?self.policy, "Initialising virus scan task");
        let opened = self.session.open().await;
        if let Err(e) = &opened {
            error!(address = %self.session.address(), error = %e, "Failed to open clamd session");
        }
        opened
    }

    async fn perform(&mut self, item: CurationItem) -> TaskOutcome {
        let owner = item.owner().to_string();
        let report = BatchScanner::new(&mut self.session, self.policy)
            .with_report_options(self.options)
            .run(&owner, item.attachments)
            .await;

        let outcome = TaskOutcome::new(CurateStatus::from(report.status), report.summary());
        self.last_report = Some(report);
        outcome
    }

    async fn finish(&mut self) {
        self.session.close().await;
    }
}
