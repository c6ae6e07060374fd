//! Runs a batch of scan requests over one session.

use crate::audit;
use crate::batch::policy::{BatchPolicy, ReportOptions};
use crate::batch::report::{AbortReason, BatchReport, ItemResult};
use crate::core::{ItemStatus, ScanError, ScanRequest, ScanSession};

use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Scans the items of one owner, in order, over a single session.
///
/// The session is opened on demand before each item and is closed as soon as
/// a connection-class error is seen, so the next batch starts from a fresh
/// connection. Infected and unscannable items follow the [`BatchPolicy`].
///
/// # Example
///
/// ```rust,ignore
/// use clamstream::batch::{BatchPolicy, BatchScanner};
/// use clamstream::core::ScanRequest;
///
/// let report = BatchScanner::new(&mut session, BatchPolicy::Accumulate)
///     .run("123456789/42", vec![ScanRequest::from_path("/srv/assetstore/1")])
///     .await;
/// println!("{}", report.summary());
/// ```
#[derive(Debug)]
pub struct BatchScanner<'s, S: ScanSession + ?Sized> {
    session: &'s mut S,
    policy: BatchPolicy,
    options: ReportOptions,
}

impl<'s, S: ScanSession + ?Sized> BatchScanner<'s, S> {
    /// Creates a scanner driving `session` with `policy`.
    pub fn new(session: &'s mut S, policy: BatchPolicy) -> Self {
        Self {
            session,
            policy,
            options: ReportOptions::default(),
        }
    }

    /// Sets the reporting options.
    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    /// Scans `requests` in order and returns the report.
    ///
    /// Never fails: every failure ends up in the report.
    pub async fn run(&mut self, owner: &str, requests: Vec<ScanRequest>) -> BatchReport {
        let mut report = BatchReport::begin(owner, requests.len(), self.policy, self.options);
        info!(
            owner = %owner,
            items = requests.len(),
            policy = ?self.policy,
            "Starting batch scan"
        );

        for request in requests {
            if let Some(reason) = self.scan_one(owner, request, &mut report).await {
                report.abort(reason);
                break;
            }
        }

        let report = report.complete();
        info!(
            owner = %owner,
            status = report.status.name(),
            scanned = report.items.len(),
            infected = report.infected_count(),
            "Batch scan finished"
        );
        audit::emit_batch_completed(&report);
        report
    }

    /// Scans one item; returns the reason to stop, if any.
    async fn scan_one(
        &mut self,
        owner: &str,
        request: ScanRequest,
        report: &mut BatchReport,
    ) -> Option<AbortReason> {
        let ScanRequest { label, mut input } = request;

        if !self.session.is_open() {
            if let Err(e) = self.session.open().await {
                error!(address = %self.session.address(), error = %e, "Failed to open clamd session");
                return Some(AbortReason::ConnectFailed {
                    message: e.to_string(),
                });
            }
        }

        let started = Instant::now();
        let mut source = match input.open().await {
            Ok(source) => source,
            Err(e) => {
                error!(label = %label, error = %e, "Failed to open item source");
                report.push(ItemResult::failed(
                    label.clone(),
                    ItemStatus::SourceUnavailable {
                        reason: e.to_string(),
                    },
                    started.elapsed(),
                ));
                return Some(AbortReason::SourceUnavailable {
                    label,
                    reason: e.to_string(),
                });
            }
        };

        let scanned = self.session.scan(&mut *source, &label).await;
        drop(source);

        match scanned {
            Ok(result) => {
                let item = ItemResult::scanned(result);
                let infected = item.status.is_infected();
                if infected {
                    warn!(owner = %owner, "{}", item.message());
                    audit::emit_infection_detected(owner, &item);
                } else {
                    debug!(label = %label, "Item clean");
                }
                report.push(item);

                if infected && self.policy.is_fail_fast() {
                    return Some(AbortReason::FailFast { label });
                }
                None
            }
            Err(e) if e.requires_reconnect() => {
                error!(label = %label, error = %e, "Error encountered using clamd");
                report.push(ItemResult::failed(
                    label.clone(),
                    ItemStatus::ConnectionError {
                        message: e.to_string(),
                    },
                    started.elapsed(),
                ));
                self.session.close().await;
                Some(AbortReason::ScanFailed {
                    label,
                    message: e.to_string(),
                })
            }
            Err(e) => {
                warn!(label = %label, error = %e, "Item could not be scanned");
                let details = match e {
                    ScanError::Protocol { details } => details,
                    other => other.to_string(),
                };
                report.push(ItemResult::failed(
                    label.clone(),
                    ItemStatus::ProtocolError { details },
                    started.elapsed(),
                ));
                if self.policy.is_fail_fast() {
                    return Some(AbortReason::FailFast { label });
                }
                None
            }
        }
    }
}

/// Scans `requests` over `session` with default reporting options.
pub async fn scan_batch<S>(
    session: &mut S,
    owner: &str,
    requests: Vec<ScanRequest>,
    policy: BatchPolicy,
) -> BatchReport
where
    S: ScanSession + ?Sized,
{
    BatchScanner::new(session, policy).run(owner, requests).await
}
