//! Per-item results and the aggregated batch report.

use crate::batch::policy::{BatchPolicy, ReportOptions};
use crate::core::result::duration_serde;
use crate::core::{ItemLabel, ItemStatus, PayloadSummary, ScanResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use uuid::Uuid;

/// Owner name used when the host has none, e.g. for items still in a workflow.
pub const DEFAULT_OWNER: &str = "in workflow";

/// Headline for a batch with at least one infected item.
pub const INFECTED_MESSAGE: &str = "had virus detected.";

/// Headline for a batch in which every item came back clean.
pub const CLEAN_MESSAGE: &str = "had no viruses detected.";

/// Headline for a batch with unscannable items but no infection.
pub const INCOMPLETE_MESSAGE: &str = "could not be fully scanned.";

/// Result text when the daemon could not be reached.
pub const CONNECT_FAIL_MESSAGE: &str = "Unable to connect to virus service - check setup";

/// Result text when a scan failed at the transport level.
pub const SCAN_FAIL_MESSAGE: &str = "Error encountered using virus service - check setup";

/// Overall status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every item was scanned and came back clean.
    Success,
    /// At least one item was infected or unscannable.
    Failed,
    /// The batch was cut short by a connection or source failure.
    Error,
    /// There was nothing to scan.
    Skipped,
}

impl BatchStatus {
    /// Short lowercase name, used in audit events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

/// Why a batch stopped before its last item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// Fail-fast stopped at this item.
    FailFast {
        /// The item that stopped the batch.
        label: ItemLabel,
    },
    /// The session could not be opened.
    ConnectFailed {
        /// Underlying error.
        message: String,
    },
    /// The transport failed while scanning this item.
    ScanFailed {
        /// The item being scanned.
        label: ItemLabel,
        /// Underlying error.
        message: String,
    },
    /// The bytes of this item could not be opened.
    SourceUnavailable {
        /// The item whose source failed.
        label: ItemLabel,
        /// Underlying error.
        reason: String,
    },
}

impl AbortReason {
    /// The fixed result text for fatal aborts; `None` for fail-fast.
    pub fn headline(&self) -> Option<&'static str> {
        match self {
            Self::FailFast { .. } => None,
            Self::ConnectFailed { .. } => Some(CONNECT_FAIL_MESSAGE),
            Self::ScanFailed { .. } | Self::SourceUnavailable { .. } => Some(SCAN_FAIL_MESSAGE),
        }
    }

    /// Returns `true` for aborts that make the batch an error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FailFast { .. })
    }
}

/// Result for one item of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    /// The item.
    pub label: ItemLabel,

    /// What happened to it.
    #[serde(flatten)]
    pub status: ItemStatus,

    /// What was streamed, if the stream completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PayloadSummary>,

    /// Time spent on the item.
    #[serde(with = "duration_serde", rename = "duration_ms")]
    pub duration: Duration,
}

impl ItemResult {
    /// Builds the entry for a completed scan.
    pub fn scanned(result: ScanResult) -> Self {
        Self {
            label: result.label,
            status: result.outcome.into(),
            payload: Some(result.payload),
            duration: result.duration,
        }
    }

    /// Builds the entry for an item that did not produce a verdict.
    pub fn failed(label: ItemLabel, status: ItemStatus, duration: Duration) -> Self {
        Self {
            label,
            status,
            payload: None,
            duration,
        }
    }

    /// One-line description, e.g. `bitstream - a.pdf: SequenceId - 1: infected`.
    ///
    /// The signature is not part of the line; it stays in [`ItemStatus::Infected`].
    pub fn message(&self) -> String {
        match &self.status {
            ItemStatus::Clean => format!("{}: clean", self.label),
            ItemStatus::Infected { .. } => format!("{}: infected", self.label),
            ItemStatus::ProtocolError { details } => {
                format!("{}: scan error - {}", self.label, details)
            }
            ItemStatus::ConnectionError { message } => {
                format!("{}: not scanned - {}", self.label, message)
            }
            ItemStatus::SourceUnavailable { reason } => {
                format!("{}: source unavailable - {}", self.label, reason)
            }
        }
    }
}

/// Aggregated result of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique id of this run.
    pub id: Uuid,

    /// The object the items belong to.
    pub owner: String,

    /// Policy in effect.
    pub policy: BatchPolicy,

    /// Reporting options in effect.
    pub options: ReportOptions,

    /// Number of items submitted.
    pub submitted: usize,

    /// Results in scan order. Items never reached are absent.
    pub items: Vec<ItemResult>,

    /// Overall status.
    pub status: BatchStatus,

    /// Set when the batch stopped before its last item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortReason>,

    /// When the batch started.
    pub started_at: DateTime<Utc>,

    /// When the batch ended.
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    pub(crate) fn begin(
        owner: impl Into<String>,
        submitted: usize,
        policy: BatchPolicy,
        options: ReportOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            policy,
            options,
            submitted,
            items: Vec::with_capacity(submitted),
            status: if submitted == 0 {
                BatchStatus::Skipped
            } else {
                BatchStatus::Success
            },
            aborted: None,
            started_at: now,
            completed_at: now,
        }
    }

    pub(crate) fn push(&mut self, item: ItemResult) {
        if item.status.is_infected() || item.status.is_error() {
            self.status = BatchStatus::Failed;
        }
        self.items.push(item);
    }

    pub(crate) fn abort(&mut self, reason: AbortReason) {
        if reason.is_fatal() {
            self.status = BatchStatus::Error;
        }
        self.aborted = Some(reason);
    }

    pub(crate) fn complete(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }

    /// Infected items, in scan order.
    pub fn infected(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|i| i.status.is_infected())
    }

    /// Number of infected items.
    pub fn infected_count(&self) -> usize {
        self.infected().count()
    }

    /// Items that got an unusable reply.
    pub fn unscanned(&self) -> impl Iterator<Item = &ItemResult> {
        self.items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::ProtocolError { .. }))
    }

    /// Returns `true` if every submitted item has a result.
    pub fn is_complete(&self) -> bool {
        self.items.len() == self.submitted
    }

    /// Wall-clock duration of the batch.
    pub fn duration(&self) -> Duration {
        (self.completed_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Renders the human-readable report.
    ///
    /// ```text
    /// Item: 123456789/42 had virus detected.
    /// bitstream - eicar.com: SequenceId - 2: infected
    /// 1 virus(es) found. failfast: true
    /// ```
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let list_items = self.aborted.is_none() || self.options.include_partial_results;

        if self.status == BatchStatus::Skipped {
            let _ = write!(out, "Nothing to scan for item: {}", self.owner);
            return out;
        }

        if let Some(headline) = self.aborted.as_ref().and_then(AbortReason::headline) {
            out.push_str(headline);
            if list_items && self.infected_count() > 0 {
                out.push('\n');
                self.write_findings(&mut out);
            }
            return out;
        }

        let _ = write!(out, "Item: {} ", self.owner);
        match self.status {
            BatchStatus::Failed => {
                let infected = self.infected_count();
                if infected > 0 {
                    out.push_str(INFECTED_MESSAGE);
                } else {
                    out.push_str(INCOMPLETE_MESSAGE);
                }
                if list_items {
                    self.write_findings(&mut out);
                } else {
                    let _ = write!(
                        out,
                        "\n{} virus(es) found. failfast: {}",
                        infected,
                        self.policy.is_fail_fast()
                    );
                }
            }
            _ => out.push_str(CLEAN_MESSAGE),
        }

        if !self.is_complete() {
            let _ = write!(
                out,
                "\nScan stopped after {} of {} bitstream(s).",
                self.items.len(),
                self.submitted
            );
        }
        out
    }

    fn write_findings(&self, out: &mut String) {
        let mut count = 0;
        for item in self.infected() {
            let _ = write!(out, "\n{}\n", item.message());
            count += 1;
        }
        if count == 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "{} virus(es) found. failfast: {}",
            count,
            self.policy.is_fail_fast()
        );
        for item in self.unscanned() {
            let _ = write!(out, "\n{}", item.message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infected(name: &str, seq: u32) -> ItemResult {
        ItemResult::failed(
            ItemLabel::new(name).with_sequence_id(seq),
            ItemStatus::Infected {
                signature: "Eicar-Test-Signature".into(),
                message: "stream: Eicar-Test-Signature FOUND".into(),
            },
            Duration::from_millis(3),
        )
    }

    fn clean(name: &str) -> ItemResult {
        ItemResult::failed(ItemLabel::new(name), ItemStatus::Clean, Duration::ZERO)
    }

    #[test]
    fn test_clean_summary() {
        let mut report = BatchReport::begin("123/4", 2, BatchPolicy::FailFast, ReportOptions::default());
        report.push(clean("a"));
        report.push(clean("b"));

        assert_eq!(report.status, BatchStatus::Success);
        assert_eq!(report.summary(), "Item: 123/4 had no viruses detected.");
    }

    #[test]
    fn test_infected_summary() {
        let mut report =
            BatchReport::begin("123/4", 3, BatchPolicy::Accumulate, ReportOptions::default());
        report.push(infected("a.pdf", 1));
        report.push(clean("b"));
        report.push(infected("c.exe", 3));

        assert_eq!(report.status, BatchStatus::Failed);
        assert_eq!(
            report.summary(),
            "Item: 123/4 had virus detected.\n\
             bitstream - a.pdf: SequenceId - 1: infected\n\n\
             bitstream - c.exe: SequenceId - 3: infected\n\
             2 virus(es) found. failfast: false"
        );
    }

    #[test]
    fn test_fail_fast_summary_notes_remaining() {
        let mut report = BatchReport::begin(DEFAULT_OWNER, 3, BatchPolicy::FailFast, ReportOptions::default());
        report.push(clean("a"));
        report.push(infected("b", 2));
        report.abort(AbortReason::FailFast {
            label: ItemLabel::new("b"),
        });

        assert_eq!(report.status, BatchStatus::Failed);
        let summary = report.summary();
        assert!(summary.starts_with("Item: in workflow had virus detected."));
        assert!(summary.contains("1 virus(es) found. failfast: true"));
        assert!(summary.ends_with("Scan stopped after 2 of 3 bitstream(s)."));
    }

    #[test]
    fn test_fatal_summary_uses_fixed_message() {
        let mut report = BatchReport::begin("h", 2, BatchPolicy::Accumulate, ReportOptions::default());
        report.push(infected("a", 1));
        report.abort(AbortReason::ScanFailed {
            label: ItemLabel::new("b"),
            message: "broken pipe".into(),
        });

        assert_eq!(report.status, BatchStatus::Error);
        let summary = report.summary();
        assert!(summary.starts_with(SCAN_FAIL_MESSAGE));
        assert!(summary.contains("bitstream - a: SequenceId - 1: infected"));

        report.options = ReportOptions::default().with_partial_results(false);
        assert_eq!(report.summary(), SCAN_FAIL_MESSAGE);
    }

    #[test]
    fn test_connect_fail_summary() {
        let mut report = BatchReport::begin("h", 1, BatchPolicy::FailFast, ReportOptions::default());
        report.abort(AbortReason::ConnectFailed {
            message: "refused".into(),
        });
        assert_eq!(report.summary(), CONNECT_FAIL_MESSAGE);
    }

    #[test]
    fn test_empty_batch_is_skipped() {
        let report = BatchReport::begin("h", 0, BatchPolicy::FailFast, ReportOptions::default());
        assert_eq!(report.status, BatchStatus::Skipped);
        assert_eq!(report.summary(), "Nothing to scan for item: h");
    }

    #[test]
    fn test_report_serializes() {
        let mut report = BatchReport::begin("h", 1, BatchPolicy::FailFast, ReportOptions::default());
        report.push(infected("a", 1));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["items"][0]["status"], "infected");
        assert_eq!(json["items"][0]["duration_ms"], 3);
        assert_eq!(json["items"][0]["signature"], "Eicar-Test-Signature");
        assert!(json.get("aborted").is_none());
    }

    #[test]
    fn test_aborted_report_serializes() {
        let mut report = BatchReport::begin("h", 2, BatchPolicy::Accumulate, ReportOptions::default());
        report.push(ItemResult::failed(
            ItemLabel::new("gone.bin"),
            ItemStatus::SourceUnavailable {
                reason: "No such file or directory".into(),
            },
            Duration::ZERO,
        ));
        report.abort(AbortReason::SourceUnavailable {
            label: ItemLabel::new("gone.bin"),
            reason: "No such file or directory".into(),
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["aborted"]["kind"], "source_unavailable");
        assert_eq!(json["aborted"]["reason"], "No such file or directory");
        assert_eq!(json["items"][0]["status"], "source_unavailable");

        let back: BatchReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.aborted, report.aborted);
        assert_eq!(back.items, report.items);
    }

    #[test]
    fn test_unscanned_only_summary() {
        let mut report =
            BatchReport::begin("123/4", 2, BatchPolicy::Accumulate, ReportOptions::default());
        report.push(clean("a"));
        report.push(ItemResult::failed(
            ItemLabel::new("b").with_sequence_id(2),
            ItemStatus::ProtocolError {
                details: "empty reply".into(),
            },
            Duration::ZERO,
        ));

        assert_eq!(
            report.summary(),
            "Item: 123/4 could not be fully scanned.\n\
             0 virus(es) found. failfast: false\n\
             bitstream - b: SequenceId - 2: scan error - empty reply"
        );
    }
}
