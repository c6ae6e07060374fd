//! Audit event types and emission functions.

use crate::batch::{BatchReport, ItemResult};
use crate::core::{ItemStatus, ScanResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Renders the event as one JSON line.
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Audit record of one finished batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAuditEvent {
    /// Batch id.
    pub batch_id: String,

    /// When the batch ended.
    pub timestamp: DateTime<Utc>,

    /// The object the items belong to.
    pub owner: String,

    /// Overall status.
    pub status: String,

    /// Items submitted.
    pub submitted: usize,

    /// Items with a result.
    pub scanned: usize,

    /// Infected items.
    pub infections: Vec<InfectionSummary>,

    /// Batch duration in milliseconds.
    pub duration_ms: u64,
}

/// One infected item in an audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfectionSummary {
    /// Item label as shown in reports.
    pub label: String,
    /// Signature name.
    pub signature: String,
    /// BLAKE3 digest of the streamed bytes, if the stream completed.
    pub blake3: Option<String>,
}

impl InfectionSummary {
    fn from_item(item: &ItemResult) -> Option<Self> {
        match &item.status {
            ItemStatus::Infected { signature, .. } => Some(Self {
                label: item.label.to_string(),
                signature: signature.clone(),
                blake3: item.payload.as_ref().map(|p| p.blake3.clone()),
            }),
            _ => None,
        }
    }
}

impl From<&BatchReport> for BatchAuditEvent {
    fn from(report: &BatchReport) -> Self {
        Self {
            batch_id: report.id.to_string(),
            timestamp: report.completed_at,
            owner: report.owner.clone(),
            status: report.status.name().to_string(),
            submitted: report.submitted,
            scanned: report.items.len(),
            infections: report
                .items
                .iter()
                .filter_map(InfectionSummary::from_item)
                .collect(),
            duration_ms: report.duration().as_millis() as u64,
        }
    }
}

impl AuditEvent for BatchAuditEvent {
    fn event_type(&self) -> &'static str {
        "batch_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a session being opened.
pub fn emit_session_opened(address: &str) {
    tracing::info!(
        target: "clamstream::audit",
        event_type = "session_opened",
        address = %address,
        "clamd session opened"
    );
}

/// Emits an audit event for a session being closed.
pub fn emit_session_closed(address: &str, requests: u64) {
    tracing::info!(
        target: "clamstream::audit",
        event_type = "session_closed",
        address = %address,
        requests = requests,
        "clamd session closed"
    );
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(address: &str, result: &ScanResult) {
    let outcome = if result.is_infected() { "infected" } else { "clean" };

    tracing::info!(
        target: "clamstream::audit",
        event_type = "scan_completed",
        address = %address,
        label = %result.label,
        outcome = %outcome,
        signature = ?result.outcome.signature(),
        bytes = result.payload.bytes,
        chunks = result.payload.chunks,
        payload_blake3 = %result.payload.blake3,
        duration_ms = result.duration.as_millis() as u64,
        "Scan completed"
    );
}

/// Emits an audit event for an infected item.
pub fn emit_infection_detected(owner: &str, item: &ItemResult) {
    let signature = match &item.status {
        ItemStatus::Infected { signature, .. } => Some(signature.as_str()),
        _ => None,
    };

    tracing::warn!(
        target: "clamstream::audit",
        event_type = "infection_detected",
        owner = %owner,
        label = %item.label,
        signature = ?signature,
        "item - {}: {}",
        owner,
        item.message()
    );
}

/// Emits an audit event for a finished batch.
pub fn emit_batch_completed(report: &BatchReport) {
    let event = BatchAuditEvent::from(report);
    let signatures: Vec<&str> = event.infections.iter().map(|i| i.signature.as_str()).collect();

    tracing::info!(
        target: "clamstream::audit",
        event_type = event.event_type(),
        batch_id = %event.batch_id,
        owner = %event.owner,
        status = %event.status,
        submitted = event.submitted,
        scanned = event.scanned,
        infection_count = event.infections.len(),
        signatures = ?signatures,
        aborted = ?report.aborted,
        duration_ms = event.duration_ms,
        "Batch completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{scan_batch, BatchPolicy};
    use crate::core::ScanRequest;
    use crate::session::{MockReply, MockSession};

    #[tokio::test]
    async fn test_batch_audit_event_from_report() {
        let mut session = MockSession::new()
            .with_reply(MockReply::Clean)
            .with_reply(MockReply::Infected("Eicar-Test-Signature".into()));
        let requests = vec![
            ScanRequest::new("a.txt", b"clean".to_vec()),
            ScanRequest::new("eicar.com", b"X5O!P%@AP".to_vec()),
        ];
        let report = scan_batch(&mut session, "123/4", requests, BatchPolicy::Accumulate).await;
        let event = BatchAuditEvent::from(&report);

        assert_eq!(event.event_type(), "batch_completed");
        assert_eq!(event.status, "failed");
        assert_eq!(event.scanned, 2);
        assert_eq!(event.infections.len(), 1);
        assert_eq!(event.infections[0].signature, "Eicar-Test-Signature");
        assert_eq!(
            event.infections[0].blake3.as_deref(),
            Some(blake3::hash(b"X5O!P%@AP").to_hex().as_str())
        );

        let json = event.to_json().unwrap();
        assert!(json.contains("\"owner\":\"123/4\""));
    }
}
