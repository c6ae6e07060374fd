//! Scan result structures.
//!
//! `ScanResult` wraps the daemon's verdict with what was actually sent on the
//! wire for that object: chunk count, byte count and a BLAKE3 digest of the
//! payload.

use crate::core::types::{ItemLabel, ScanOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of a payload streamed with INSTREAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSummary {
    /// Number of non-empty chunks written (the terminator is not counted).
    pub chunks: u64,

    /// Total payload bytes written across all chunks.
    pub bytes: u64,

    /// BLAKE3 digest of the payload, hex encoded.
    pub blake3: String,
}

impl PayloadSummary {
    /// Returns `true` if the source was empty.
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// The complete result of one successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Label of the scanned object.
    pub label: ItemLabel,

    /// The daemon's verdict.
    pub outcome: ScanOutcome,

    /// What was streamed to the daemon.
    pub payload: PayloadSummary,

    /// When the scan completed.
    pub completed_at: DateTime<Utc>,

    /// How long the exchange took.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl ScanResult {
    /// Creates a new `ScanResult`.
    pub fn new(
        label: ItemLabel,
        outcome: ScanOutcome,
        payload: PayloadSummary,
        duration: Duration,
    ) -> Self {
        Self {
            label,
            outcome,
            payload,
            completed_at: Utc::now(),
            duration,
        }
    }

    /// Returns `true` if the object is clean.
    pub fn is_clean(&self) -> bool {
        self.outcome.is_clean()
    }

    /// Returns `true` if the object is infected.
    pub fn is_infected(&self) -> bool {
        self.outcome.is_infected()
    }
}

/// Serde helper for Duration serialization.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_serializes_duration_as_millis() {
        let result = ScanResult::new(
            ItemLabel::new("a.txt"),
            ScanOutcome::Clean,
            PayloadSummary {
                chunks: 1,
                bytes: 3,
                blake3: blake3::hash(b"abc").to_hex().to_string(),
            },
            Duration::from_millis(42),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration"], 42);
        assert_eq!(json["outcome"]["type"], "clean");
        assert!(result.is_clean());
        assert!(!result.payload.is_empty());
    }
}
