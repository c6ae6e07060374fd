//! Core types used throughout the clamstream library.
//!
//! This module defines the scan outcome reported by the daemon, the session
//! state machine, item labels and the flattened per-item status used in
//! batch reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict of a completed INSTREAM exchange.
///
/// Failures to complete the exchange are reported as [`ScanError`]
/// instead; see [`ItemStatus`] for the flattened four-way view.
///
/// [`ScanError`]: crate::core::ScanError
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The daemon reported no signature match.
    Clean,

    /// The daemon reported a signature match.
    Infected {
        /// Signature name parsed from the reply (e.g. "Eicar-Test-Signature").
        signature: String,
        /// The reply text as received, without the session prefix.
        message: String,
    },
}

impl ScanOutcome {
    /// Returns `true` if the outcome indicates a clean object.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Returns `true` if the outcome indicates an infected object.
    pub fn is_infected(&self) -> bool {
        matches!(self, Self::Infected { .. })
    }

    /// Returns the signature name if infected.
    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Infected { signature, .. } => Some(signature),
            Self::Clean => None,
        }
    }
}

/// Connection state of a [`ClamdSession`](crate::session::ClamdSession).
///
/// Commands may only be written in `SessionOpen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No transport.
    Closed,
    /// Transport connected, `IDSESSION` not yet acknowledged by a write.
    Idle,
    /// `IDSESSION` sent; scans may be issued.
    SessionOpen,
}

impl SessionState {
    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Idle => "idle",
            Self::SessionOpen => "session_open",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one scanned object in logs and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemLabel {
    /// Human-readable name, typically the filename.
    pub name: String,

    /// Position of the object within its owner, if the host tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<u32>,
}

impl ItemLabel {
    /// Creates a label with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence_id: None,
        }
    }

    /// Sets the sequence id.
    pub fn with_sequence_id(mut self, sequence_id: u32) -> Self {
        self.sequence_id = Some(sequence_id);
        self
    }
}

impl fmt::Display for ItemLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence_id {
            Some(seq) => write!(f, "bitstream - {}: SequenceId - {}", self.name, seq),
            None => write!(f, "bitstream - {}", self.name),
        }
    }
}

impl From<&str> for ItemLabel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ItemLabel {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Flattened status of one item in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Scanned; no signature match.
    Clean,
    /// Scanned; signature match.
    Infected {
        /// Signature name.
        signature: String,
        /// Raw reply text.
        message: String,
    },
    /// The daemon answered with an uninterpretable reply.
    ProtocolError {
        /// Error details.
        details: String,
    },
    /// The transport failed while scanning this item.
    ConnectionError {
        /// Error message.
        message: String,
    },
    /// The bytes of this item could not be opened; nothing was sent.
    SourceUnavailable {
        /// Reason reported by the source.
        reason: String,
    },
}

impl ItemStatus {
    /// Returns `true` for infected items.
    pub fn is_infected(&self) -> bool {
        matches!(self, Self::Infected { .. })
    }

    /// Returns `true` for items that produced no verdict.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ProtocolError { .. } | Self::ConnectionError { .. } | Self::SourceUnavailable { .. }
        )
    }

    /// Short lowercase name, used in audit events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Infected { .. } => "infected",
            Self::ProtocolError { .. } => "protocol_error",
            Self::ConnectionError { .. } => "connection_error",
            Self::SourceUnavailable { .. } => "source_unavailable",
        }
    }
}

impl From<ScanOutcome> for ItemStatus {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Clean => Self::Clean,
            ScanOutcome::Infected { signature, message } => Self::Infected { signature, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_outcome_is_methods() {
        assert!(ScanOutcome::Clean.is_clean());
        assert_eq!(ScanOutcome::Clean.signature(), None);

        let infected = ScanOutcome::Infected {
            signature: "Eicar-Test-Signature".into(),
            message: "stream: Eicar-Test-Signature FOUND".into(),
        };
        assert!(infected.is_infected());
        assert_eq!(infected.signature(), Some("Eicar-Test-Signature"));
    }

    #[test]
    fn test_item_label_display() {
        let label = ItemLabel::new("thesis.pdf").with_sequence_id(3);
        assert_eq!(label.to_string(), "bitstream - thesis.pdf: SequenceId - 3");
        assert_eq!(ItemLabel::from("a.txt").to_string(), "bitstream - a.txt");
    }

    #[test]
    fn test_item_status_from_outcome() {
        let status = ItemStatus::from(ScanOutcome::Infected {
            signature: "X".into(),
            message: "stream: X FOUND".into(),
        });
        assert!(status.is_infected());
        assert_eq!(status.name(), "infected");
        assert!(!ItemStatus::from(ScanOutcome::Clean).is_error());
    }

    #[test]
    fn test_session_state_default_closed() {
        assert_eq!(SessionState::default(), SessionState::Closed);
        assert_eq!(SessionState::SessionOpen.to_string(), "session_open");
    }
}
