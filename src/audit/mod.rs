//! Structured audit logging.
//!
//! Session lifecycle, scan verdicts and batch outcomes are emitted as
//! `tracing` events on the `clamstream::audit` target. Route that target to
//! a dedicated subscriber layer (JSON file, log shipper) to keep an audit
//! trail separate from diagnostic logs.

mod events;

pub use events::{
    emit_batch_completed, emit_infection_detected, emit_scan_completed, emit_session_closed,
    emit_session_opened, AuditEvent, BatchAuditEvent, InfectionSummary,
};
