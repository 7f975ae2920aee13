use securebank_core::audit::{AuditEvent, AuditOutcome, AuditSink};
use tracing::{info, warn};

/// Forwards audit events to `tracing` so they land in the process log.
#[derive(Clone, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let flow = event.flow.map(|flow| flow.as_str()).unwrap_or("none");
        let metadata = event
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");

        match event.outcome {
            AuditOutcome::Failed => warn!(
                event_name = "audit.event",
                audit_event = %event.event_type,
                session_id = %event.session_id,
                correlation_id = %event.correlation_id,
                category = ?event.category,
                outcome = ?event.outcome,
                flow,
                metadata = %metadata,
                "audit"
            ),
            AuditOutcome::Success | AuditOutcome::Rejected => info!(
                event_name = "audit.event",
                audit_event = %event.event_type,
                session_id = %event.session_id,
                correlation_id = %event.correlation_id,
                category = ?event.category,
                outcome = ?event.outcome,
                flow,
                metadata = %metadata,
                "audit"
            ),
        }
    }
}
