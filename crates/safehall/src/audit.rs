//! Best-effort audit trail writer.

use std::sync::Arc;

use safehall_core::Clock;
use safehall_store::{AuditEntry, AuditEvent, AuditLog};

/// Stamps events with the clock and appends them. Failures are logged and
/// swallowed.
pub(crate) struct Auditor<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl<S> Clone for Auditor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            enabled: self.enabled,
        }
    }
}

impl<S: AuditLog> Auditor<S> {
    pub(crate) fn new(store: Arc<S>, clock: Arc<dyn Clock>, enabled: bool) -> Self {
        Self { store, clock, enabled }
    }

    pub(crate) async fn record(&self, event: AuditEvent) {
        if !self.enabled {
            return;
        }
        let entry = AuditEntry::new(self.clock.now_millis(), event);
        if let Err(e) = self.store.append(&entry).await {
            tracing::warn!(error = %e, "failed to write audit event");
        }
    }
}
