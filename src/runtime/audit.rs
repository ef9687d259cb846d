//! Runtime lifecycle audit hooks.
//!
//! Lightweight instrumentation so hosts can observe the warden's major
//! transitions. Records carry a stage identifier plus structured metadata;
//! downstream code can log, buffer, or visualize them without touching the
//! evaluation path.

use std::time::SystemTime;

use serde_json::Value;

/// Distinct lifecycle checkpoints emitted by `WardenRuntime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WardenAuditStage {
    /// A new runtime instance was constructed.
    RuntimeConstructed,
    /// Durable records were loaded into the registry.
    RegionsLoaded,
    /// A user completed an entry transition into a region.
    EntryAllowed,
    /// A movement was vetoed at a region boundary.
    EntryDenied,
    /// An edit session was opened for a user.
    SessionOpened,
    /// An edit session committed its changes to the registry.
    SessionCommitted,
    /// An edit session ended without committing (cancel, disconnect, TTL).
    SessionDiscarded,
    /// A region was removed from the registry.
    RegionRemoved,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct WardenAuditEvent {
    pub timestamp: SystemTime,
    pub stage: WardenAuditStage,
    pub details: Vec<(String, Value)>,
}

impl WardenAuditEvent {
    pub fn new(stage: WardenAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.push((key.into(), value));
        self
    }
}

/// Trait implemented by any audit sink.
pub trait WardenAudit: Send + Sync {
    fn record(&self, event: WardenAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullWardenAudit;

impl WardenAudit for NullWardenAudit {
    fn record(&self, _event: WardenAuditEvent) {}
}
