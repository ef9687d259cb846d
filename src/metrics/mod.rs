use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by the runtime while it processes host events.
#[derive(Debug, Default, Clone)]
pub struct WardenMetrics {
    moves: u64,
    entries: u64,
    denials: u64,
    notices: u64,
    region_mutations: u64,
    sessions_opened: u64,
    sessions_committed: u64,
    sessions_discarded: u64,
}

impl WardenMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_move(&mut self) {
        self.moves = self.moves.saturating_add(1);
    }

    pub fn record_entry(&mut self) {
        self.entries = self.entries.saturating_add(1);
    }

    pub fn record_denial(&mut self) {
        self.denials = self.denials.saturating_add(1);
    }

    pub fn record_notices(&mut self, count: usize) {
        if count > 0 {
            self.notices = self.notices.saturating_add(count as u64);
        }
    }

    pub fn record_region_mutation(&mut self) {
        self.region_mutations = self.region_mutations.saturating_add(1);
    }

    pub fn record_session_opened(&mut self) {
        self.sessions_opened = self.sessions_opened.saturating_add(1);
    }

    pub fn record_session_committed(&mut self) {
        self.sessions_committed = self.sessions_committed.saturating_add(1);
    }

    pub fn record_session_discarded(&mut self) {
        self.sessions_discarded = self.sessions_discarded.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            moves: self.moves,
            entries: self.entries,
            denials: self.denials,
            notices: self.notices,
            region_mutations: self.region_mutations,
            sessions_opened: self.sessions_opened,
            sessions_committed: self.sessions_committed,
            sessions_discarded: self.sessions_discarded,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub moves: u64,
    pub entries: u64,
    pub denials: u64,
    pub notices: u64,
    pub region_mutations: u64,
    pub sessions_opened: u64,
    pub sessions_committed: u64,
    pub sessions_discarded: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        let mut fields = LogFields::new();
        fields.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        fields.insert("moves".to_string(), json!(self.moves));
        fields.insert("entries".to_string(), json!(self.entries));
        fields.insert("denials".to_string(), json!(self.denials));
        fields.insert("notices".to_string(), json!(self.notices));
        fields.insert("region_mutations".to_string(), json!(self.region_mutations));
        fields.insert("sessions_opened".to_string(), json!(self.sessions_opened));
        fields.insert(
            "sessions_committed".to_string(),
            json!(self.sessions_committed),
        );
        fields.insert(
            "sessions_discarded".to_string(),
            json!(self.sessions_discarded),
        );
        let mut event = LogEvent::new(LogLevel::Info, target, "warden_metrics");
        event.fields = fields;
        event
    }
}
