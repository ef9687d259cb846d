use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::error::{Result, WardenError};
use crate::geometry::Point;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::messages::{self, MessageCatalog};
use crate::metrics::WardenMetrics;
use crate::persist::{RegionRecord, RegionSink};
use crate::region::{Region, normalize_name};
use crate::registry::{AreaRegistry, DomainDirectory, RegionSummary};
use crate::session::{CaptureProgress, EditSession, SessionMode, SessionTable};
use crate::tracker::{Authorizer, MembershipTracker, MoveVerdict, MovementOutcome, Notice, UserId};

pub mod audit;

use audit::{NullWardenAudit, WardenAudit, WardenAuditEvent, WardenAuditStage};

/// Configuration knobs for the warden runtime.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Namespace for generated permission keys (`<ns>.entry.<name>`).
    pub permission_namespace: String,
    /// Optional structured logger used by the runtime.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for snapshot emissions.
    pub metrics: Option<Arc<Mutex<WardenMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// Idle lifetime after which [`WardenRuntime::sweep_sessions`] reclaims
    /// an abandoned edit session. `None` disables the sweep.
    pub session_ttl: Option<Duration>,
    /// User-facing message catalog.
    pub catalog: MessageCatalog,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            permission_namespace: "warden".to_string(),
            logger: None,
            metrics: None,
            metrics_target: "warden::runtime.metrics".to_string(),
            session_ttl: None,
            catalog: MessageCatalog::default(),
        }
    }
}

impl RuntimeConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(WardenMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<WardenMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Host-delivered events, for scripted dispatch (tests, benches, replay).
#[derive(Debug, Clone)]
pub enum WardenEvent {
    Move {
        user: UserId,
        domain: String,
        position: Point,
    },
    CaptureCorner {
        user: UserId,
        position: Point,
    },
    Disconnect {
        user: UserId,
    },
}

/// Changes requested by the host's edit surface. `None` fields keep the
/// current value; a blank new message resets to the catalog default.
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    pub rename_to: Option<String>,
    pub new_message: Option<String>,
    pub update_corner_a: bool,
    pub update_corner_b: bool,
}

/// Result of opening an edit: either committed on the spot (no position
/// input needed) or waiting on corner captures.
#[derive(Debug, Clone)]
pub enum EditOutcome {
    Committed { name: String, notice: Notice },
    AwaitingCapture { notice: Notice },
}

/// Result of a corner capture trigger.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// Corner recorded; the session still needs the opposite corner.
    AwaitingNext { notices: Vec<Notice> },
    /// The session committed.
    Committed { name: String, notice: Notice },
}

/// Core engine: owns the region registry, the membership tracker, and the
/// per-user edit sessions, and wires the host collaborators together.
///
/// One instance is a single logical owner; hosts that process users on
/// multiple threads put the runtime behind their own lock, keeping the
/// read-heavy movement path cheap and mutations serialized.
pub struct WardenRuntime {
    registry: AreaRegistry,
    tracker: MembershipTracker,
    sessions: SessionTable,
    authorizer: Arc<dyn Authorizer>,
    domains: Arc<dyn DomainDirectory>,
    config: RuntimeConfig,
    audit: Arc<dyn WardenAudit>,
    started: Instant,
}

impl WardenRuntime {
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        domains: Arc<dyn DomainDirectory>,
        sink: Arc<dyn RegionSink>,
    ) -> Self {
        let runtime = Self {
            registry: AreaRegistry::new(sink),
            tracker: MembershipTracker::new(),
            sessions: SessionTable::new(),
            authorizer,
            domains,
            config: RuntimeConfig::default(),
            audit: Arc::new(NullWardenAudit),
            started: Instant::now(),
        };
        runtime
            .audit
            .record(WardenAuditEvent::new(WardenAuditStage::RuntimeConstructed));
        runtime
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    pub fn set_audit(&mut self, audit: Arc<dyn WardenAudit>) {
        self.audit = audit;
    }

    /// Seed the registry from durable records (startup). Returns how many
    /// regions were loaded; the rest were skipped with warnings.
    pub fn load_regions(&mut self, records: Vec<RegionRecord>) -> usize {
        let total = records.len();
        let loaded = self
            .registry
            .load(records, &*self.domains, self.config.logger.as_ref());
        self.log(
            LogLevel::Info,
            "regions_loaded",
            [
                json_kv("loaded", json!(loaded)),
                json_kv("skipped", json!(total - loaded)),
            ],
        );
        self.audit.record(
            WardenAuditEvent::new(WardenAuditStage::RegionsLoaded)
                .detail("loaded", json!(loaded)),
        );
        loaded
    }

    /// The position feed. Evaluates every region in the user's domain and
    /// returns the verdict plus any notices the host must deliver. A
    /// `Veto` verdict means the host must block (revert) the movement.
    pub fn handle_move(&mut self, user: &str, domain: &str, position: Point) -> MovementOutcome {
        let outcome = self.tracker.evaluate(
            user,
            domain,
            position,
            self.registry.iter(),
            &*self.authorizer,
            &*self.domains,
            &self.config.catalog,
        );

        self.with_metrics(|m| {
            m.record_move();
            for _ in 0..outcome.entries {
                m.record_entry();
            }
            if outcome.is_vetoed() {
                m.record_denial();
            }
            m.record_notices(outcome.notices.len());
        });

        match &outcome.verdict {
            MoveVerdict::Veto { region } => {
                self.log(
                    LogLevel::Info,
                    "entry_denied",
                    [json_kv("user", json!(user)), json_kv("region", json!(region))],
                );
                self.audit.record(
                    WardenAuditEvent::new(WardenAuditStage::EntryDenied)
                        .detail("user", json!(user))
                        .detail("region", json!(region)),
                );
            }
            MoveVerdict::Pass if outcome.entries > 0 => {
                self.log(
                    LogLevel::Debug,
                    "entry_allowed",
                    [
                        json_kv("user", json!(user)),
                        json_kv("entries", json!(outcome.entries)),
                        json_kv("occupancy", json!(self.tracker.occupancy(user))),
                    ],
                );
                self.audit.record(
                    WardenAuditEvent::new(WardenAuditStage::EntryAllowed)
                        .detail("user", json!(user))
                        .detail("entries", json!(outcome.entries)),
                );
            }
            MoveVerdict::Pass => {}
        }

        outcome
    }

    /// Open a creation session. The region is inserted only after both
    /// corners are captured; the returned notice prompts for corner A.
    pub fn begin_create(
        &mut self,
        user: &str,
        name: &str,
        message: &str,
        domain: &str,
    ) -> Result<Notice> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(WardenError::InvalidSessionState(
                "area name cannot be empty".to_string(),
            ));
        }
        if self.registry.get(&key).is_some() {
            return Err(WardenError::AlreadyExists(key));
        }
        let message = self.defaulted_message(message);
        self.sessions
            .open(user.to_string(), EditSession::creating(&key, domain, message))?;
        self.note_session_opened(user, &key, "create");
        Ok(self.notice(user, messages::CORNER_A_PROMPT, &[]))
    }

    /// Open an edit. Pure rename/message edits commit immediately; corner
    /// updates open a capture session.
    pub fn begin_edit(&mut self, user: &str, name: &str, request: EditRequest) -> Result<EditOutcome> {
        let key = normalize_name(name);
        let region = self
            .registry
            .get(&key)
            .ok_or_else(|| WardenError::NotFound(key.clone()))?;
        let domain = region.domain.clone();

        let rename_to = request
            .rename_to
            .map(normalize_name)
            .filter(|n| !n.is_empty() && *n != key);
        let new_message = request
            .new_message
            .map(|m| self.defaulted_message(&m));

        let session = EditSession::editing(
            &key,
            domain,
            rename_to,
            new_message,
            request.update_corner_a,
            request.update_corner_b,
        );

        if !session.needs_capture() {
            let name = session.commit(&mut self.registry, &self.config.permission_namespace)?;
            if name != key {
                self.tracker.forget_region(&key);
            }
            self.note_committed(user, &key, &name, SessionMode::Editing);
            let notice = self.notice(user, messages::EDIT_SUCCESS, &[("name", &name)]);
            return Ok(EditOutcome::Committed { name, notice });
        }

        let prompt = if request.update_corner_a {
            messages::CORNER_A_PROMPT
        } else {
            messages::CORNER_B_PROMPT
        };
        self.sessions.open(user.to_string(), session)?;
        self.note_session_opened(user, &key, "edit");
        Ok(EditOutcome::AwaitingCapture {
            notice: self.notice(user, prompt, &[]),
        })
    }

    /// The discrete "capture corner now" trigger. Consumes the user's
    /// current position as the corner the session is waiting on.
    pub fn handle_capture(&mut self, user: &str, position: Point) -> Result<CaptureOutcome> {
        let Some(session) = self.sessions.get_mut(user) else {
            return Err(WardenError::InvalidSessionState(
                "no active edit session".to_string(),
            ));
        };

        match session.capture(position) {
            CaptureProgress::NeedCornerB => {
                let notices = vec![
                    self.corner_ack(user, position),
                    self.notice(user, messages::CORNER_B_PROMPT, &[]),
                ];
                Ok(CaptureOutcome::AwaitingNext { notices })
            }
            CaptureProgress::Complete => {
                let session = self
                    .sessions
                    .remove(user)
                    .expect("session fetched above");
                if !self.domains.is_domain_loaded(session.domain()) {
                    // The target world went away mid-session; the captured
                    // corners are meaningless now, so the session dies too.
                    let domain = session.domain().to_string();
                    self.note_session_discarded(user, "domain_unloaded");
                    return Err(WardenError::DomainNotLoaded(domain));
                }
                let target_before = session.target().to_string();
                let mode = session.mode();
                match session.commit(&mut self.registry, &self.config.permission_namespace) {
                    Ok(name) => {
                        if mode == SessionMode::Editing && name != target_before {
                            self.tracker.forget_region(&target_before);
                        }
                        self.note_committed(user, &target_before, &name, mode);
                        let key = match mode {
                            SessionMode::Creating => messages::CREATE_SUCCESS,
                            SessionMode::Editing => messages::EDIT_SUCCESS,
                        };
                        let notice = self.notice(user, key, &[("name", &name)]);
                        Ok(CaptureOutcome::Committed { name, notice })
                    }
                    Err(err) => {
                        // Failed commits keep the session so the user can
                        // retry or cancel; the registry was left untouched.
                        let _ = self.sessions.open(user.to_string(), session);
                        Err(err)
                    }
                }
            }
        }
    }

    pub fn cancel_session(&mut self, user: &str) -> Result<Notice> {
        if self.sessions.remove(user).is_none() {
            return Err(WardenError::InvalidSessionState(
                "no active edit session".to_string(),
            ));
        }
        self.note_session_discarded(user, "cancelled");
        Ok(self.notice(user, messages::SESSION_CANCELLED, &[]))
    }

    /// Disconnect cleanup: drops the user's edit session (uncommitted) and
    /// all membership state so a returning user is announced afresh.
    pub fn handle_disconnect(&mut self, user: &str) {
        if self.sessions.remove(user).is_some() {
            self.note_session_discarded(user, "disconnected");
        }
        self.tracker.forget_user(user);
        self.log(
            LogLevel::Debug,
            "user_disconnected",
            [json_kv("user", json!(user))],
        );
    }

    /// Reclaim edit sessions idle past `session_ttl`. The host calls this
    /// on its own cadence; with no TTL configured it is a no-op.
    pub fn sweep_sessions(&mut self) -> Vec<Notice> {
        let Some(ttl) = self.config.session_ttl else {
            return Vec::new();
        };
        let expired = self.sessions.expire_older_than(ttl);
        expired
            .into_iter()
            .map(|user| {
                self.note_session_discarded(&user, "expired");
                self.notice(&user, messages::SESSION_EXPIRED, &[])
            })
            .collect()
    }

    pub fn remove_region(&mut self, name: &str) -> Result<String> {
        let removed = self.registry.remove(name)?;
        self.tracker.forget_region(&removed.name);
        self.with_metrics(|m| m.record_region_mutation());
        self.log(
            LogLevel::Info,
            "region_removed",
            [json_kv("region", json!(removed.name))],
        );
        self.audit.record(
            WardenAuditEvent::new(WardenAuditStage::RegionRemoved)
                .detail("region", json!(removed.name)),
        );
        Ok(self
            .config
            .catalog
            .render(messages::REMOVE_SUCCESS, &[("name", &removed.name)]))
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.registry.get(name)
    }

    pub fn region_count(&self) -> usize {
        self.registry.len()
    }

    pub fn region_summaries(&self) -> Vec<RegionSummary> {
        self.registry.summaries()
    }

    /// Render the `list` surface the way the host displays it.
    pub fn list_message(&self) -> String {
        if self.registry.is_empty() {
            return self.config.catalog.render(messages::LIST_EMPTY, &[]);
        }
        let mut out = self.config.catalog.render(messages::LIST_HEADER, &[]);
        for summary in self.registry.summaries() {
            out.push_str(&format!(
                "\n- {} (domain: {}, permission: {})",
                summary.name, summary.domain, summary.permission
            ));
        }
        out
    }

    pub fn has_session(&self, user: &str) -> bool {
        self.sessions.is_active(user)
    }

    /// Uniform effect-stream entry point for scripted runs.
    pub fn dispatch(&mut self, event: WardenEvent) -> Vec<Notice> {
        match event {
            WardenEvent::Move {
                user,
                domain,
                position,
            } => self.handle_move(&user, &domain, position).notices,
            WardenEvent::CaptureCorner { user, position } => {
                match self.handle_capture(&user, position) {
                    Ok(CaptureOutcome::AwaitingNext { notices }) => notices,
                    Ok(CaptureOutcome::Committed { notice, .. }) => vec![notice],
                    Err(err) => vec![Notice {
                        user,
                        text: err.to_string(),
                    }],
                }
            }
            WardenEvent::Disconnect { user } => {
                self.handle_disconnect(&user);
                Vec::new()
            }
        }
    }

    /// Emit a metrics snapshot through the configured logger.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard
                    .snapshot(self.started.elapsed())
                    .to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn defaulted_message(&self, message: &str) -> String {
        if message.trim().is_empty() {
            self.config
                .catalog
                .get(messages::ENTRY_DEFAULT)
                .unwrap_or("Welcome to {name}!")
                .to_string()
        } else {
            message.to_string()
        }
    }

    fn notice(&self, user: &str, key: &str, pairs: &[(&str, &str)]) -> Notice {
        Notice {
            user: user.to_string(),
            text: self.config.catalog.render(key, pairs),
        }
    }

    fn corner_ack(&self, user: &str, position: Point) -> Notice {
        let (x, y, z) = (
            position.x.to_string(),
            position.y.to_string(),
            position.z.to_string(),
        );
        self.notice(
            user,
            messages::CORNER_SET,
            &[("x", &x), ("y", &y), ("z", &z)],
        )
    }

    fn note_session_opened(&mut self, user: &str, region: &str, kind: &str) {
        self.with_metrics(|m| m.record_session_opened());
        self.log(
            LogLevel::Debug,
            "session_opened",
            [
                json_kv("user", json!(user)),
                json_kv("region", json!(region)),
                json_kv("kind", json!(kind)),
            ],
        );
        self.audit.record(
            WardenAuditEvent::new(WardenAuditStage::SessionOpened)
                .detail("user", json!(user))
                .detail("region", json!(region)),
        );
    }

    fn note_committed(&mut self, user: &str, before: &str, after: &str, mode: SessionMode) {
        self.with_metrics(|m| {
            m.record_session_committed();
            m.record_region_mutation();
        });
        self.log(
            LogLevel::Info,
            "session_committed",
            [
                json_kv("user", json!(user)),
                json_kv("region", json!(after)),
                json_kv("renamed_from", json!(before)),
                json_kv(
                    "mode",
                    json!(match mode {
                        SessionMode::Creating => "create",
                        SessionMode::Editing => "edit",
                    }),
                ),
            ],
        );
        self.audit.record(
            WardenAuditEvent::new(WardenAuditStage::SessionCommitted)
                .detail("user", json!(user))
                .detail("region", json!(after)),
        );
    }

    fn note_session_discarded(&mut self, user: &str, reason: &str) {
        self.with_metrics(|m| m.record_session_discarded());
        self.log(
            LogLevel::Debug,
            "session_discarded",
            [
                json_kv("user", json!(user)),
                json_kv("reason", json!(reason)),
            ],
        );
        self.audit.record(
            WardenAuditEvent::new(WardenAuditStage::SessionDiscarded)
                .detail("user", json!(user))
                .detail("reason", json!(reason)),
        );
    }

    fn with_metrics(&self, f: impl FnOnce(&mut WardenMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                f(&mut guard);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, "warden::runtime", message, fields);
            let _ = logger.log_event(event);
        }
    }
}
