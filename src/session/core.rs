use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{Result, WardenError};
use crate::geometry::{BoundingBox, Point};
use crate::region::{Region, entry_permission, normalize_name};
use crate::registry::{AreaRegistry, Corner};
use crate::tracker::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Creating,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    AwaitCornerA,
    AwaitCornerB,
}

/// What a capture accomplished: the session either still needs the second
/// corner or has everything required to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProgress {
    NeedCornerB,
    Complete,
}

/// Short-lived per-user workflow capturing multi-step interactive input
/// before committing a region change atomically.
///
/// Corners are consumed from the user's position only on explicit capture
/// triggers, never on movement ticks. Nothing touches the registry until
/// [`EditSession::commit`].
#[derive(Debug, Clone)]
pub struct EditSession {
    mode: SessionMode,
    /// Current (normalized) name of the region being created or edited.
    target: String,
    rename_to: Option<String>,
    pending_message: Option<String>,
    update_corner_a: bool,
    update_corner_b: bool,
    captured_a: Option<Point>,
    captured_b: Option<Point>,
    step: CaptureStep,
    domain: String,
    opened_at: Instant,
}

impl EditSession {
    pub fn creating(name: impl AsRef<str>, domain: impl Into<String>, message: String) -> Self {
        Self {
            mode: SessionMode::Creating,
            target: normalize_name(name),
            rename_to: None,
            pending_message: Some(message),
            update_corner_a: true,
            update_corner_b: true,
            captured_a: None,
            captured_b: None,
            step: CaptureStep::AwaitCornerA,
            domain: domain.into(),
            opened_at: Instant::now(),
        }
    }

    pub fn editing(
        target: impl AsRef<str>,
        domain: impl Into<String>,
        rename_to: Option<String>,
        new_message: Option<String>,
        update_corner_a: bool,
        update_corner_b: bool,
    ) -> Self {
        Self {
            mode: SessionMode::Editing,
            target: normalize_name(target),
            rename_to: rename_to.map(normalize_name),
            pending_message: new_message,
            update_corner_a,
            update_corner_b,
            captured_a: None,
            captured_b: None,
            step: if update_corner_a {
                CaptureStep::AwaitCornerA
            } else {
                CaptureStep::AwaitCornerB
            },
            domain: domain.into(),
            opened_at: Instant::now(),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn step(&self) -> CaptureStep {
        self.step
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn needs_capture(&self) -> bool {
        self.update_corner_a || self.update_corner_b
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Record the user's position as the corner the session is waiting on.
    pub fn capture(&mut self, point: Point) -> CaptureProgress {
        match self.step {
            CaptureStep::AwaitCornerA => {
                self.captured_a = Some(point);
                if self.update_corner_b {
                    self.step = CaptureStep::AwaitCornerB;
                    CaptureProgress::NeedCornerB
                } else {
                    CaptureProgress::Complete
                }
            }
            CaptureStep::AwaitCornerB => {
                self.captured_b = Some(point);
                CaptureProgress::Complete
            }
        }
    }

    /// Apply the session atomically to the registry.
    ///
    /// Takes `&self` so a failed commit (rename collision, above all)
    /// leaves the session reusable and the registry untouched: the rename
    /// is applied before any bounds or message update. Returns the final
    /// region name.
    pub fn commit(&self, registry: &mut AreaRegistry, namespace: &str) -> Result<String> {
        match self.mode {
            SessionMode::Creating => {
                let corner_a = self.require_corner(self.captured_a, "corner A")?;
                let corner_b = self.require_corner(self.captured_b, "corner B")?;
                let region = Region::new(
                    self.target.clone(),
                    BoundingBox::new(corner_a, corner_b),
                    self.domain.clone(),
                    entry_permission(namespace, &self.target),
                    self.pending_message.clone().unwrap_or_default(),
                );
                registry.create(region)?;
                Ok(self.target.clone())
            }
            SessionMode::Editing => {
                let final_name = match &self.rename_to {
                    Some(new_name) if *new_name != self.target => {
                        registry.rename(&self.target, new_name, namespace)?;
                        new_name.clone()
                    }
                    _ => self.target.clone(),
                };
                if self.update_corner_a {
                    let point = self.require_corner(self.captured_a, "corner A")?;
                    registry.set_corner(&final_name, Corner::A, point)?;
                }
                if self.update_corner_b {
                    let point = self.require_corner(self.captured_b, "corner B")?;
                    registry.set_corner(&final_name, Corner::B, point)?;
                }
                if let Some(message) = &self.pending_message {
                    registry.set_message(&final_name, message.clone())?;
                }
                Ok(final_name)
            }
        }
    }

    fn require_corner(&self, corner: Option<Point>, which: &str) -> Result<Point> {
        corner.ok_or_else(|| {
            WardenError::InvalidSessionState(format!("{which} has not been captured"))
        })
    }
}

/// Live sessions keyed by user, one at most per user.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<UserId, EditSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, user: impl Into<UserId>, session: EditSession) -> Result<()> {
        let user = user.into();
        if self.sessions.contains_key(&user) {
            return Err(WardenError::InvalidSessionState(
                "an edit session is already active".to_string(),
            ));
        }
        self.sessions.insert(user, session);
        Ok(())
    }

    pub fn get_mut(&mut self, user: &str) -> Option<&mut EditSession> {
        self.sessions.get_mut(user)
    }

    pub fn remove(&mut self, user: &str) -> Option<EditSession> {
        self.sessions.remove(user)
    }

    pub fn is_active(&self, user: &str) -> bool {
        self.sessions.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for at least `ttl`, returning the affected users.
    pub fn expire_older_than(&mut self, ttl: Duration) -> Vec<UserId> {
        let expired: Vec<UserId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.age() >= ttl)
            .map(|(user, _)| user.clone())
            .collect();
        for user in &expired {
            self.sessions.remove(user);
        }
        expired
    }
}
