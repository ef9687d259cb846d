use std::collections::HashMap;

use crate::geometry::Point;
use crate::messages::{self, MessageCatalog};
use crate::region::Region;
use crate::registry::DomainDirectory;

pub type UserId = String;

/// Host collaborator answering capability checks. Consulted exactly once
/// per entry transition, never on ticks spent inside a region.
pub trait Authorizer: Send + Sync {
    fn has_capability(&self, user: &str, permission: &str) -> bool;
}

/// Stored visit state for a (user, region) pair. `Outside` is implicit:
/// absence of an entry means the user is outside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Inside, but no entry notice was emitted (blank entry message).
    InsideUnannounced,
    /// Inside, entry notice already shown this visit.
    InsideAnnounced,
}

/// Text the host should deliver to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub user: UserId,
    pub text: String,
}

/// Whether the host must block the movement that triggered evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveVerdict {
    Pass,
    Veto { region: String },
}

/// Result of evaluating one position update against every region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementOutcome {
    pub verdict: MoveVerdict,
    pub notices: Vec<Notice>,
    /// Entry transitions that completed (allowed) during this update.
    pub entries: usize,
}

impl MovementOutcome {
    pub fn is_vetoed(&self) -> bool {
        matches!(self.verdict, MoveVerdict::Veto { .. })
    }
}

/// Per-user, per-region visit state machine.
///
/// Owns all transient membership state; nothing here is persisted. State is
/// created lazily on the first allowed entry and dropped when the user
/// leaves the region or disconnects.
#[derive(Debug, Default)]
pub struct MembershipTracker {
    inside: HashMap<UserId, HashMap<String, VisitState>>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one position update against `regions` (in store order).
    ///
    /// Regions in other domains, or in domains that are not currently
    /// loaded, are skipped. The first denied entry vetoes the move and
    /// stops evaluation; only one veto can apply to a single update since
    /// the host reverts the movement.
    pub fn evaluate<'a>(
        &mut self,
        user: &str,
        domain: &str,
        point: Point,
        regions: impl Iterator<Item = &'a Region>,
        authorizer: &dyn Authorizer,
        domains: &dyn DomainDirectory,
        catalog: &MessageCatalog,
    ) -> MovementOutcome {
        let mut outcome = MovementOutcome {
            verdict: MoveVerdict::Pass,
            notices: Vec::new(),
            entries: 0,
        };

        for region in regions {
            if region.domain != domain {
                continue;
            }
            if !domains.is_domain_loaded(&region.domain) {
                continue;
            }

            let contained = region.contains(point);
            let known = self.visit_state(user, &region.name).is_some();

            match (contained, known) {
                (true, false) => {
                    if !authorizer.has_capability(user, &region.permission) {
                        outcome.notices.push(Notice {
                            user: user.to_string(),
                            text: catalog
                                .render(messages::ENTRY_DENIED, &[("name", &region.name)]),
                        });
                        outcome.verdict = MoveVerdict::Veto {
                            region: region.name.clone(),
                        };
                        // The move will be reverted; nothing else fires.
                        break;
                    }
                    outcome.entries += 1;
                    let text = region.entry_notice();
                    let state = if text.is_empty() {
                        VisitState::InsideUnannounced
                    } else {
                        outcome.notices.push(Notice {
                            user: user.to_string(),
                            text,
                        });
                        VisitState::InsideAnnounced
                    };
                    self.inside
                        .entry(user.to_string())
                        .or_default()
                        .insert(region.name.clone(), state);
                }
                (true, true) => {
                    // Still inside: no re-announcement, no permission
                    // re-check until the next entry transition.
                }
                (false, true) => {
                    self.clear_visit(user, &region.name);
                }
                (false, false) => {}
            }
        }

        outcome
    }

    pub fn visit_state(&self, user: &str, region: &str) -> Option<VisitState> {
        self.inside.get(user).and_then(|m| m.get(region)).copied()
    }

    /// Regions the user is currently inside, for diagnostics.
    pub fn occupancy(&self, user: &str) -> Vec<String> {
        self.inside
            .get(user)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Disconnect cleanup: a returning user gets fresh announcements.
    pub fn forget_user(&mut self, user: &str) {
        self.inside.remove(user);
    }

    /// Drop all state for a removed or renamed region.
    pub fn forget_region(&mut self, region: &str) {
        for visits in self.inside.values_mut() {
            visits.remove(region);
        }
        self.inside.retain(|_, visits| !visits.is_empty());
    }

    fn clear_visit(&mut self, user: &str, region: &str) {
        if let Some(visits) = self.inside.get_mut(user) {
            visits.remove(region);
            if visits.is_empty() {
                self.inside.remove(user);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Point};

    struct AllowAll;

    impl Authorizer for AllowAll {
        fn has_capability(&self, _user: &str, _permission: &str) -> bool {
            true
        }
    }

    struct DenyAll;

    impl Authorizer for DenyAll {
        fn has_capability(&self, _user: &str, _permission: &str) -> bool {
            false
        }
    }

    struct AllLoaded;

    impl DomainDirectory for AllLoaded {
        fn is_domain_loaded(&self, _domain: &str) -> bool {
            true
        }
    }

    struct NoneLoaded;

    impl DomainDirectory for NoneLoaded {
        fn is_domain_loaded(&self, _domain: &str) -> bool {
            false
        }
    }

    fn region(name: &str) -> Region {
        Region::new(
            name,
            BoundingBox::new(Point::new(0.0, 0.0, 0.0), Point::new(10.0, 5.0, 10.0)),
            "world",
            format!("warden.entry.{name}"),
            "Welcome to {name}!",
        )
    }

    fn catalog() -> MessageCatalog {
        MessageCatalog::new()
    }

    const INSIDE: Point = Point::new(5.0, 2.0, 5.0);
    const ALSO_INSIDE: Point = Point::new(5.0, 2.0, 6.0);
    const OUTSIDE: Point = Point::new(20.0, 20.0, 20.0);

    fn eval(
        tracker: &mut MembershipTracker,
        regions: &[Region],
        point: Point,
        authorizer: &dyn Authorizer,
    ) -> MovementOutcome {
        tracker.evaluate(
            "alice",
            "world",
            point,
            regions.iter(),
            authorizer,
            &AllLoaded,
            &catalog(),
        )
    }

    #[test]
    fn entry_announces_exactly_once_per_visit() {
        let regions = vec![region("shop")];
        let mut tracker = MembershipTracker::new();

        let first = eval(&mut tracker, &regions, INSIDE, &AllowAll);
        assert_eq!(first.notices.len(), 1);
        assert_eq!(first.notices[0].text, "Welcome to shop!");
        assert!(!first.is_vetoed());

        let second = eval(&mut tracker, &regions, ALSO_INSIDE, &AllowAll);
        assert!(second.notices.is_empty());
        assert_eq!(second.entries, 0);
    }

    #[test]
    fn leaving_and_reentering_reannounces() {
        let regions = vec![region("shop")];
        let mut tracker = MembershipTracker::new();

        eval(&mut tracker, &regions, INSIDE, &AllowAll);
        let left = eval(&mut tracker, &regions, OUTSIDE, &AllowAll);
        assert!(left.notices.is_empty());
        assert!(tracker.visit_state("alice", "shop").is_none());

        let back = eval(&mut tracker, &regions, INSIDE, &AllowAll);
        assert_eq!(back.notices.len(), 1);
    }

    #[test]
    fn denied_entry_vetoes_and_stays_outside() {
        let regions = vec![region("shop")];
        let mut tracker = MembershipTracker::new();

        let outcome = eval(&mut tracker, &regions, INSIDE, &DenyAll);
        assert_eq!(
            outcome.verdict,
            MoveVerdict::Veto {
                region: "shop".to_string()
            }
        );
        assert_eq!(outcome.notices.len(), 1);
        assert!(outcome.notices[0].text.contains("permission"));
        assert!(tracker.visit_state("alice", "shop").is_none());

        // The revert leaves the user outside; a later allowed update
        // still evaluates from scratch.
        let again = eval(&mut tracker, &regions, INSIDE, &DenyAll);
        assert!(again.is_vetoed());
    }

    #[test]
    fn first_denial_short_circuits_later_regions() {
        let regions = vec![region("gate"), region("shop")];
        let mut tracker = MembershipTracker::new();

        let outcome = eval(&mut tracker, &regions, INSIDE, &DenyAll);
        assert_eq!(
            outcome.verdict,
            MoveVerdict::Veto {
                region: "gate".to_string()
            }
        );
        // Only the vetoing region produced a notice.
        assert_eq!(outcome.notices.len(), 1);
    }

    #[test]
    fn overlapping_regions_fire_independently() {
        let regions = vec![region("outer"), region("inner")];
        let mut tracker = MembershipTracker::new();

        let outcome = eval(&mut tracker, &regions, INSIDE, &AllowAll);
        assert_eq!(outcome.notices.len(), 2);
        assert_eq!(outcome.entries, 2);
        assert_eq!(tracker.occupancy("alice").len(), 2);
    }

    #[test]
    fn other_domains_are_ignored() {
        let mut regions = vec![region("shop")];
        regions[0].domain = "nether".to_string();
        let mut tracker = MembershipTracker::new();

        let outcome = eval(&mut tracker, &regions, INSIDE, &AllowAll);
        assert!(outcome.notices.is_empty());
        assert!(tracker.visit_state("alice", "shop").is_none());
    }

    #[test]
    fn unloaded_domains_are_skipped_not_errors() {
        let regions = vec![region("shop")];
        let mut tracker = MembershipTracker::new();

        let outcome = tracker.evaluate(
            "alice",
            "world",
            INSIDE,
            regions.iter(),
            &AllowAll,
            &NoneLoaded,
            &catalog(),
        );
        assert!(outcome.notices.is_empty());
        assert!(!outcome.is_vetoed());
    }

    #[test]
    fn blank_message_enters_unannounced() {
        let mut regions = vec![region("shop")];
        regions[0].entry_message = String::new();
        let mut tracker = MembershipTracker::new();

        let outcome = eval(&mut tracker, &regions, INSIDE, &AllowAll);
        assert!(outcome.notices.is_empty());
        assert_eq!(outcome.entries, 1);
        assert_eq!(
            tracker.visit_state("alice", "shop"),
            Some(VisitState::InsideUnannounced)
        );
    }

    #[test]
    fn forget_user_resets_announcements() {
        let regions = vec![region("shop")];
        let mut tracker = MembershipTracker::new();

        eval(&mut tracker, &regions, INSIDE, &AllowAll);
        tracker.forget_user("alice");
        let back = eval(&mut tracker, &regions, INSIDE, &AllowAll);
        assert_eq!(back.notices.len(), 1);
    }

    #[test]
    fn forget_region_drops_stale_visits() {
        let regions = vec![region("shop")];
        let mut tracker = MembershipTracker::new();

        eval(&mut tracker, &regions, INSIDE, &AllowAll);
        tracker.forget_region("shop");
        assert!(tracker.occupancy("alice").is_empty());
    }
}
