//! Membership tracker orchestrator.

mod core;

pub use core::{
    Authorizer, MembershipTracker, MoveVerdict, MovementOutcome, Notice, UserId, VisitState,
};
