//! Named, permission-gated areas for a shared virtual world.
//!
//! The crate is the host-agnostic core of an area system: operators define
//! named axis-aligned 3-D regions bound to a permission and an entry
//! message, and every position update is evaluated against them. The host
//! platform feeds movement, capture, and disconnect events in and carries
//! out the effects (notices, movement vetoes) that come back out.

pub mod error;
pub mod geometry;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod persist;
pub mod region;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod tracker;

pub use error::{Result, WardenError};
pub use geometry::{BoundingBox, Point};
pub use logging::{FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, MemorySink};
pub use messages::MessageCatalog;
pub use metrics::{MetricSnapshot, WardenMetrics};
pub use persist::{JsonFileStore, MemoryRegionSink, NullRegionSink, RegionRecord, RegionSink};
pub use region::{Region, entry_permission, normalize_name};
pub use registry::{AreaRegistry, Corner, DomainDirectory, RegionSummary};
pub use runtime::audit::{NullWardenAudit, WardenAudit, WardenAuditEvent, WardenAuditStage};
pub use runtime::{
    CaptureOutcome, EditOutcome, EditRequest, RuntimeConfig, WardenEvent, WardenRuntime,
};
pub use session::{CaptureProgress, CaptureStep, EditSession, SessionMode, SessionTable};
pub use tracker::{
    Authorizer, MembershipTracker, MoveVerdict, MovementOutcome, Notice, UserId, VisitState,
};
