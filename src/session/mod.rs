//! Edit session orchestrator.

mod core;

pub use core::{CaptureProgress, CaptureStep, EditSession, SessionMode, SessionTable};
