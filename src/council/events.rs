//! Progress notification for council runs.
//!
//! The pipeline emits these events; rendering them is left to the
//! presentation layer (see `output::console`).

use std::time::Duration;

use super::types::{Response, Stage};

pub trait ProgressNotifier: Send + Sync {
    /// Called before a stage launches its invocations
    fn on_stage_start(&self, stage: Stage, total: usize);

    /// Called as each invocation terminates, in completion order
    fn on_invocation_complete(&self, stage: Stage, response: &Response, completed: usize, total: usize);

    /// Called once every invocation of the stage has terminated
    fn on_stage_complete(&self, stage: Stage, elapsed: Duration);

    /// Called when a stage is intentionally not run
    fn on_stage_skipped(&self, _stage: Stage, _reason: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_stage_start(&self, _stage: Stage, _total: usize) {}
    fn on_invocation_complete(&self, _stage: Stage, _response: &Response, _completed: usize, _total: usize) {}
    fn on_stage_complete(&self, _stage: Stage, _elapsed: Duration) {}
}
