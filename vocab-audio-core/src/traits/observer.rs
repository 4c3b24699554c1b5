use crate::models::recording_result::{CaptureId, ProcessedResult, Stage};
use crate::models::state::PipelineState;

/// Receives pipeline notifications.
///
/// All methods are called synchronously on the thread running the pipeline.
/// Implementations should marshal to the UI thread if needed. Every method
/// defaults to a no-op so observers only implement what they display.
pub trait PipelineObserver: Send + Sync {
    /// Called when a capture's state changes.
    fn on_state_changed(&self, _capture: &CaptureId, _state: &PipelineState) {}

    /// Called when a stage's output is discarded in favour of an earlier one.
    fn on_fallback(&self, _capture: &CaptureId, _from: Stage, _reason: &str) {}

    /// Called once the capture reaches `Done`.
    fn on_processing_finished(&self, _capture: &CaptureId, _result: &ProcessedResult) {}
}
