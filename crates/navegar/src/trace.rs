//! Per-action execution traces.
//!
//! When a scripted action fails, the interesting question is which stage
//! failed: did the overlay never clear, did no locator resolve, did the
//! driver action error, or did the verification read back something else?
//! The recorder captures one step per stage with its clock timestamp and
//! outcome, and exports recordings as JSON for inspection. Handed to the
//! action facade as a [`SharedRecorder`], it is fed automatically by every
//! facade operation.

use crate::clock::SharedClock;
use crate::result::NavegarResult;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Stage of the fixed action composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Overlay / async-work barrier
    Synchronize,
    /// Locator resolution
    Resolve,
    /// The driver action itself
    Act,
    /// Post-action read-back
    Verify,
}

/// One recorded stage of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Which stage this step belongs to
    pub kind: StepKind,
    /// Short human-readable description (locator, script, expected value)
    pub label: String,
    /// Whether the stage succeeded
    pub outcome: bool,
    /// Clock timestamp in milliseconds since the Unix epoch
    pub at_ms: u64,
}

/// A complete recording of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTrace {
    /// Identifier of this recording
    pub id: Uuid,
    /// The action as issued by the caller
    pub action: String,
    /// Clock timestamp the action started at
    pub started_at_ms: u64,
    /// Recorded stages in execution order
    pub steps: Vec<TraceStep>,
}

impl ActionTrace {
    /// Whether every recorded stage succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|step| step.outcome)
    }

    /// The first failed stage, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&TraceStep> {
        self.steps.iter().find(|step| !step.outcome)
    }
}

/// Shared handle to one recorder, wired into the action facade while
/// staying readable from the caller.
pub type SharedRecorder = std::sync::Arc<std::sync::Mutex<TraceRecorder>>;

/// Records action traces against the engine clock.
#[derive(Debug)]
pub struct TraceRecorder {
    clock: SharedClock,
    current: Option<ActionTrace>,
    completed: Vec<ActionTrace>,
}

impl TraceRecorder {
    /// Create a recorder over the engine clock.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            current: None,
            completed: Vec::new(),
        }
    }

    /// Wrap the recorder for sharing with the action facade.
    #[must_use]
    pub fn into_shared(self) -> SharedRecorder {
        std::sync::Arc::new(std::sync::Mutex::new(self))
    }

    /// Start recording a new action. An unfinished previous recording is
    /// completed first.
    pub fn begin(&mut self, action: impl Into<String>) {
        self.finish();
        self.current = Some(ActionTrace {
            id: Uuid::new_v4(),
            action: action.into(),
            started_at_ms: self.clock.now_ms(),
            steps: Vec::new(),
        });
    }

    /// Record one stage of the current action. A step recorded with no
    /// action in flight opens an anonymous recording.
    pub fn step(&mut self, kind: StepKind, label: impl Into<String>, outcome: bool) {
        if self.current.is_none() {
            self.begin("(unnamed)");
        }
        if let Some(trace) = self.current.as_mut() {
            trace.steps.push(TraceStep {
                kind,
                label: label.into(),
                outcome,
                at_ms: self.clock.now_ms(),
            });
        }
    }

    /// Close the current recording and move it to the completed list.
    pub fn finish(&mut self) {
        if let Some(trace) = self.current.take() {
            self.completed.push(trace);
        }
    }

    /// Completed recordings in order.
    #[must_use]
    pub fn completed(&self) -> &[ActionTrace] {
        &self.completed
    }

    /// Serialize all completed recordings as pretty JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> NavegarResult<String> {
        Ok(serde_json::to_string_pretty(&self.completed)?)
    }

    /// Write all completed recordings to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Propagates I/O and serialization failures.
    pub fn export(&self, path: &Path) -> NavegarResult<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(self.to_json()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use std::sync::Arc;
    use std::time::Duration;

    fn recorder() -> (Arc<TestClock>, TraceRecorder) {
        let clock = Arc::new(TestClock::new());
        let recorder = TraceRecorder::new(clock.clone());
        (clock, recorder)
    }

    #[test]
    fn test_records_stages_with_timestamps() {
        let (clock, mut recorder) = recorder();
        recorder.begin("type 00003 into amount");
        recorder.step(StepKind::Synchronize, "overlay barrier", true);
        clock.advance(Duration::from_millis(300));
        recorder.step(StepKind::Resolve, "amount", true);
        recorder.step(StepKind::Act, "send_keys", true);
        recorder.step(StepKind::Verify, "value == 00003", true);
        recorder.finish();

        let traces = recorder.completed();
        assert_eq!(traces.len(), 1);
        assert!(traces[0].succeeded());
        assert_eq!(traces[0].steps[0].at_ms, 0);
        assert_eq!(traces[0].steps[1].at_ms, 300);
    }

    #[test]
    fn test_first_failure_points_at_the_failed_stage() {
        let (_, mut recorder) = recorder();
        recorder.begin("click save");
        recorder.step(StepKind::Synchronize, "overlay barrier", true);
        recorder.step(StepKind::Resolve, "save", false);
        recorder.finish();

        let trace = &recorder.completed()[0];
        assert!(!trace.succeeded());
        let failure = trace.first_failure().unwrap();
        assert_eq!(failure.kind, StepKind::Resolve);
        assert_eq!(failure.label, "save");
    }

    #[test]
    fn test_begin_closes_an_unfinished_recording() {
        let (_, mut recorder) = recorder();
        recorder.begin("first");
        recorder.step(StepKind::Act, "click", true);
        recorder.begin("second");
        recorder.finish();
        assert_eq!(recorder.completed().len(), 2);
        assert_ne!(recorder.completed()[0].id, recorder.completed()[1].id);
    }

    #[test]
    fn test_json_roundtrip() {
        let (_, mut recorder) = recorder();
        recorder.begin("read status");
        recorder.step(StepKind::Verify, "Posted", true);
        recorder.finish();
        let json = recorder.to_json().unwrap();
        let back: Vec<ActionTrace> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recorder.completed());
    }

    #[test]
    fn test_export_writes_file() {
        let (_, mut recorder) = recorder();
        recorder.begin("click save");
        recorder.step(StepKind::Act, "click", true);
        recorder.finish();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.json");
        recorder.export(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("click save"));
    }
}
