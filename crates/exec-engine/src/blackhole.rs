//! Blackhole detection over the rolling attempt window.
//!
//! Flags three patterns of unproductive repetition: trailing runs of
//! failures, recurring similar errors, and step-repetition loops. The
//! check is a pure function of the recorded history — no wall-clock input
//! — so identical attempt sequences always produce identical reports.

use crate::window::ErrorDetectionWindow;
use portalpilot_plan::BlackholeThresholds;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Error fragments counted as "similar" recurring errors.
const SIMILAR_ERROR_KEYWORDS: &[&str] = &["not found", "timeout", "invalid", "failed"];

/// Window size inspected by the step-repetition rule.
const LOOP_SAMPLE: usize = 5;

/// Maximum distinct step indices within the loop sample before the run is
/// considered stuck.
const LOOP_DISTINCT_LIMIT: usize = 2;

/// What the caller should do about a detected blackhole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Pause automation and let a human review the page.
    PauseForReview,
    /// Change the approach or escalate.
    ModifyApproach,
    /// Break the loop and try an alternative path.
    BreakLoop,
}

/// Outcome of one detection check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackholeReport {
    pub is_blackhole: bool,
    pub reason: String,
    pub suggested_action: Option<SuggestedAction>,
    pub confidence: f64,
}

impl BlackholeReport {
    fn clear() -> Self {
        Self {
            is_blackhole: false,
            reason: String::new(),
            suggested_action: None,
            confidence: 0.0,
        }
    }

    fn detected(reason: &str, action: SuggestedAction, confidence: f64) -> Self {
        Self {
            is_blackhole: true,
            reason: reason.to_string(),
            suggested_action: Some(action),
            confidence,
        }
    }

    /// Whether the detected pattern is a step-repetition loop.
    pub fn is_loop(&self) -> bool {
        self.is_blackhole && self.suggested_action == Some(SuggestedAction::BreakLoop)
    }
}

/// Detector owning one session's attempt window.
#[derive(Debug, Default)]
pub struct BlackholeDetector {
    window: ErrorDetectionWindow,
}

impl BlackholeDetector {
    pub fn new() -> Self {
        Self {
            window: ErrorDetectionWindow::new(),
        }
    }

    /// Record one attempt without running detection. Used for successful
    /// attempts, which still count toward the loop rule.
    pub fn record_attempt(
        &mut self,
        step_index: u32,
        instruction: &str,
        error_message: Option<&str>,
    ) {
        self.window.record(step_index, instruction, error_message);
    }

    /// Record a failed attempt and evaluate all three rules.
    pub fn record_and_check(
        &mut self,
        step_index: u32,
        instruction: &str,
        error_message: &str,
        thresholds: &BlackholeThresholds,
    ) -> BlackholeReport {
        self.window
            .record(step_index, instruction, Some(error_message));
        let report = self.check(thresholds);
        if report.is_blackhole {
            warn!(
                step_index,
                reason = %report.reason,
                confidence = report.confidence,
                "blackhole detected"
            );
        }
        report
    }

    /// Evaluate the rules against the current window. First match wins,
    /// in priority order: consecutive failures, similar errors, loop.
    pub fn check(&self, thresholds: &BlackholeThresholds) -> BlackholeReport {
        if self.consecutive_failures_tripped(thresholds.max_consecutive_failures) {
            return BlackholeReport::detected(
                "consecutive failures",
                SuggestedAction::PauseForReview,
                0.8,
            );
        }

        if self.similar_errors_tripped(thresholds.max_similar_errors) {
            return BlackholeReport::detected(
                "similar errors repeating",
                SuggestedAction::ModifyApproach,
                0.9,
            );
        }

        if self.loop_tripped() {
            return BlackholeReport::detected(
                "infinite loop: same steps repeating",
                SuggestedAction::BreakLoop,
                0.95,
            );
        }

        BlackholeReport::clear()
    }

    /// Read access for tests and observers.
    pub fn window(&self) -> &ErrorDetectionWindow {
        &self.window
    }

    fn consecutive_failures_tripped(&self, max_consecutive: u32) -> bool {
        let needed = max_consecutive as usize;
        if needed == 0 || self.window.len() < needed {
            return false;
        }
        self.window.recent(needed).all(|r| r.is_failure())
    }

    fn similar_errors_tripped(&self, max_similar: u32) -> bool {
        if max_similar == 0 {
            return false;
        }
        let similar = self
            .window
            .iter()
            .filter_map(|r| r.error_message.as_deref())
            .map(str::to_lowercase)
            .filter(|err| SIMILAR_ERROR_KEYWORDS.iter().any(|kw| err.contains(kw)))
            .count();
        similar >= max_similar as usize
    }

    fn loop_tripped(&self) -> bool {
        if self.window.len() < LOOP_SAMPLE {
            return false;
        }
        let distinct: HashSet<u32> = self.window.recent(LOOP_SAMPLE).map(|r| r.step_index).collect();
        distinct.len() <= LOOP_DISTINCT_LIMIT
    }
}
