//! Run reports: per-step outcomes and the terminal automation report.

use serde::{Deserialize, Serialize};

/// Terminal state of one step after its retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step's result classified as successful.
    Success,
    /// Every attempt in the budget failed.
    Failed,
    /// Blackhole detection halted the step mid-retry.
    Blackhole,
}

/// Result of executing one step, retries included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_index: u32,
    pub status: StepStatus,

    /// Result text of the last attempt.
    pub result_text: String,

    /// Error message of the last failed attempt, `None` on success.
    pub error_message: Option<String>,

    /// Attempts actually made, 1..=max_attempts.
    pub attempt_count: u32,

    pub elapsed_secs: f64,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Terminal status of one whole automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All steps succeeded.
    Success,
    /// Some steps succeeded before the run failed.
    Partial,
    /// The run failed without useful progress.
    Failed,
    /// A blackhole pattern halted the run.
    BlackholeDetected,
    /// The run hit a condition only a human can resolve.
    HumanInterventionRequired,
}

/// What the engine hands back to the caller when a run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationReport {
    pub status: RunStatus,

    /// One-line human-readable summary.
    pub message: String,

    pub session_id: String,

    /// Outcomes of every step that ran, in execution order.
    pub outcomes: Vec<StepOutcome>,

    pub requires_human: bool,

    /// Recovery suggestions from the terminal classifier.
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Manual-completion tutorial, present only on hand-off.
    #[serde(default)]
    pub tutorial: Option<String>,
}

impl AutomationReport {
    pub fn success(session_id: impl Into<String>, outcomes: Vec<StepOutcome>) -> Self {
        let count = outcomes.len();
        Self {
            status: RunStatus::Success,
            message: format!("All {count} steps completed"),
            session_id: session_id.into(),
            outcomes,
            requires_human: false,
            suggestions: Vec::new(),
            tutorial: None,
        }
    }

    /// A run that never produced step outcomes (generation or validation
    /// failure, no browser session).
    pub fn aborted(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            message: message.into(),
            session_id: session_id.into(),
            outcomes: Vec::new(),
            requires_human: true,
            suggestions: Vec::new(),
            tutorial: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_tutorial(mut self, tutorial: impl Into<String>) -> Self {
        self.tutorial = Some(tutorial.into());
        self
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_report() {
        let report = AutomationReport::success(
            "session_x",
            vec![StepOutcome {
                step_index: 1,
                status: StepStatus::Success,
                result_text: "done".to_string(),
                error_message: None,
                attempt_count: 1,
                elapsed_secs: 0.4,
            }],
        );
        assert_eq!(report.status, RunStatus::Success);
        assert!(!report.requires_human);
        assert_eq!(report.success_count(), 1);
    }

    #[test]
    fn test_aborted_report_requires_human() {
        let report = AutomationReport::aborted("session_x", "plan generation failed");
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.requires_human);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&RunStatus::HumanInterventionRequired).unwrap();
        assert_eq!(json, "\"human_intervention_required\"");
    }
}
