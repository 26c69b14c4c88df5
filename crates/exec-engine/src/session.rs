//! Session state machine and the shared session store.
//!
//! A `Session` tracks one plan run: which step is next, the outcomes so
//! far, the failure counters, and the terminal status once the run halts.
//! Transitions happen only through `record_outcome`, which keeps the
//! counters and the status consistent.

use crate::blackhole::BlackholeReport;
use crate::config::EngineConfig;
use crate::report::{StepOutcome, StepStatus};
use chrono::Utc;
use portalpilot_plan::Plan;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Lifecycle status of one automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    BlackholeDetected,
    HumanInterventionRequired,
}

impl SessionStatus {
    /// Terminal statuses admit no further step execution.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

/// State of one plan run.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub plan: Plan,

    /// 1-based index of the next step to run.
    pub current_step_index: u32,

    pub outcomes: Vec<StepOutcome>,
    pub status: SessionStatus,

    /// Failures since the last successful step.
    pub consecutive_failures: u32,

    /// All failed steps in this session, never reset.
    pub total_error_count: u32,

    /// Report of the blackhole that halted the session, if one did.
    pub last_blackhole: Option<BlackholeReport>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, plan: Plan) -> Self {
        Self {
            session_id: session_id.into(),
            plan,
            current_step_index: 1,
            outcomes: Vec::new(),
            status: SessionStatus::Running,
            consecutive_failures: 0,
            total_error_count: 0,
            last_blackhole: None,
        }
    }

    /// Fold one step outcome into the session.
    ///
    /// Success resets the consecutive-failure counter. A failure bumps
    /// both counters and halts only on a blackhole verdict or on crossing
    /// the intervention threshold; below those, execution continues with
    /// the next step. Reaching the end of the plan completes the session,
    /// or fails it when any step failed along the way.
    pub fn record_outcome(
        &mut self,
        outcome: StepOutcome,
        blackhole: Option<BlackholeReport>,
        config: &EngineConfig,
    ) {
        let is_last = outcome.step_index as usize >= self.plan.step_count();
        let succeeded = outcome.is_success();
        let status = outcome.status;
        self.outcomes.push(outcome);

        if succeeded {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            self.total_error_count += 1;

            if status == StepStatus::Blackhole {
                self.last_blackhole = blackhole;
                self.status = SessionStatus::BlackholeDetected;
            } else if self.total_error_count >= config.human_intervention_threshold {
                self.status = SessionStatus::HumanInterventionRequired;
            }
            if self.status.is_terminal() {
                info!(
                    session_id = %self.session_id,
                    status = ?self.status,
                    total_errors = self.total_error_count,
                    "session halted"
                );
                return;
            }
        }

        self.current_step_index += 1;
        if is_last {
            self.status = if self.failed_count() == 0 {
                SessionStatus::Completed
            } else {
                SessionStatus::Failed
            };
            info!(
                session_id = %self.session_id,
                status = ?self.status,
                failed_steps = self.failed_count(),
                "plan finished"
            );
        }
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// The outcome of the step the session halted on, if any failed.
    pub fn last_failed_outcome(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().rev().find(|o| !o.is_success())
    }
}

/// Shared registry of live and finished sessions.
///
/// Callers hold a clone; all clones see the same map. Sessions are removed
/// explicitly, not on completion, so reports can be read back later.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        self.sessions
            .lock()
            .await
            .insert(session.session_id.clone(), session);
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().await.remove(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Generate a session identifier: prefix plus a millisecond UTC timestamp.
pub fn generate_session_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Utc::now().format("%Y%m%d%H%M%S%3f"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackhole::SuggestedAction;
    use portalpilot_plan::{ActionCategory, Step};

    fn two_step_plan() -> Plan {
        Plan::new(
            "session_test",
            "Renew road tax",
            "https://portal.example.com",
            vec![
                Step::new(1, ActionCategory::Navigate, "Open the portal"),
                Step::new(2, ActionCategory::Click, "Click renew"),
            ],
        )
    }

    fn success_outcome(step_index: u32) -> StepOutcome {
        StepOutcome {
            step_index,
            status: StepStatus::Success,
            result_text: "done".to_string(),
            error_message: None,
            attempt_count: 1,
            elapsed_secs: 0.1,
        }
    }

    fn failed_outcome(step_index: u32, status: StepStatus) -> StepOutcome {
        StepOutcome {
            step_index,
            status,
            result_text: "boom".to_string(),
            error_message: Some("boom".to_string()),
            attempt_count: 3,
            elapsed_secs: 0.3,
        }
    }

    #[test]
    fn test_success_advances_and_completes() {
        let config = EngineConfig::minimal();
        let mut session = Session::new("s", two_step_plan());

        session.record_outcome(success_outcome(1), None, &config);
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.current_step_index, 2);

        session.record_outcome(success_outcome(2), None, &config);
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.status.is_terminal());
        assert_eq!(session.success_count(), 2);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let mut session = Session::new("s", two_step_plan());
        session.consecutive_failures = 2;
        session.record_outcome(success_outcome(1), None, &EngineConfig::minimal());
        assert_eq!(session.consecutive_failures, 0);
        // Total count is a session-lifetime tally.
        assert_eq!(session.total_error_count, 0);
    }

    #[test]
    fn test_failure_below_thresholds_continues() {
        let config = EngineConfig::minimal();
        let mut session = Session::new("s", two_step_plan());
        session.record_outcome(failed_outcome(1, StepStatus::Failed), None, &config);

        // One failure below the intervention threshold does not halt the
        // session; the next step still runs.
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.current_step_index, 2);
        assert_eq!(session.total_error_count, 1);
        assert_eq!(session.consecutive_failures, 1);
        assert!(session.last_failed_outcome().is_some());
    }

    #[test]
    fn test_plan_with_a_failed_step_ends_failed() {
        let config = EngineConfig::minimal();
        let mut session = Session::new("s", two_step_plan());
        session.record_outcome(failed_outcome(1, StepStatus::Failed), None, &config);
        session.record_outcome(success_outcome(2), None, &config);

        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.success_count(), 1);
        assert_eq!(session.failed_count(), 1);
        // The later success still reset the consecutive counter.
        assert_eq!(session.consecutive_failures, 0);
    }

    #[test]
    fn test_blackhole_takes_priority_over_threshold() {
        let config = EngineConfig::minimal().intervention_threshold(1);
        let mut session = Session::new("s", two_step_plan());
        let report = BlackholeReport {
            is_blackhole: true,
            reason: "consecutive failures".to_string(),
            suggested_action: Some(SuggestedAction::PauseForReview),
            confidence: 0.8,
        };
        session.record_outcome(
            failed_outcome(1, StepStatus::Blackhole),
            Some(report),
            &config,
        );

        assert_eq!(session.status, SessionStatus::BlackholeDetected);
        assert!(session.last_blackhole.is_some());
    }

    #[test]
    fn test_intervention_threshold_escalates() {
        let config = EngineConfig::minimal().intervention_threshold(1);
        let mut session = Session::new("s", two_step_plan());
        session.record_outcome(failed_outcome(1, StepStatus::Failed), None, &config);
        assert_eq!(session.status, SessionStatus::HumanInterventionRequired);
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let store = SessionStore::new();
        store.insert(Session::new("a", two_step_plan())).await;
        assert_eq!(store.len().await, 1);

        let cloned = store.clone();
        assert!(cloned.get("a").await.is_some());
        assert!(store.remove("a").await.is_some());
        assert_eq!(cloned.len().await, 0);
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id("session");
        assert!(id.starts_with("session_"));
        let stamp = id.strip_prefix("session_").unwrap();
        assert_eq!(stamp.len(), 17);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }
}
