//! Terminal classification and the one-shot improvement gate.
//!
//! When a session halts, the classifier names the failure, and the gate
//! decides between three exits: report success, request a single improved
//! plan, or hand off to a human with recovery suggestions. The gate is
//! structurally one-shot: once an improvement has been spent, every later
//! failure hands off.

use crate::session::{Session, SessionStatus};
use portalpilot_plan::PriorFailureContext;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Why an automation run could not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Unspecific trouble; a fresh plan may route around it.
    GeneralDifficulties,
    /// The run is stuck and cannot make progress on this path.
    CannotProceed,
    Timeout,
    ElementNotFound,
    /// The run was repeating the same steps without progress.
    InfiniteLoop,
    AuthenticationRequired,
    CaptchaRequired,
    PaymentRequired,
    PermissionDenied,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::GeneralDifficulties => "general_difficulties",
            ErrorCategory::CannotProceed => "cannot_proceed",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::ElementNotFound => "element_not_found",
            ErrorCategory::InfiniteLoop => "infinite_loop",
            ErrorCategory::AuthenticationRequired => "authentication_required",
            ErrorCategory::CaptchaRequired => "captcha_required",
            ErrorCategory::PaymentRequired => "payment_required",
            ErrorCategory::PermissionDenied => "permission_denied",
        }
    }

    /// Whether an improved plan has a realistic chance against this
    /// category. Conditions needing the user (credentials, captcha,
    /// payment, permissions) and detected loops do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::GeneralDifficulties
                | ErrorCategory::CannotProceed
                | ErrorCategory::Timeout
                | ErrorCategory::ElementNotFound
        )
    }

    /// Recovery suggestions surfaced to the user on hand-off.
    pub fn suggestions(&self) -> Vec<String> {
        let lines: &[&str] = match self {
            ErrorCategory::GeneralDifficulties => &[
                "Try the task again later",
                "Complete the task manually using the tutorial",
            ],
            ErrorCategory::CannotProceed => &[
                "Check that the portal is reachable and not under maintenance",
                "Complete the task manually using the tutorial",
            ],
            ErrorCategory::Timeout => &[
                "Check the network connection",
                "The portal may be slow; try again later",
            ],
            ErrorCategory::ElementNotFound => &[
                "The portal layout may have changed",
                "Complete the task manually using the tutorial",
            ],
            ErrorCategory::InfiniteLoop => &[
                "The automation was repeating itself without progress",
                "Complete the task manually using the tutorial",
            ],
            ErrorCategory::AuthenticationRequired => &[
                "Log in to the portal manually",
                "Verify the stored credentials are current",
            ],
            ErrorCategory::CaptchaRequired => &[
                "Solve the captcha manually",
                "Continue the task manually after the captcha",
            ],
            ErrorCategory::PaymentRequired => &[
                "Complete the payment step manually",
                "Verify the payment details before submitting",
            ],
            ErrorCategory::PermissionDenied => &[
                "Check that the account has access to this service",
                "Contact the portal's support if access should exist",
            ],
        };
        lines.iter().map(|s| s.to_string()).collect()
    }
}

/// Name the failure of a halted session.
///
/// A loop verdict from blackhole detection outranks error-text sniffing;
/// user-facing blockers outrank the generic categories.
pub fn classify_failure(session: &Session) -> ErrorCategory {
    if let Some(report) = &session.last_blackhole {
        if report.is_loop() {
            return ErrorCategory::InfiniteLoop;
        }
    }

    let error = session
        .last_failed_outcome()
        .and_then(|o| o.error_message.as_deref())
        .unwrap_or("")
        .to_lowercase();

    if error.contains("captcha") {
        ErrorCategory::CaptchaRequired
    } else if ["login", "password", "credential", "unauthorized", "sign in"]
        .iter()
        .any(|kw| error.contains(kw))
    {
        ErrorCategory::AuthenticationRequired
    } else if error.contains("payment") {
        ErrorCategory::PaymentRequired
    } else if ["permission", "denied", "forbidden"]
        .iter()
        .any(|kw| error.contains(kw))
    {
        ErrorCategory::PermissionDenied
    } else if error.contains("not found") {
        ErrorCategory::ElementNotFound
    } else if error.contains("timeout") || error.contains("timed out") {
        ErrorCategory::Timeout
    } else if session.last_blackhole.is_some() {
        ErrorCategory::CannotProceed
    } else {
        ErrorCategory::GeneralDifficulties
    }
}

/// What to do with a halted session.
#[derive(Debug, Clone)]
pub enum GateDecision {
    ReportSuccess,
    /// Request one improved plan carrying the failure context.
    ImproveAndRetry { context: PriorFailureContext },
    /// Give up and hand the task to the user.
    HandOff {
        category: ErrorCategory,
        suggestions: Vec<String>,
    },
}

/// One-shot gate between a failed run and the single re-plan attempt.
#[derive(Debug, Default)]
pub struct ImprovementGate {
    improvement_applied: bool,
}

impl ImprovementGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the exit for a halted session.
    pub fn decide(&mut self, session: &Session) -> GateDecision {
        if session.status == SessionStatus::Completed {
            return GateDecision::ReportSuccess;
        }

        let category = classify_failure(session);
        let suggestions = category.suggestions();

        if category.is_retryable() && !self.improvement_applied {
            self.improvement_applied = true;
            let failed = session.last_failed_outcome();
            info!(
                session_id = %session.session_id,
                category = category.label(),
                "requesting one improved plan"
            );
            return GateDecision::ImproveAndRetry {
                context: PriorFailureContext {
                    error_category: category.label().to_string(),
                    suggestions,
                    failed_step_index: failed.map(|o| o.step_index),
                    failure_message: failed.and_then(|o| o.error_message.clone()),
                },
            };
        }

        info!(
            session_id = %session.session_id,
            category = category.label(),
            "handing off to the user"
        );
        GateDecision::HandOff {
            category,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackhole::{BlackholeReport, SuggestedAction};
    use crate::report::{StepOutcome, StepStatus};
    use portalpilot_plan::{ActionCategory, Plan, Step};

    fn halted_session(error: &str, status: SessionStatus) -> Session {
        let plan = Plan::new(
            "s",
            "Renew road tax",
            "https://portal.example.com",
            vec![Step::new(1, ActionCategory::Click, "Click renew")],
        );
        let mut session = Session::new("s", plan);
        session.outcomes.push(StepOutcome {
            step_index: 1,
            status: StepStatus::Failed,
            result_text: error.to_string(),
            error_message: Some(error.to_string()),
            attempt_count: 3,
            elapsed_secs: 1.0,
        });
        session.status = status;
        session
    }

    #[test]
    fn test_completed_session_reports_success() {
        let plan = Plan::new("s", "t", "https://x", vec![]);
        let mut session = Session::new("s", plan);
        session.status = SessionStatus::Completed;
        assert!(matches!(
            ImprovementGate::new().decide(&session),
            GateDecision::ReportSuccess
        ));
    }

    #[test]
    fn test_retryable_failure_improves_once_then_hands_off() {
        let session = halted_session("renew button not found", SessionStatus::Failed);
        let mut gate = ImprovementGate::new();

        match gate.decide(&session) {
            GateDecision::ImproveAndRetry { context } => {
                assert_eq!(context.error_category, "element_not_found");
                assert_eq!(context.failed_step_index, Some(1));
                assert!(context.failure_message.unwrap().contains("not found"));
            }
            other => panic!("expected improve-and-retry, got {other:?}"),
        }

        // Second failure through the same gate must hand off.
        match gate.decide(&session) {
            GateDecision::HandOff { category, .. } => {
                assert_eq!(category, ErrorCategory::ElementNotFound);
            }
            other => panic!("expected hand-off, got {other:?}"),
        }
    }

    #[test]
    fn test_authentication_never_retries() {
        let session = halted_session("login failed: wrong password", SessionStatus::Failed);
        match ImprovementGate::new().decide(&session) {
            GateDecision::HandOff {
                category,
                suggestions,
            } => {
                assert_eq!(category, ErrorCategory::AuthenticationRequired);
                assert!(!suggestions.is_empty());
            }
            other => panic!("expected hand-off, got {other:?}"),
        }
    }

    #[test]
    fn test_captcha_outranks_element_not_found() {
        let session = halted_session("captcha not found on page", SessionStatus::Failed);
        assert_eq!(classify_failure(&session), ErrorCategory::CaptchaRequired);
    }

    #[test]
    fn test_loop_blackhole_classifies_as_infinite_loop() {
        let mut session = halted_session("odd error", SessionStatus::BlackholeDetected);
        session.last_blackhole = Some(BlackholeReport {
            is_blackhole: true,
            reason: "infinite loop: same steps repeating".to_string(),
            suggested_action: Some(SuggestedAction::BreakLoop),
            confidence: 0.95,
        });
        assert_eq!(classify_failure(&session), ErrorCategory::InfiniteLoop);
        assert!(!ErrorCategory::InfiniteLoop.is_retryable());
    }

    #[test]
    fn test_non_loop_blackhole_is_cannot_proceed() {
        let mut session = halted_session("odd error", SessionStatus::BlackholeDetected);
        session.last_blackhole = Some(BlackholeReport {
            is_blackhole: true,
            reason: "consecutive failures".to_string(),
            suggested_action: Some(SuggestedAction::PauseForReview),
            confidence: 0.8,
        });
        assert_eq!(classify_failure(&session), ErrorCategory::CannotProceed);
        assert!(ErrorCategory::CannotProceed.is_retryable());
    }

    #[test]
    fn test_unknown_error_is_general() {
        let session = halted_session("something odd", SessionStatus::Failed);
        assert_eq!(classify_failure(&session), ErrorCategory::GeneralDifficulties);
    }
}
