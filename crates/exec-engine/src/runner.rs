//! Single-step execution with bounded retries.
//!
//! The runner owns the inner retry loop of one step: pre-condition checks,
//! per-attempt timeouts, success classification, instruction mutation on
//! retry, and failure recording into the blackhole detector. It never
//! raises for a failing step; every terminal state is a `StepOutcome`.

use crate::blackhole::{BlackholeDetector, BlackholeReport};
use crate::classify;
use crate::config::EngineConfig;
use crate::mutation;
use crate::report::{StepOutcome, StepStatus};
use portalpilot_actuator::ActuatorSession;
use portalpilot_plan::{PreCondition, PreConditionKind, Step};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Result of running one step, with the blackhole report when detection
/// halted the retry loop.
#[derive(Debug)]
pub struct StepRun {
    pub outcome: StepOutcome,
    pub blackhole: Option<BlackholeReport>,
}

/// Affirmative markers expected in a pre-condition check's result text.
fn pre_condition_markers(kind: &PreConditionKind) -> &'static [&'static str] {
    match kind {
        PreConditionKind::PageLoaded => &["loaded", "ready", "complete"],
        PreConditionKind::ElementVisible => &["visible", "present", "found", "yes"],
        PreConditionKind::Authenticated => &["logged in", "signed in", "authenticated", "yes"],
        PreConditionKind::Custom => &["yes", "true", "ok", "confirmed"],
    }
}

/// Runs single steps to a terminal outcome.
#[derive(Debug, Clone)]
pub struct StepRunner {
    config: EngineConfig,
}

impl StepRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Drive one step through its retry budget.
    ///
    /// Every attempt, success or failure, is recorded into the detector;
    /// a blackhole verdict on a failed attempt ends the loop early even
    /// when budget remains.
    pub async fn run_step(
        &self,
        session: &mut dyn ActuatorSession,
        step: &Step,
        detector: &mut BlackholeDetector,
    ) -> StepRun {
        let started = Instant::now();
        let mut last_error = String::new();

        for attempt in 0..step.max_attempts() {
            if attempt > 0 {
                sleep(self.config.retry_backoff_duration()).await;
            }

            let instruction = if attempt == 0 {
                step.instruction.clone()
            } else {
                mutation::retry_instruction(step, &last_error)
            };

            if let Err(message) = self.check_pre_conditions(session, step).await {
                warn!(step_index = step.index, %message, "critical pre-condition failed");
                last_error = message;
                let report = detector.record_and_check(
                    step.index,
                    &instruction,
                    &last_error,
                    &step.blackhole_thresholds,
                );
                if report.is_blackhole {
                    return self.blackhole_run(step, &last_error, attempt + 1, started, report);
                }
                continue;
            }

            debug!(
                step_index = step.index,
                attempt = attempt + 1,
                category = step.action_category.label(),
                "executing step"
            );

            // Actuator errors and timeouts never reach classification;
            // they are failures regardless of category.
            let attempt_budget = Duration::from_secs(step.timeout_secs);
            let acted = match timeout(attempt_budget, session.act(&instruction)).await {
                Ok(Ok(outcome)) => Ok(outcome.text),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err(format!("step timed out after {}s", step.timeout_secs)),
            };
            let (result_text, succeeded) = match acted {
                Ok(text) => {
                    let ok = classify::is_successful(step.action_category, &text);
                    (text, ok)
                }
                Err(error) => (error, false),
            };

            if succeeded {
                detector.record_attempt(step.index, &instruction, None);
                info!(
                    step_index = step.index,
                    attempts = attempt + 1,
                    "step succeeded"
                );
                return StepRun {
                    outcome: StepOutcome {
                        step_index: step.index,
                        status: StepStatus::Success,
                        result_text,
                        error_message: None,
                        attempt_count: attempt + 1,
                        elapsed_secs: started.elapsed().as_secs_f64(),
                    },
                    blackhole: None,
                };
            }

            last_error = result_text;
            warn!(
                step_index = step.index,
                attempt = attempt + 1,
                error = %last_error,
                "step attempt failed"
            );

            let report = detector.record_and_check(
                step.index,
                &instruction,
                &last_error,
                &step.blackhole_thresholds,
            );
            if report.is_blackhole {
                return self.blackhole_run(step, &last_error, attempt + 1, started, report);
            }
        }

        StepRun {
            outcome: StepOutcome {
                step_index: step.index,
                status: StepStatus::Failed,
                result_text: last_error.clone(),
                error_message: Some(last_error),
                attempt_count: step.max_attempts(),
                elapsed_secs: started.elapsed().as_secs_f64(),
            },
            blackhole: None,
        }
    }

    fn blackhole_run(
        &self,
        step: &Step,
        last_error: &str,
        attempts: u32,
        started: Instant,
        report: BlackholeReport,
    ) -> StepRun {
        StepRun {
            outcome: StepOutcome {
                step_index: step.index,
                status: StepStatus::Blackhole,
                result_text: last_error.to_string(),
                error_message: Some(last_error.to_string()),
                attempt_count: attempts,
                elapsed_secs: started.elapsed().as_secs_f64(),
            },
            blackhole: Some(report),
        }
    }

    /// Evaluate the step's pre-conditions in declaration order.
    ///
    /// Non-critical failures only log; the first critical failure aborts
    /// the attempt with its message.
    async fn check_pre_conditions(
        &self,
        session: &mut dyn ActuatorSession,
        step: &Step,
    ) -> Result<(), String> {
        for pre_condition in &step.pre_conditions {
            let satisfied = self.check_one(session, pre_condition).await;
            if satisfied {
                continue;
            }
            let message = format!(
                "pre-condition not met: {}",
                pre_condition.check_instruction
            );
            if pre_condition.is_critical {
                return Err(message);
            }
            debug!(step_index = step.index, %message, "non-critical pre-condition failed");
        }
        Ok(())
    }

    async fn check_one(
        &self,
        session: &mut dyn ActuatorSession,
        pre_condition: &PreCondition,
    ) -> bool {
        match session.act(&pre_condition.check_instruction).await {
            Ok(outcome) => {
                let text = outcome.text.to_lowercase();
                pre_condition_markers(&pre_condition.kind)
                    .iter()
                    .any(|marker| text.contains(marker))
            }
            Err(_) => false,
        }
    }
}
