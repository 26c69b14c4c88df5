//! Top-level automation pipeline.
//!
//! `AutomationEngine` wires the external collaborators together: it asks
//! the plan generator for a plan, validates it, drives it step by step
//! against a fresh browser session, and routes the halted session through
//! the improvement gate. A retryable failure earns exactly one improved
//! plan; everything else ends in a success report or a hand-off with a
//! manual tutorial.

use crate::blackhole::BlackholeDetector;
use crate::classifier::{classify_failure, ErrorCategory, GateDecision, ImprovementGate};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::limiter::RateLimiter;
use crate::report::{AutomationReport, RunStatus};
use crate::runner::StepRunner;
use crate::session::{generate_session_id, Session, SessionStatus, SessionStore};
use crate::tutorial::{TutorialGenerator, TutorialRequest};
use portalpilot_actuator::{Actuator, ActuatorSession};
use portalpilot_plan::{Plan, PlanGenerator, PlanRequest, PlanValidator};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How one session's step loop ended.
enum LoopEnd {
    /// The session reached a terminal status on its own.
    Halted,
    /// The browser session could not be opened; no step ran.
    OpenFailed(String),
    /// The pause token was cancelled between steps.
    Paused,
    /// The overall wall-clock budget ran out.
    TimedOut,
}

/// Drives automation plans to a terminal report.
pub struct AutomationEngine {
    actuator: Arc<dyn Actuator>,
    plan_generator: Arc<dyn PlanGenerator>,
    tutorial_generator: Arc<dyn TutorialGenerator>,
    validator: PlanValidator,
    config: EngineConfig,
    limiter: Arc<RateLimiter>,
    store: SessionStore,
}

impl AutomationEngine {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        plan_generator: Arc<dyn PlanGenerator>,
        tutorial_generator: Arc<dyn TutorialGenerator>,
    ) -> Self {
        Self::with_config(
            actuator,
            plan_generator,
            tutorial_generator,
            EngineConfig::default(),
        )
    }

    pub fn with_config(
        actuator: Arc<dyn Actuator>,
        plan_generator: Arc<dyn PlanGenerator>,
        tutorial_generator: Arc<dyn TutorialGenerator>,
        config: EngineConfig,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.reasoning_min_interval_duration()));
        Self {
            actuator,
            plan_generator,
            tutorial_generator,
            validator: PlanValidator::new(),
            config,
            limiter,
            store: SessionStore::new(),
        }
    }

    /// Shared session registry. All engine clones of this store observe
    /// the same sessions.
    pub fn sessions(&self) -> SessionStore {
        self.store.clone()
    }

    /// Run one automation task to a terminal report.
    ///
    /// Cancelling `pause` stops the run at the next step boundary. This
    /// method never returns an error; every failure mode is folded into
    /// the report.
    pub async fn run(&self, request: PlanRequest, pause: CancellationToken) -> AutomationReport {
        let session_id = generate_session_id(&self.config.session_id_prefix);
        info!(%session_id, task = %request.task_description, "starting automation run");

        let plan = match self.generate_validated(&request).await {
            Ok(plan) => plan,
            Err(err) => {
                error!(%session_id, %err, "could not obtain a usable plan");
                return AutomationReport::aborted(session_id, err.to_string());
            }
        };

        let (session, end) = self.execute_plan(&session_id, plan, &pause).await;
        match end {
            // An unopenable browser is terminal on the spot: no step ran,
            // so a re-plan has nothing to improve on.
            LoopEnd::OpenFailed(message) => {
                return AutomationReport::aborted(session.session_id, message)
            }
            LoopEnd::Paused => {
                return self.interrupted_report(&session, "run paused before completion")
            }
            LoopEnd::TimedOut => return self.timeout_hand_off(&request, session).await,
            LoopEnd::Halted => {}
        }

        match ImprovementGate::new().decide(&session) {
            GateDecision::ReportSuccess => AutomationReport::success(session_id, session.outcomes),
            GateDecision::ImproveAndRetry { context } => {
                let replan_request = request.clone().with_prior_failure(context);
                let improved = match self.generate_validated(&replan_request).await {
                    Ok(plan) => plan,
                    Err(err) => {
                        warn!(%session_id, %err, "improved plan unavailable, handing off");
                        let category = classify_failure(&session);
                        return self.hand_off(&request, session, category).await;
                    }
                };

                let retry_id = generate_session_id(&self.config.session_id_prefix);
                info!(%session_id, %retry_id, "executing improved plan");
                let (retry_session, retry_end) =
                    self.execute_plan(&retry_id, improved, &pause).await;
                match retry_end {
                    LoopEnd::OpenFailed(message) => {
                        AutomationReport::aborted(retry_session.session_id, message)
                    }
                    LoopEnd::Paused => {
                        self.interrupted_report(&retry_session, "run paused before completion")
                    }
                    LoopEnd::TimedOut => self.timeout_hand_off(&request, retry_session).await,
                    LoopEnd::Halted => {
                        if retry_session.status == SessionStatus::Completed {
                            AutomationReport::success(retry_id, retry_session.outcomes)
                        } else {
                            // The one improvement is spent; any second
                            // failure hands off.
                            let category = classify_failure(&retry_session);
                            self.hand_off(&request, retry_session, category).await
                        }
                    }
                }
            }
            GateDecision::HandOff { category, .. } => {
                self.hand_off(&request, session, category).await
            }
        }
    }

    /// Ask the generator for a plan and validate it structurally.
    async fn generate_validated(&self, request: &PlanRequest) -> Result<Plan, EngineError> {
        self.limiter.acquire().await;
        let plan = self
            .plan_generator
            .generate(request)
            .await
            .map_err(EngineError::PlanGeneration)?;
        self.validator.validate(&plan)?;
        Ok(plan)
    }

    /// Execute one plan in a fresh browser session.
    ///
    /// The final session state is stored before returning, whatever the
    /// exit path.
    async fn execute_plan(
        &self,
        session_id: &str,
        plan: Plan,
        pause: &CancellationToken,
    ) -> (Session, LoopEnd) {
        let mut session = Session::new(session_id, plan);
        self.store.insert(session.clone()).await;

        let mut browser = match self.actuator.open(&session.plan.target_site).await {
            Ok(browser) => browser,
            Err(err) => {
                error!(%session_id, %err, "could not open browser session");
                session.status = SessionStatus::Failed;
                self.store.insert(session.clone()).await;
                return (session, LoopEnd::OpenFailed(err.to_string()));
            }
        };

        let runner = StepRunner::new(self.config.clone());
        let mut detector = BlackholeDetector::new();

        let budget = self.config.overall_timeout_duration();
        let loop_body = self.step_loop(&mut session, browser.as_mut(), &runner, &mut detector, pause);
        let end = match timeout(budget, loop_body).await {
            Ok(end) => end,
            Err(_) => {
                warn!(%session_id, "overall time budget exhausted");
                LoopEnd::TimedOut
            }
        };

        if let Err(err) = browser.close().await {
            warn!(%session_id, %err, "failed to close browser session");
        }

        self.store.insert(session.clone()).await;
        (session, end)
    }

    async fn step_loop(
        &self,
        session: &mut Session,
        browser: &mut dyn ActuatorSession,
        runner: &StepRunner,
        detector: &mut BlackholeDetector,
        pause: &CancellationToken,
    ) -> LoopEnd {
        while session.status == SessionStatus::Running {
            if pause.is_cancelled() {
                info!(session_id = %session.session_id, "pause requested, stopping");
                return LoopEnd::Paused;
            }

            let Some(step) = session.plan.step(session.current_step_index).cloned() else {
                // Dense validated indices make this unreachable; bail
                // rather than spin.
                session.status = SessionStatus::Completed;
                break;
            };

            let run = runner.run_step(browser, &step, detector).await;
            session.record_outcome(run.outcome, run.blackhole, &self.config);

            if session.status == SessionStatus::Running {
                sleep(self.config.step_delay_duration()).await;
            }
        }
        LoopEnd::Halted
    }

    /// Report for a run stopped from outside (pause or time budget).
    fn interrupted_report(&self, session: &Session, message: &str) -> AutomationReport {
        let status = if session.success_count() > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        };
        AutomationReport {
            status,
            message: message.to_string(),
            session_id: session.session_id.clone(),
            outcomes: session.outcomes.clone(),
            requires_human: true,
            suggestions: Vec::new(),
            tutorial: None,
        }
    }

    /// Hand-off for a run that exhausted its wall-clock budget: no replan,
    /// tutorial attached.
    async fn timeout_hand_off(&self, request: &PlanRequest, session: Session) -> AutomationReport {
        let mut report = self.hand_off(request, session, ErrorCategory::Timeout).await;
        report.message = "run exceeded its overall time budget".to_string();
        report
    }

    /// Terminal hand-off: fetch a manual tutorial for the already-decided
    /// category and build the failure report.
    async fn hand_off(
        &self,
        request: &PlanRequest,
        session: Session,
        category: ErrorCategory,
    ) -> AutomationReport {
        let suggestions = category.suggestions();
        let tutorial = self.fetch_tutorial(request, category, &suggestions).await;

        let status = match session.status {
            SessionStatus::BlackholeDetected => RunStatus::BlackholeDetected,
            SessionStatus::HumanInterventionRequired => RunStatus::HumanInterventionRequired,
            _ if session.success_count() > 0 => RunStatus::Partial,
            _ => RunStatus::Failed,
        };

        let mut report = AutomationReport {
            status,
            message: format!("automation stopped: {}", category.label()),
            session_id: session.session_id.clone(),
            outcomes: session.outcomes,
            requires_human: true,
            suggestions: Vec::new(),
            tutorial: None,
        }
        .with_suggestions(suggestions);
        if let Some(tutorial) = tutorial {
            report = report.with_tutorial(tutorial);
        }
        report
    }

    async fn fetch_tutorial(
        &self,
        request: &PlanRequest,
        category: ErrorCategory,
        suggestions: &[String],
    ) -> Option<String> {
        self.limiter.acquire().await;
        let tutorial_request = TutorialRequest {
            task_description: request.task_description.clone(),
            known_identifiers: request.known_identifiers.clone(),
            error_category: category.label().to_string(),
            suggestions: suggestions.to_vec(),
        };
        match self.tutorial_generator.generate(&tutorial_request).await {
            Ok(tutorial) => Some(tutorial),
            Err(err) => {
                warn!(%err, "tutorial generation failed");
                None
            }
        }
    }
}
