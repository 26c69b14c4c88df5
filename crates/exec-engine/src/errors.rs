//! Engine error types.
//!
//! Step-level failures never surface as errors; they are always converted
//! to `StepOutcome` values by the step runner. Only plan acquisition can
//! raise: a generator failure or a structurally unusable plan. Both are
//! caught once at the top of the engine and turned into a terminal failed
//! report before any browser session opens.

use portalpilot_plan::MalformedPlanError;
use thiserror::Error;

/// Errors raised inside one pipeline run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The external generator returned a structurally unusable plan.
    #[error(transparent)]
    MalformedPlan(#[from] MalformedPlanError),

    /// The external plan generator itself failed.
    #[error("plan generation failed: {0}")]
    PlanGeneration(String),
}
