//! Structural plan validation.
//!
//! A plan is accepted only when every step carries a non-empty instruction,
//! indices are dense and 1-based, and dependencies point strictly backwards.
//! Semantic quality (whether the instructions actually accomplish the task)
//! is the plan generator's problem, not the validator's.

use crate::errors::MalformedPlanError;
use crate::types::Plan;
use tracing::debug;

/// Validates plans before the engine accepts them.
#[derive(Debug, Clone, Default)]
pub struct PlanValidator;

impl PlanValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check the plan's structure, failing on the first problem found.
    pub fn validate(&self, plan: &Plan) -> Result<(), MalformedPlanError> {
        debug!(session_id = %plan.session_id, steps = plan.steps.len(), "validating plan");

        if plan.target_site.trim().is_empty() {
            return Err(MalformedPlanError::MissingTargetSite);
        }

        if plan.steps.is_empty() {
            return Err(MalformedPlanError::Empty);
        }

        for (position, step) in plan.steps.iter().enumerate() {
            let expected = position as u32 + 1;
            if step.index != expected {
                return Err(MalformedPlanError::NonDenseIndex {
                    expected,
                    found: step.index,
                });
            }

            if step.instruction.trim().is_empty() {
                return Err(MalformedPlanError::EmptyInstruction { index: step.index });
            }

            if !(1..=5).contains(&step.priority) {
                return Err(MalformedPlanError::InvalidPriority {
                    index: step.index,
                    priority: step.priority,
                });
            }

            for dependency in &step.dependencies {
                if *dependency >= step.index {
                    return Err(MalformedPlanError::ForwardDependency {
                        index: step.index,
                        dependency: *dependency,
                    });
                }
            }

            for pre_condition in &step.pre_conditions {
                if pre_condition.check_instruction.trim().is_empty() {
                    return Err(MalformedPlanError::EmptyPreCondition { index: step.index });
                }
            }
        }

        debug!(session_id = %plan.session_id, "plan validation passed");
        Ok(())
    }
}
