//! Plan model for PortalPilot.
//!
//! Provides the typed contract for automation plans (ordered micro-steps
//! with retry, pre-condition, edge-case, and blackhole metadata), the
//! structural validator the engine applies before accepting a plan, and
//! the contract of the external plan-generation collaborator.

pub mod errors;
pub mod generator;
pub mod types;
pub mod validator;

pub use errors::MalformedPlanError;
pub use generator::{PlanGenerator, PlanRequest, PriorFailureContext, ResearchSummary};
pub use types::{
    ActionCategory, BlackholeThresholds, EdgeCase, ExecutionStrategy, Plan, PreCondition,
    PreConditionKind, Step,
};
pub use validator::PlanValidator;
