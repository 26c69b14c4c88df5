//! Contract of the external plan-generation collaborator.
//!
//! Plan synthesis (LLM prompting, web research, credential extraction) is
//! out of scope for the engine; it only depends on this trait and the
//! request/response shapes defined here.

use crate::types::Plan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structured output of the upstream research phase, passed through to the
/// plan generator verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub target_websites: Vec<String>,
    pub process_steps: Vec<String>,
    pub required_credentials: Vec<String>,
    pub confidence: f64,
    pub summary: String,
}

/// Why the previous plan run failed. Carried into the one re-plan attempt
/// so the generator can route around the failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorFailureContext {
    /// Terminal error category label, e.g. `element_not_found`.
    pub error_category: String,

    /// Suggestions produced by error detection during the failed run.
    pub suggestions: Vec<String>,

    /// Index of the step that failed, when one could be identified.
    pub failed_step_index: Option<u32>,

    /// Error message recorded for the failed step.
    pub failure_message: Option<String>,
}

/// Request handed to the external plan generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub task_description: String,

    pub research: ResearchSummary,

    /// Identifiers the user already supplied (IC number, plate number,
    /// account email). Values are opaque to the engine.
    pub known_identifiers: HashMap<String, String>,

    /// Present only on the single improve-and-retry cycle.
    pub prior_failure: Option<PriorFailureContext>,
}

impl PlanRequest {
    pub fn new(task_description: impl Into<String>) -> Self {
        Self {
            task_description: task_description.into(),
            research: ResearchSummary::default(),
            known_identifiers: HashMap::new(),
            prior_failure: None,
        }
    }

    pub fn with_research(mut self, research: ResearchSummary) -> Self {
        self.research = research;
        self
    }

    pub fn with_identifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.known_identifiers.insert(key.into(), value.into());
        self
    }

    pub fn with_prior_failure(mut self, prior_failure: PriorFailureContext) -> Self {
        self.prior_failure = Some(prior_failure);
        self
    }

    /// Whether this request is the improve-and-retry cycle.
    pub fn is_replan(&self) -> bool {
        self.prior_failure.is_some()
    }
}

/// External collaborator that turns a request into a plan.
///
/// Implementations are expected to be remote (LLM-backed); errors are
/// surfaced as strings because the engine cannot act on their structure
/// beyond reporting them.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, request: &PlanRequest) -> Result<Plan, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = PlanRequest::new("Renew road tax")
            .with_identifier("plate_number", "WXY 1234")
            .with_prior_failure(PriorFailureContext {
                error_category: "element_not_found".to_string(),
                suggestions: vec!["Scroll to the renew button".to_string()],
                failed_step_index: Some(2),
                failure_message: Some("renew button not found".to_string()),
            });

        assert!(request.is_replan());
        assert_eq!(request.known_identifiers["plate_number"], "WXY 1234");
    }

    #[test]
    fn test_fresh_request_is_not_replan() {
        assert!(!PlanRequest::new("Pay summons").is_replan());
    }
}
