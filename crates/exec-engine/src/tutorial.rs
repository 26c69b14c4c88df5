//! Contract of the external tutorial generator.
//!
//! On hand-off the engine asks this collaborator for a step-by-step manual
//! tutorial so the user can finish the task themselves. Like the plan
//! generator it is expected to be remote and LLM-backed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the tutorial generator needs to write manual instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialRequest {
    pub task_description: String,

    /// Identifiers the user already supplied, echoed so the tutorial can
    /// reference them ("enter your plate number WXY 1234").
    pub known_identifiers: HashMap<String, String>,

    /// Terminal error category label of the failed run.
    pub error_category: String,

    /// Recovery suggestions from the classifier.
    pub suggestions: Vec<String>,
}

/// External collaborator producing the manual-completion tutorial.
#[async_trait]
pub trait TutorialGenerator: Send + Sync {
    async fn generate(&self, request: &TutorialRequest) -> Result<String, String>;
}
