//! Core plan types: plans, steps, and their recovery metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What kind of browser interaction a step performs.
///
/// Closed set: the engine special-cases success classification per
/// category, so new categories require a matching classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Navigate,
    Click,
    Input,
    Search,
    Wait,
    Extract,
    Scroll,
    Select,
    Submit,
    Verify,
    General,
}

impl ActionCategory {
    /// Human-readable label used in log lines and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ActionCategory::Navigate => "navigate",
            ActionCategory::Click => "click",
            ActionCategory::Input => "input",
            ActionCategory::Search => "search",
            ActionCategory::Wait => "wait",
            ActionCategory::Extract => "extract",
            ActionCategory::Scroll => "scroll",
            ActionCategory::Select => "select",
            ActionCategory::Submit => "submit",
            ActionCategory::Verify => "verify",
            ActionCategory::General => "general",
        }
    }
}

/// How the steps of a plan are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Steps run strictly in order. Currently the only strategy.
    #[default]
    Sequential,
}

/// Kind of check a pre-condition performs before a step runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreConditionKind {
    /// The target page finished loading.
    PageLoaded,
    /// A specific element is present and visible.
    ElementVisible,
    /// The user is signed in to the portal.
    Authenticated,
    /// Free-form check; the raw result text decides.
    Custom,
}

/// A check the engine runs against the actuator before executing a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCondition {
    pub kind: PreConditionKind,

    /// Natural-language instruction sent to the actuator for the check.
    pub check_instruction: String,

    /// Critical pre-conditions abort the attempt when they fail;
    /// non-critical ones only log.
    pub is_critical: bool,
}

impl PreCondition {
    pub fn new(kind: PreConditionKind, check_instruction: impl Into<String>) -> Self {
        Self {
            kind,
            check_instruction: check_instruction.into(),
            is_critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }
}

/// A known failure mode of a step and the instruction that recovers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCase {
    /// Condition text matched against the previous error message,
    /// either verbatim or through the engine's condition keyword map
    /// (e.g. `element_not_found`).
    pub trigger_condition: String,

    /// Appended to the step instruction on retry when triggered.
    pub recovery_instruction: String,

    /// Planner confidence that this edge case applies, 0.0..=1.0.
    pub confidence: f64,
}

impl EdgeCase {
    pub fn new(
        trigger_condition: impl Into<String>,
        recovery_instruction: impl Into<String>,
    ) -> Self {
        Self {
            trigger_condition: trigger_condition.into(),
            recovery_instruction: recovery_instruction.into(),
            confidence: 0.5,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Per-step thresholds consulted by the blackhole detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackholeThresholds {
    /// Run of trailing failed attempts that trips detection.
    pub max_consecutive_failures: u32,

    /// Count of similar recurring errors in the window that trips
    /// detection.
    pub max_similar_errors: u32,

    /// Wall-clock budget for the step, informational for monitors.
    pub timeout_secs: u64,

    /// Extra keywords monitors watch for in actuator output.
    pub monitoring_keywords: Vec<String>,
}

impl Default for BlackholeThresholds {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            max_similar_errors: 5,
            timeout_secs: 60,
            monitoring_keywords: Vec::new(),
        }
    }
}

/// One declarative micro-step of an automation plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position in the plan. Unique and dense.
    pub index: u32,

    pub action_category: ActionCategory,

    /// Natural-language instruction sent to the actuator.
    pub instruction: String,

    /// Hint describing the element the instruction targets.
    #[serde(default)]
    pub target_element_hint: Option<String>,

    /// Free text used when classifying the actuator's result.
    #[serde(default)]
    pub validation_criteria: Option<String>,

    /// Per-attempt timeout.
    pub timeout_secs: u64,

    /// Retries allowed after the first attempt. A budget of 2 permits
    /// 3 attempts in total.
    pub retry_budget: u32,

    /// 1 = highest .. 5 = lowest. Informational only.
    pub priority: u8,

    /// Indices of earlier steps this one depends on. Advisory while
    /// execution is strictly sequential.
    #[serde(default)]
    pub dependencies: BTreeSet<u32>,

    #[serde(default)]
    pub pre_conditions: Vec<PreCondition>,

    #[serde(default)]
    pub edge_cases: Vec<EdgeCase>,

    #[serde(default)]
    pub blackhole_thresholds: BlackholeThresholds,
}

impl Step {
    /// Create a step with the documented defaults.
    pub fn new(index: u32, action_category: ActionCategory, instruction: impl Into<String>) -> Self {
        Self {
            index,
            action_category,
            instruction: instruction.into(),
            target_element_hint: None,
            validation_criteria: None,
            timeout_secs: 30,
            retry_budget: 3,
            priority: 3,
            dependencies: BTreeSet::new(),
            pre_conditions: Vec::new(),
            edge_cases: Vec::new(),
            blackhole_thresholds: BlackholeThresholds::default(),
        }
    }

    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_target_hint(mut self, hint: impl Into<String>) -> Self {
        self.target_element_hint = Some(hint.into());
        self
    }

    pub fn with_validation(mut self, criteria: impl Into<String>) -> Self {
        self.validation_criteria = Some(criteria.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_pre_condition(mut self, pre_condition: PreCondition) -> Self {
        self.pre_conditions.push(pre_condition);
        self
    }

    pub fn with_edge_case(mut self, edge_case: EdgeCase) -> Self {
        self.edge_cases.push(edge_case);
        self
    }

    pub fn with_dependency(mut self, index: u32) -> Self {
        self.dependencies.insert(index);
        self
    }

    pub fn with_thresholds(mut self, thresholds: BlackholeThresholds) -> Self {
        self.blackhole_thresholds = thresholds;
        self
    }

    /// Total attempts allowed, including the initial one.
    pub fn max_attempts(&self) -> u32 {
        self.retry_budget + 1
    }
}

/// An immutable automation plan produced by the external plan generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub session_id: String,

    pub task_description: String,

    /// Starting URL of the portal the plan drives.
    pub target_site: String,

    pub steps: Vec<Step>,

    #[serde(default)]
    pub execution_strategy: ExecutionStrategy,

    /// Generator confidence that the plan completes the task, 0.0..=1.0.
    pub confidence: f64,

    /// Generator estimate of the total run time.
    pub estimated_duration_secs: u64,

    pub generated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        session_id: impl Into<String>,
        task_description: impl Into<String>,
        target_site: impl Into<String>,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            task_description: task_description.into(),
            target_site: target_site.into(),
            steps,
            execution_strategy: ExecutionStrategy::Sequential,
            confidence: 0.5,
            estimated_duration_secs: 120,
            generated_at: Utc::now(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_estimated_duration(mut self, secs: u64) -> Self {
        self.estimated_duration_secs = secs;
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Look up a step by its 1-based index.
    pub fn step(&self, index: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults() {
        let step = Step::new(1, ActionCategory::Click, "Click the login button");
        assert_eq!(step.retry_budget, 3);
        assert_eq!(step.max_attempts(), 4);
        assert_eq!(step.priority, 3);
        assert!(step.pre_conditions.is_empty());
    }

    #[test]
    fn test_step_builder() {
        let step = Step::new(2, ActionCategory::Input, "Type the IC number")
            .with_retry_budget(1)
            .with_target_hint("IC number field")
            .with_pre_condition(
                PreCondition::new(PreConditionKind::PageLoaded, "Is the form visible?").critical(),
            )
            .with_edge_case(EdgeCase::new("element_not_found", "Scroll down to the form"))
            .with_dependency(1);

        assert_eq!(step.max_attempts(), 2);
        assert!(step.pre_conditions[0].is_critical);
        assert_eq!(step.edge_cases.len(), 1);
        assert!(step.dependencies.contains(&1));
    }

    #[test]
    fn test_plan_lookup() {
        let plan = Plan::new(
            "session_20260101000000",
            "Renew road tax",
            "https://portal.example.com",
            vec![
                Step::new(1, ActionCategory::Navigate, "Open the portal"),
                Step::new(2, ActionCategory::Click, "Click renew"),
            ],
        );

        assert_eq!(plan.step_count(), 2);
        assert_eq!(plan.step(2).unwrap().action_category, ActionCategory::Click);
        assert!(plan.step(3).is_none());
    }

    #[test]
    fn test_category_serde_snake_case() {
        let json = serde_json::to_string(&ActionCategory::Navigate).unwrap();
        assert_eq!(json, "\"navigate\"");
        let back: ActionCategory = serde_json::from_str("\"submit\"").unwrap();
        assert_eq!(back, ActionCategory::Submit);
    }
}
