//! Feedback-informed instruction mutation for retries.
//!
//! When a step attempt fails, the retry does not resend the same text: the
//! previous error is matched against the step's declared edge cases first,
//! then against a small set of generic failure shapes, and the matching
//! recovery guidance is appended to the instruction.

use portalpilot_plan::Step;

/// Symbolic trigger conditions and the error fragments they match.
const CONDITION_KEYWORDS: &[(&str, &[&str])] = &[
    ("element_not_found", &["not found", "missing", "absent"]),
    ("timeout", &["timeout", "timed out"]),
    (
        "authentication",
        &["login", "password", "credential", "unauthorized"],
    ),
];

/// Whether an edge-case trigger condition matches the recorded error.
fn trigger_matches(trigger_condition: &str, error: &str) -> bool {
    let trigger = trigger_condition.to_lowercase();
    if error.contains(&trigger) {
        return true;
    }
    CONDITION_KEYWORDS
        .iter()
        .find(|(name, _)| *name == trigger)
        .map(|(_, keywords)| keywords.iter().any(|kw| error.contains(kw)))
        .unwrap_or(false)
}

/// Build the instruction for a retry attempt, given the last error.
///
/// The first matching edge case wins; with no match the error text itself
/// picks a generic recovery hint.
pub fn retry_instruction(step: &Step, last_error: &str) -> String {
    let error = last_error.to_lowercase();

    for edge_case in &step.edge_cases {
        if trigger_matches(&edge_case.trigger_condition, &error) {
            return format!("{}. {}", step.instruction, edge_case.recovery_instruction);
        }
    }

    let hint = if error.contains("not found") {
        "If the element is not visible, scroll the page and wait for it to appear"
    } else if error.contains("timeout") || error.contains("timed out") {
        "Wait longer for the page to finish loading before acting"
    } else if error.contains("login") || error.contains("password") || error.contains("credential")
    {
        "Check that the credentials were entered correctly before continuing"
    } else {
        "Proceed carefully and verify the page state before acting"
    };
    format!("{}. {}", step.instruction, hint)
}
