//! Success classification of raw actuator output.
//!
//! Each action category maps to a closed classification rule; the rules
//! themselves are keyword tests over the lowercased result text.

use portalpilot_plan::ActionCategory;

const SUCCESS_KEYWORDS: &[&str] = &["success", "completed", "done", "submitted", "processed"];
const FAILURE_KEYWORDS: &[&str] = &["error", "failed", "unable", "cannot", "invalid", "rejected"];

/// Extra success markers for input steps: the actuator often reports text
/// entry without a generic success word.
const INPUT_SUCCESS_KEYWORDS: &[&str] = &["entered", "filled"];

/// How a category's result text is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    /// The call returning at all is the success condition. Used for
    /// navigation, where reaching a page is the goal.
    AlwaysSucceeds,
    /// Keyword-based: explicit success markers win, explicit failure
    /// markers lose, otherwise any non-empty text passes.
    Keywords {
        extra_success: &'static [&'static str],
    },
}

/// Look up the classification rule for a category.
pub fn rule_for(category: ActionCategory) -> ClassificationRule {
    match category {
        ActionCategory::Navigate => ClassificationRule::AlwaysSucceeds,
        ActionCategory::Input => ClassificationRule::Keywords {
            extra_success: INPUT_SUCCESS_KEYWORDS,
        },
        ActionCategory::Click
        | ActionCategory::Search
        | ActionCategory::Wait
        | ActionCategory::Extract
        | ActionCategory::Scroll
        | ActionCategory::Select
        | ActionCategory::Submit
        | ActionCategory::Verify
        | ActionCategory::General => ClassificationRule::Keywords { extra_success: &[] },
    }
}

/// Classify one result text for the given category.
pub fn is_successful(category: ActionCategory, result_text: &str) -> bool {
    match rule_for(category) {
        ClassificationRule::AlwaysSucceeds => true,
        ClassificationRule::Keywords { extra_success } => {
            let text = result_text.to_lowercase();
            if SUCCESS_KEYWORDS.iter().chain(extra_success).any(|kw| text.contains(kw)) {
                return true;
            }
            if FAILURE_KEYWORDS.iter().any(|kw| text.contains(kw)) {
                return false;
            }
            !text.trim().is_empty()
        }
    }
}
