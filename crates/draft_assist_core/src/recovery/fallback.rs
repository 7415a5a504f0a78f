//! The hand-authored suggestions returned when nothing could be recovered.

use crate::domain::{Priority, Suggestion, SuggestionType};

pub fn fallback_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion {
            id: "fallback-1".to_string(),
            kind: SuggestionType::Safety,
            category: "Hazard controls".to_string(),
            priority: Priority::High,
            suggestion_text: "State each hazard explicitly and pair it with the control measure that reduces it."
                .to_string(),
            improved_text: None,
            reasoning_text: "Readers act on controls they can trace back to a named hazard."
                .to_string(),
        },
        Suggestion {
            id: "fallback-2".to_string(),
            kind: SuggestionType::Clarity,
            category: "Plain language".to_string(),
            priority: Priority::Medium,
            suggestion_text: "Use short, direct sentences and name who is responsible for each action."
                .to_string(),
            improved_text: None,
            reasoning_text: "Clear ownership avoids steps being skipped on site.".to_string(),
        },
        Suggestion {
            id: "fallback-3".to_string(),
            kind: SuggestionType::Completeness,
            category: "Review details".to_string(),
            priority: Priority::Low,
            suggestion_text: "Add the review date, the approver and the emergency contact for this section."
                .to_string(),
            improved_text: None,
            reasoning_text: "Documents without review details are routinely rejected at audit."
                .to_string(),
        },
    ]
}
