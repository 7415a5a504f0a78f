//! crates/draft_assist_core/src/prompt.rs
//!
//! Builds the prompts handed to the chunk source.

use crate::domain::{GenerationRequest, NewDocument};
use crate::recovery::SUGGESTION_FIELDS;

/// Asks for a bare JSON array of suggestion objects using the canonical field names.
pub fn suggestion_prompt(request: &GenerationRequest) -> String {
    let fields = SUGGESTION_FIELDS
        .iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You review {kind} documents through a {context} lens.\n\
         Suggest at most {max} improvements to the \"{section}\" section below.\n\
         Reply with a JSON array only. Each element is an object with the keys {fields}. \
         \"type\" is one of safety, compliance, clarity, completeness, technical, professional, general; \
         \"priority\" is one of high, medium, low; \"improvedText\" is at most 500 characters.\n\n\
         SECTION TEXT:\n{content}",
        kind = request.document_kind.as_str().replace('_', " "),
        context = request.context,
        max = request.max_results,
        section = request.section,
        fields = fields,
        content = request.content,
    )
}

/// Asks for the full text of a new document from the caller's inputs.
pub fn document_prompt(draft: &NewDocument) -> String {
    let inputs = serde_json::to_string_pretty(&draft.inputs).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Write a complete {sub} document in the {category} category.\n\
         Use clear headings and plain language, and cover every detail given below.\n\n\
         INPUTS:\n{inputs}",
        sub = draft.sub_category.replace('_', " "),
        category = draft.category.replace('_', " "),
        inputs = inputs,
    )
}
