//! crates/draft_assist_core/src/recovery/mod.rs
//!
//! The structured-output recovery engine. Given the full text a model produced
//! when asked for a JSON array of suggestions, it returns the best valid list it
//! can find and never fails: when every repair stage comes up empty, a fixed
//! fallback set is returned instead.
//!
//! Stages run in a fixed order, each a pure function of the input text:
//!
//! 1. [`RecoveryStage::WholeParse`]: strip code fences, extract the array
//!    boundary, then try parsing as-is, after truncation repair, and after
//!    syntax normalization.
//! 2. [`RecoveryStage::ObjectSalvage`]: parse each balanced `{...}` span on its
//!    own, with per-span field extraction for spans that do not parse.
//! 3. [`RecoveryStage::FieldExtraction`]: targeted field patterns over the
//!    whole text.
//! 4. [`RecoveryStage::Fallback`]: the hand-authored set.

mod fallback;
mod repair;
mod salvage;
mod scan;
mod schema;

pub use fallback::fallback_suggestions;
pub use salvage::FieldExtractor;
pub use schema::{cap_at_word_boundary, FieldSpec, SuggestionSchema, IMPROVED_TEXT_MAX_CHARS, SUGGESTION_FIELDS};

use serde::Serialize;
use tracing::debug;

use crate::domain::{Suggestion, MAX_RESULTS_CEILING};
use repair::{normalize_syntax, parse_array, repair_truncation};
use scan::{extract_boundary, strip_code_fences};

/// The stage of the cascade that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStage {
    WholeParse,
    ObjectSalvage,
    FieldExtraction,
    Fallback,
}

impl RecoveryStage {
    pub const CASCADE: [RecoveryStage; 4] = [
        RecoveryStage::WholeParse,
        RecoveryStage::ObjectSalvage,
        RecoveryStage::FieldExtraction,
        RecoveryStage::Fallback,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub suggestions: Vec<Suggestion>,
    pub stage: RecoveryStage,
}

#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    schema: SuggestionSchema,
    extractor: FieldExtractor,
    fallback: Vec<Suggestion>,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self::new(SuggestionSchema::default())
    }
}

impl RecoveryEngine {
    pub fn new(schema: SuggestionSchema) -> Self {
        let extractor = FieldExtractor::new(&schema);
        Self {
            schema,
            extractor,
            fallback: fallback_suggestions(),
        }
    }

    /// Recovers at most `max_results` suggestions from `text`.
    ///
    /// `max_results` is clamped to `1..=MAX_RESULTS_CEILING`, so the result is
    /// never empty.
    pub fn recover(&self, text: &str, max_results: usize) -> Recovered {
        let limit = max_results.clamp(1, MAX_RESULTS_CEILING);
        for stage in RecoveryStage::CASCADE {
            if let Some(mut suggestions) = self.run_stage(stage, text) {
                debug!(?stage, found = suggestions.len(), "Recovered suggestions");
                suggestions.truncate(limit);
                number_missing_ids(&mut suggestions);
                return Recovered { suggestions, stage };
            }
        }
        // The fallback stage always yields; this only guards against an empty fallback set.
        Recovered {
            suggestions: Vec::new(),
            stage: RecoveryStage::Fallback,
        }
    }

    fn run_stage(&self, stage: RecoveryStage, text: &str) -> Option<Vec<Suggestion>> {
        match stage {
            RecoveryStage::WholeParse => whole_parse(text, &self.schema),
            RecoveryStage::ObjectSalvage => {
                salvage::object_salvage(text, &self.schema, &self.extractor)
            }
            RecoveryStage::FieldExtraction => {
                salvage::field_extraction(text, &self.schema, &self.extractor)
            }
            RecoveryStage::Fallback => {
                (!self.fallback.is_empty()).then(|| self.fallback.clone())
            }
        }
    }
}

/// Fence stripping, boundary extraction, truncation repair and syntax
/// normalization, each followed by a parse attempt.
pub fn whole_parse(text: &str, schema: &SuggestionSchema) -> Option<Vec<Suggestion>> {
    let stripped = strip_code_fences(text);
    let boundary = extract_boundary(&stripped)?;

    let collect = |candidate: &str| -> Option<Vec<Suggestion>> {
        let found = schema.collect(parse_array(candidate)?);
        (!found.is_empty()).then_some(found)
    };

    if let Some(found) = collect(&boundary) {
        return Some(found);
    }
    let truncated = repair_truncation(&boundary);
    if let Some(found) = truncated.as_deref().and_then(collect) {
        return Some(found);
    }
    let normalized = normalize_syntax(truncated.as_deref().unwrap_or(&boundary));
    if let Some(found) = collect(&normalized) {
        return Some(found);
    }
    // Normalizing first can expose a truncation the first pass misread.
    let normalized_first = normalize_syntax(&boundary);
    repair_truncation(&normalized_first).and_then(|repaired| collect(&repaired))
}

fn number_missing_ids(suggestions: &mut [Suggestion]) {
    for (index, suggestion) in suggestions.iter_mut().enumerate() {
        if suggestion.id.is_empty() {
            suggestion.id = format!("suggestion-{}", index + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, SuggestionType};
    use proptest::prelude::*;

    fn engine() -> RecoveryEngine {
        RecoveryEngine::default()
    }

    #[test]
    fn well_formed_array_parses_whole() {
        let text = r#"[{"id":"a","type":"technical","category":"Method","priority":"low","suggestion":"Sequence the lifts","improvedText":"Lift A, then B.","reasoning":"Avoids clashes"}]"#;
        let recovered = engine().recover(text, 3);
        assert_eq!(recovered.stage, RecoveryStage::WholeParse);
        let s = &recovered.suggestions[0];
        assert_eq!(s.id, "a");
        assert_eq!(s.kind, SuggestionType::Technical);
        assert_eq!(s.improved_text.as_deref(), Some("Lift A, then B."));
        assert_eq!(s.reasoning_text, "Avoids clashes");
    }

    #[test]
    fn missing_closing_brackets_recover_the_single_object() {
        let text = "[{\"id\":\"1\",\"type\":\"safety\",\"priority\":\"high\",\"suggestion\":\"Add fire watch\"}";
        let recovered = engine().recover(text, 5);
        assert_eq!(recovered.suggestions.len(), 1);
        assert_eq!(recovered.suggestions[0].suggestion_text, "Add fire watch");
        assert_eq!(recovered.suggestions[0].priority, Priority::High);
        assert_eq!(recovered.suggestions[0].kind, SuggestionType::Safety);
    }

    #[test]
    fn fenced_output_is_unwrapped() {
        let text = "```json\n[{\"id\":\"1\",\"suggestion\":\"x\"}]\n```";
        let recovered = engine().recover(text, 3);
        assert_eq!(recovered.stage, RecoveryStage::WholeParse);
        assert_eq!(recovered.suggestions.len(), 1);
        assert_eq!(recovered.suggestions[0].suggestion_text, "x");
    }

    #[test]
    fn prose_falls_back_to_the_fixed_set() {
        let recovered = engine().recover("not json at all", 5);
        assert_eq!(recovered.stage, RecoveryStage::Fallback);
        assert_eq!(recovered.suggestions, fallback_suggestions());

        let recovered = engine().recover("not json at all", 2);
        assert_eq!(recovered.suggestions.len(), 2);
        assert_eq!(recovered.suggestions[0].id, "fallback-1");
    }

    #[test]
    fn long_unclosed_brace_runs_fall_back() {
        for text in ["{".repeat(50_000), "[".repeat(50_000), "[{".repeat(25_000)] {
            let recovered = engine().recover(&text, 3);
            assert_eq!(recovered.stage, RecoveryStage::Fallback);
            assert_eq!(recovered.suggestions.len(), 3);
        }
    }

    #[test]
    fn truncated_third_object_keeps_first_two() {
        let full = r#"[{"id":"1","suggestion":"One"},{"id":"2","suggestion":"Two"},{"id":"3","suggestion":"Three"}]"#;
        let cut = &full[..full.len() - 2];
        assert!(cut.ends_with("\"Three\""));
        let recovered = engine().recover(cut, 5);
        let texts: Vec<_> = recovered
            .suggestions
            .iter()
            .map(|s| s.suggestion_text.as_str())
            .collect();
        assert!(texts.len() >= 2);
        assert_eq!(&texts[..2], &["One", "Two"]);
    }

    #[test]
    fn narration_and_trailing_commas_are_tolerated() {
        let text = "Sure! Here are my suggestions:\n[\n  {\"suggestion\": \"Name the supervisor\",},\n  {\"suggestion\": \"List PPE\",},\n]\nLet me know if you need more.";
        let recovered = engine().recover(text, 5);
        assert_eq!(recovered.stage, RecoveryStage::WholeParse);
        assert_eq!(recovered.suggestions.len(), 2);
        assert_eq!(recovered.suggestions[0].id, "suggestion-1");
        assert_eq!(recovered.suggestions[1].id, "suggestion-2");
    }

    #[test]
    fn unparseable_array_is_salvaged_object_by_object() {
        let text = r#"[{"suggestion":"Keep"} {"suggestion":"Also keep" "priority":"high"}]"#;
        let recovered = engine().recover(text, 5);
        assert_eq!(recovered.stage, RecoveryStage::ObjectSalvage);
        assert_eq!(recovered.suggestions.len(), 2);
        assert_eq!(recovered.suggestions[1].priority, Priority::High);
    }

    #[test]
    fn results_are_capped_at_max_results() {
        let text = r#"[{"suggestion":"1"},{"suggestion":"2"},{"suggestion":"3"},{"suggestion":"4"}]"#;
        assert_eq!(engine().recover(text, 2).suggestions.len(), 2);
        assert_eq!(engine().recover(text, 0).suggestions.len(), 1);
    }

    #[test]
    fn empty_and_whitespace_inputs_fall_back() {
        for input in ["", "   ", "[]", "{}", "[{\"id\":\"1\"}]", "\u{0}\u{1}\u{fffd}"] {
            let recovered = engine().recover(input, 3);
            assert_eq!(recovered.stage, RecoveryStage::Fallback, "input {:?}", input);
            assert_eq!(recovered.suggestions.len(), 3);
        }
    }

    proptest! {
        #[test]
        fn never_fails_and_never_returns_empty(text in ".{0,300}", max in 1usize..=5) {
            let recovered = engine().recover(&text, max);
            prop_assert!(!recovered.suggestions.is_empty());
            prop_assert!(recovered.suggestions.len() <= max);
            prop_assert!(recovered.suggestions.iter().all(|s| !s.suggestion_text.trim().is_empty()));
        }

        #[test]
        fn never_fails_on_json_shaped_noise(text in r#"[\[\]{}",:a-z\\ ]{0,120}"#, max in 1usize..=5) {
            let recovered = engine().recover(&text, max);
            prop_assert!(!recovered.suggestions.is_empty());
            prop_assert!(recovered.suggestions.len() <= max);
        }
    }
}
