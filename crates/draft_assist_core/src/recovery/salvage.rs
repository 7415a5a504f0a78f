//! Per-object salvage for output that cannot be parsed as a whole.

use regex::Regex;
use serde_json::{Map, Value};

use super::repair::{normalize_syntax, parse_array, repair_truncation};
use super::scan::object_spans;
use super::schema::SuggestionSchema;
use crate::domain::Suggestion;

/// How many broken wrapper objects salvage will look inside before handing
/// the span to the field extractor.
pub const MAX_SALVAGE_DEPTH: usize = 32;

/// Pulls individual fields out of text that will not parse, using one pattern
/// per schema alias.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    patterns: Vec<(&'static str, Regex)>,
}

impl FieldExtractor {
    pub fn new(schema: &SuggestionSchema) -> Self {
        let patterns = schema
            .fields()
            .iter()
            .flat_map(|spec| spec.aliases.iter().map(move |alias| (spec.name, *alias)))
            .filter_map(|(name, alias)| {
                // A string value may be unterminated when the output was cut short.
                let pattern = format!(
                    r#""{}"\s*:\s*(?:"((?:[^"\\]|\\.)*)"?|(-?\d+(?:\.\d+)?|true|false))"#,
                    regex::escape(alias)
                );
                Regex::new(&pattern).ok().map(|re| (name, re))
            })
            .collect();
        Self { patterns }
    }

    /// Builds a canonical-keyed object from whatever fields can be found in `text`.
    pub fn extract(&self, text: &str) -> Option<Value> {
        let mut object = Map::new();
        for (name, pattern) in &self.patterns {
            if object.contains_key(*name) {
                continue;
            }
            let Some(captures) = pattern.captures(text) else {
                continue;
            };
            let value = match (captures.get(1), captures.get(2)) {
                (Some(raw), _) => unescape(raw.as_str()),
                (None, Some(literal)) => literal.as_str().to_string(),
                _ => continue,
            };
            if !value.trim().is_empty() {
                object.insert((*name).to_string(), Value::String(value));
            }
        }
        (!object.is_empty()).then_some(Value::Object(object))
    }
}

fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw))
        .unwrap_or_else(|_| raw.replace("\\\"", "\"").replace("\\n", " "))
}

fn parse_span(span: &str) -> Option<Vec<Value>> {
    parse_array(span)
        .or_else(|| parse_array(&normalize_syntax(span)))
        .or_else(|| repair_truncation(span).and_then(|repaired| parse_array(&repaired)))
        .or_else(|| {
            let normalized = normalize_syntax(span);
            repair_truncation(&normalized).and_then(|repaired| parse_array(&repaired))
        })
}

fn salvage_span(
    span: &str,
    depth: usize,
    schema: &SuggestionSchema,
    extractor: &FieldExtractor,
) -> Vec<Suggestion> {
    if let Some(items) = parse_span(span) {
        let found = schema.collect(items);
        if !found.is_empty() {
            return found;
        }
    }

    // A broken wrapper object may still hold intact suggestion objects.
    if depth < MAX_SALVAGE_DEPTH {
        let inner: Vec<Suggestion> = object_spans(&span[1..])
            .into_iter()
            .flat_map(|inner| salvage_span(inner.text, depth + 1, schema, extractor))
            .collect();
        if !inner.is_empty() {
            return inner;
        }
    }

    extractor
        .extract(span)
        .and_then(|value| schema.normalize(&value))
        .into_iter()
        .collect()
}

/// Re-scans the raw text object by object. Spans that parse are normalized
/// directly; spans that do not are passed through the field extractor.
pub fn object_salvage(
    text: &str,
    schema: &SuggestionSchema,
    extractor: &FieldExtractor,
) -> Option<Vec<Suggestion>> {
    let found: Vec<Suggestion> = object_spans(text)
        .into_iter()
        .flat_map(|span| salvage_span(span.text, 0, schema, extractor))
        .collect();
    (!found.is_empty()).then_some(found)
}

/// Last structured attempt: runs the field extractor over every `{`-delimited
/// chunk of the text, for output whose braces are too broken to bound objects.
pub fn field_extraction(
    text: &str,
    schema: &SuggestionSchema,
    extractor: &FieldExtractor,
) -> Option<Vec<Suggestion>> {
    let found: Vec<Suggestion> = text
        .split('{')
        .filter_map(|chunk| extractor.extract(chunk))
        .filter_map(|value| schema.normalize(&value))
        .collect();
    (!found.is_empty()).then_some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, SuggestionType};

    fn tools() -> (SuggestionSchema, FieldExtractor) {
        let schema = SuggestionSchema::default();
        let extractor = FieldExtractor::new(&schema);
        (schema, extractor)
    }

    #[test]
    fn extractor_pulls_known_fields() {
        let (_, extractor) = tools();
        let value = extractor
            .extract(r#"{"id": 3, "type":"safety", "priority":"high", "suggestion":"Add a \"fire\" watch", broken"#)
            .unwrap();
        assert_eq!(value["id"], "3");
        assert_eq!(value["type"], "safety");
        assert_eq!(value["suggestion"], "Add a \"fire\" watch");
    }

    #[test]
    fn extractor_accepts_unterminated_suggestion() {
        let (_, extractor) = tools();
        let value = extractor.extract(r#"{"suggestion":"Check the harness"#).unwrap();
        assert_eq!(value["suggestion"], "Check the harness");
    }

    #[test]
    fn salvage_keeps_good_spans_and_extracts_broken_ones() {
        let (schema, extractor) = tools();
        let text = r#"[{"id":"1","suggestion":"First"}, {"id":"2" "suggestion":"Second" "priority":"low"}, {"id":"3"}]"#;
        let found = object_salvage(text, &schema, &extractor).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].suggestion_text, "First");
        assert_eq!(found[1].suggestion_text, "Second");
        assert_eq!(found[1].priority, Priority::Low);
    }

    #[test]
    fn salvage_reaches_into_broken_wrappers() {
        let (schema, extractor) = tools();
        let text = r#"{"suggestions": [{"type":"clarity","suggestion":"A"}, {"suggestion":"B"} oops}"#;
        let found = object_salvage(text, &schema, &extractor).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, SuggestionType::Clarity);
    }

    #[test]
    fn unclosed_brace_runs_stop_at_the_depth_limit() {
        let (schema, extractor) = tools();
        let text = "{".repeat(50_000);
        assert!(object_salvage(&text, &schema, &extractor).is_none());

        let nested = format!("{}{}", "{\"x\": ".repeat(40), r#"{"suggestion":"Deep""#);
        let found = object_salvage(&nested, &schema, &extractor).unwrap();
        assert_eq!(found[0].suggestion_text, "Deep");
    }

    #[test]
    fn field_extraction_works_without_balanced_braces() {
        let (schema, extractor) = tools();
        let text = r#"{"suggestion":"One" {"suggestion":"Two"#;
        let found = field_extraction(text, &schema, &extractor).unwrap();
        assert_eq!(found.len(), 2);
        assert!(field_extraction("plain prose", &schema, &extractor).is_none());
    }
}
