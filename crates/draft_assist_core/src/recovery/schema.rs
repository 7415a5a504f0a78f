//! The declarative shape a recovered suggestion object must have.

use serde_json::{Map, Value};

use crate::domain::{Priority, Suggestion, SuggestionType};

/// Ceiling on `improvedText`, in characters.
pub const IMPROVED_TEXT_MAX_CHARS: usize = 500;

/// One canonical field and the keys models have been seen to use for it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

pub const SUGGESTION_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "id", aliases: &["id"], required: false },
    FieldSpec { name: "type", aliases: &["type", "dimension"], required: false },
    FieldSpec { name: "category", aliases: &["category"], required: false },
    FieldSpec { name: "priority", aliases: &["priority", "severity"], required: false },
    FieldSpec {
        name: "suggestion",
        aliases: &["suggestion", "suggestionText", "text"],
        required: true,
    },
    FieldSpec {
        name: "improvedText",
        aliases: &["improvedText", "improved_text", "improvedVersion"],
        required: false,
    },
    FieldSpec {
        name: "reasoning",
        aliases: &["reasoning", "reason", "rationale"],
        required: false,
    },
];

/// Key under which some models nest the array, e.g. `{"suggestions": [...]}`.
const ENVELOPE_KEY: &str = "suggestions";

#[derive(Debug, Clone)]
pub struct SuggestionSchema {
    fields: &'static [FieldSpec],
    improved_text_max_chars: usize,
}

impl Default for SuggestionSchema {
    fn default() -> Self {
        Self {
            fields: SUGGESTION_FIELDS,
            improved_text_max_chars: IMPROVED_TEXT_MAX_CHARS,
        }
    }
}

impl SuggestionSchema {
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First non-empty scalar found under any alias of `name`.
    fn value_of(&self, object: &Map<String, Value>, name: &str) -> Option<String> {
        let spec = self.spec(name)?;
        spec.aliases
            .iter()
            .filter_map(|alias| object.get(*alias))
            .find_map(scalar_text)
    }

    /// Coerces one object into the canonical suggestion shape. Returns `None` when
    /// a required field is missing or empty. A missing id is left empty for the
    /// engine to number.
    pub fn normalize(&self, value: &Value) -> Option<Suggestion> {
        let object = value.as_object()?;
        for spec in self.fields.iter().filter(|f| f.required) {
            self.value_of(object, spec.name)?;
        }

        let suggestion_text = self.value_of(object, "suggestion")?;
        let kind = self
            .value_of(object, "type")
            .map(|raw| SuggestionType::parse_loose(&raw))
            .unwrap_or_default();
        let category = self
            .value_of(object, "category")
            .unwrap_or_else(|| kind.label().to_string());
        let priority = self
            .value_of(object, "priority")
            .map(|raw| Priority::parse_loose(&raw))
            .unwrap_or_default();
        let improved_text = self
            .value_of(object, "improvedText")
            .map(|text| cap_at_word_boundary(&text, self.improved_text_max_chars));

        Some(Suggestion {
            id: self.value_of(object, "id").unwrap_or_default(),
            kind,
            category,
            priority,
            suggestion_text,
            improved_text,
            reasoning_text: self.value_of(object, "reasoning").unwrap_or_default(),
        })
    }

    /// Normalizes every object in `items`, unwrapping `{"suggestions": [...]}`
    /// envelopes and dropping anything that fails the schema.
    pub fn collect(&self, items: Vec<Value>) -> Vec<Suggestion> {
        let mut out = Vec::new();
        for item in items {
            match item {
                Value::Object(mut object)
                    if self.value_of(&object, "suggestion").is_none()
                        && object.get(ENVELOPE_KEY).is_some_and(Value::is_array) =>
                {
                    if let Some(Value::Array(inner)) = object.remove(ENVELOPE_KEY) {
                        out.extend(inner.iter().filter_map(|v| self.normalize(v)));
                    }
                }
                other => out.extend(self.normalize(&other)),
            }
        }
        out
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Caps `text` at `max_chars` characters, cutting at the last word boundary
/// when one exists in the second half of the allowed range.
pub fn cap_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    let prefix = &text[..cut];
    let min_keep = prefix
        .char_indices()
        .nth(max_chars / 2)
        .map(|(index, _)| index)
        .unwrap_or(0);
    match prefix.rfind(char::is_whitespace) {
        Some(boundary) if boundary >= min_keep => prefix[..boundary].trim_end().to_string(),
        _ => prefix.to_string(),
    }
}
