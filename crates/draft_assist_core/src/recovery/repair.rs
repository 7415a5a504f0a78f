//! Text-level repairs applied to a boundary-extracted payload before parsing.

use serde_json::Value;

use super::scan::scan_structure;

/// Parses `text` as a JSON array. A lone object is accepted as a one-element array.
pub(crate) fn parse_array(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(items),
        object @ Value::Object(_) => Some(vec![object]),
        _ => None,
    }
}

/// Repairs a payload whose opening brackets outnumber its closing ones.
///
/// Keeps everything up to the last object that closed directly inside the root
/// array and drops the incomplete tail. When no such object exists, closes the
/// open string (if any) and appends the missing closers. Returns `None` when
/// the payload is already balanced.
pub(crate) fn repair_truncation(text: &str) -> Option<String> {
    let structure = scan_structure(text);
    if structure.is_balanced() {
        return None;
    }

    if let Some(end) = structure.last_complete_object {
        let mut repaired = text[..=end].to_string();
        repaired.push(']');
        return Some(repaired);
    }

    let mut repaired = if structure.in_string {
        let mut open = text.to_string();
        open.push('"');
        open
    } else {
        text.trim_end().to_string()
    };
    if repaired.ends_with(':') {
        repaired.push_str("null");
    }
    for opener in structure.open.iter().rev() {
        repaired.push(if *opener == '[' { ']' } else { '}' });
    }
    Some(repaired)
}

/// Fixes the syntax slips models make most often:
/// - trailing commas before `}` or `]`
/// - literal line breaks and control characters inside string values
/// - a string left open at the end of a line that is followed by structure
pub(crate) fn normalize_syntax(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (index, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
            } else if ch == '\\' {
                escaped = true;
                out.push(ch);
            } else if ch == '"' {
                in_string = false;
                out.push(ch);
            } else if ch == '\n' || ch == '\r' {
                match next_significant(&chars, index + 1) {
                    Some((_, '}')) | Some((_, ']')) => {
                        out.push('"');
                        in_string = false;
                    }
                    Some((at, '"')) if starts_key(&chars, at) => {
                        out.push_str("\",");
                        in_string = false;
                    }
                    _ => out.push(' '),
                }
            } else if ch.is_control() {
                out.push(' ');
            } else {
                out.push(ch);
            }
        } else {
            match ch {
                '"' => {
                    in_string = true;
                    out.push(ch);
                }
                ',' if matches!(next_significant(&chars, index + 1), Some((_, '}')) | Some((_, ']'))) => {}
                _ => out.push(ch),
            }
        }
    }
    out
}

fn next_significant(chars: &[char], from: usize) -> Option<(usize, char)> {
    chars
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, c)| (i, *c))
}

/// Whether a `"key":` pattern begins at `at`.
fn starts_key(chars: &[char], at: usize) -> bool {
    let Some(close) = chars
        .iter()
        .enumerate()
        .skip(at + 1)
        .find(|(_, c)| **c == '"' || **c == '\n')
        .map(|(i, _)| i)
    else {
        return false;
    };
    chars[close] == '"' && matches!(next_significant(chars, close + 1), Some((_, ':')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_tail_is_discarded_at_last_complete_object() {
        let text = r#"[{"suggestion":"a"},{"suggestion":"b"},{"suggestion":"c""#;
        let repaired = repair_truncation(text).unwrap();
        assert_eq!(repaired, r#"[{"suggestion":"a"},{"suggestion":"b"}]"#);
        assert_eq!(parse_array(&repaired).unwrap().len(), 2);
    }

    #[test]
    fn missing_closers_are_appended_when_no_object_completed() {
        let repaired = repair_truncation(r#"[{"id":"1","suggestion":"Add fire wa"#).unwrap();
        assert_eq!(repaired, r#"[{"id":"1","suggestion":"Add fire wa"}]"#);

        let repaired = repair_truncation(r#"[{"id":"1","suggestion":"#).unwrap();
        assert_eq!(repaired, r#"[{"id":"1","suggestion":null}]"#);
    }

    #[test]
    fn balanced_payloads_are_left_alone() {
        assert_eq!(repair_truncation(r#"[{"a":"]"}]"#), None);
    }

    #[test]
    fn trailing_commas_are_removed_outside_strings() {
        let text = "[{\"suggestion\":\"keep, }\",}, ]";
        assert_eq!(normalize_syntax(text), "[{\"suggestion\":\"keep, }\"} ]");
    }

    #[test]
    fn newlines_inside_strings_become_spaces() {
        let text = "[{\"suggestion\":\"line one\nline two\"}]";
        let normalized = normalize_syntax(text);
        assert_eq!(normalized, "[{\"suggestion\":\"line one line two\"}]");
        assert!(parse_array(&normalized).is_some());
    }

    #[test]
    fn dangling_strings_are_closed_before_structure() {
        let text = "[{\"suggestion\":\"Add barriers\n}, {\"suggestion\":\"Name a lead\n  \"priority\":\"high\"}]";
        let normalized = normalize_syntax(text);
        let items = parse_array(&normalized).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["suggestion"], "Add barriers");
        assert_eq!(items[1]["priority"], "high");
    }
}
