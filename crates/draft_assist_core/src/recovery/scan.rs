//! String-aware scanning over JSON-like model output.
//!
//! Every bracket count in the recovery engine goes through [`StringState`] so
//! that brackets inside string literals (and escaped quotes) are never counted.

use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("code fence pattern is valid"));

/// Tracks whether a left-to-right cursor sits inside a string literal.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Feeds one character. Returns `true` when the character is structural,
    /// i.e. outside any string literal and not a quote.
    pub(crate) fn feed(&mut self, ch: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            false
        } else if ch == '"' {
            self.in_string = true;
            false
        } else {
            true
        }
    }

    pub(crate) fn in_string(&self) -> bool {
        self.in_string
    }
}

/// Removes markdown code fence markers and surrounding whitespace.
pub(crate) fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// A bracket-delimited slice of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span<'a> {
    pub text: &'a str,
    pub complete: bool,
}

/// Returns the balanced span starting at byte `start`, which must hold `[` or `{`.
/// When the input ends before the span closes, the rest of the input is returned
/// with `complete == false`.
pub(crate) fn balanced_span(text: &str, start: usize) -> Span<'_> {
    let mut state = StringState::default();
    let mut depth: usize = 0;
    for (offset, ch) in text[start..].char_indices() {
        if !state.feed(ch) {
            continue;
        }
        match ch {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset;
                    return Span {
                        text: &text[start..=end],
                        complete: true,
                    };
                }
            }
            _ => {}
        }
    }
    Span {
        text: &text[start..],
        complete: false,
    }
}

/// Locates the JSON payload in `text`: the first array, or failing that the
/// first object, which is wrapped into a one-element array.
pub(crate) fn extract_boundary(text: &str) -> Option<String> {
    let array_at = text.find('[');
    let object_at = text.find('{');
    match (array_at, object_at) {
        (Some(a), o) if o.map_or(true, |o| a < o) => Some(balanced_span(text, a).text.to_string()),
        (_, Some(o)) => {
            let span = balanced_span(text, o);
            if span.complete {
                Some(format!("[{}]", span.text))
            } else {
                // Left open so truncation repair closes the object and the array together.
                Some(format!("[{}", span.text))
            }
        }
        _ => None,
    }
}

/// The open structure left at the end of a scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Structure {
    /// Unclosed `[` / `{` in opening order.
    pub open: Vec<char>,
    /// The input ended inside a string literal.
    pub in_string: bool,
    /// Byte index of the `}` that closed the last object sitting directly
    /// inside the root array.
    pub last_complete_object: Option<usize>,
}

impl Structure {
    pub(crate) fn is_balanced(&self) -> bool {
        self.open.is_empty() && !self.in_string
    }
}

/// Scans `text` with a string-aware delimiter stack.
pub(crate) fn scan_structure(text: &str) -> Structure {
    let mut state = StringState::default();
    let mut open: Vec<char> = Vec::new();
    let mut last_complete_object = None;
    let root_is_array = text.trim_start().starts_with('[');

    for (index, ch) in text.char_indices() {
        if !state.feed(ch) {
            continue;
        }
        match ch {
            '[' | '{' => open.push(ch),
            ']' => {
                if open.last() == Some(&'[') {
                    open.pop();
                }
            }
            '}' => {
                if open.last() == Some(&'{') {
                    open.pop();
                    if root_is_array && open.len() == 1 {
                        last_complete_object = Some(index);
                    }
                }
            }
            _ => {}
        }
    }

    Structure {
        open,
        in_string: state.in_string(),
        last_complete_object,
    }
}

/// Splits `text` into top-level `{...}` spans using string-aware brace counting.
/// A trailing object that never closes is returned as an incomplete span.
pub(crate) fn object_spans(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut state = StringState::default();
    let mut depth: usize = 0;
    let mut start = 0;

    for (index, ch) in text.char_indices() {
        if !state.feed(ch) {
            continue;
        }
        match ch {
            '{' => {
                if depth == 0 {
                    start = index;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(Span {
                        text: &text[start..=index],
                        complete: true,
                    });
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        spans.push(Span {
            text: &text[start..],
            complete: false,
        });
    }
    spans
}
