//! Pulls one parseable JSON object out of noisy model text.

/// Removes markdown code fences (```` ```json ```` and bare ```` ``` ````).
fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```JSON", "").replace("```", "")
}

/// Byte ranges of top-level `{...}` spans in scan order.
///
/// Braces inside JSON string literals are ignored, and a stray `}` at depth zero is skipped.
fn balanced_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    spans
}

/// Byte ranges of top-level `{...}` spans counting every brace, strings included.
///
/// Recovers blocks that follow prose with an unmatched quote inside braces, which throws the
/// string-aware scan off for the rest of the text. Depth resets when a `}` would take it
/// below zero.
fn brace_depth_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    spans
}

fn parses(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Returns the first balanced `{...}` block of `text` that parses as JSON.
///
/// Spans from the string-aware scan are tried first, then spans from a plain brace count.
/// Falls back to the whole fence-stripped text when it parses on its own, and to `None` when
/// nothing does. The returned string is a substring of the cleaned text, never re-serialized.
pub fn recover_json_block(text: &str) -> Option<String> {
    let cleaned = strip_fences(text);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let passes: [fn(&str) -> Vec<(usize, usize)>; 2] = [balanced_spans, brace_depth_spans];
    for spans in passes {
        for (start, end) in spans(cleaned) {
            let candidate = &cleaned[start..end];
            if parses(candidate) {
                return Some(candidate.to_owned());
            }
        }
    }

    if parses(cleaned) {
        return Some(cleaned.to_owned());
    }
    tracing::debug!(chars = cleaned.len(), "no parseable JSON block in model text");
    None
}
