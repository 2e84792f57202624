//! Recovery of a JSON object from free-form model output
//!
//! Models wrap JSON in code fences, leave trailing commas, and add prose
//! before or after the object even when told not to. Cleaning happens in two
//! phases: the cleaned text is first parsed as-is (`Recovery::Strict`); only if
//! that fails is the outermost balanced object extracted from the noise
//! (`Recovery::Recovered`).

use log::debug;
use serde_json::Value;

use crate::error::PipelineError;

const FENCE: &str = "```";

/// How the JSON text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The cleaned answer was a JSON object as a whole
    Strict,
    /// The object was cut out of surrounding text
    Recovered,
}

/// JSON text ready for schema validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedJson {
    pub text: String,
    pub recovery: Recovery,
}

/// Stateless cleaner for raw model answers
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Isolate the most plausible JSON object in `raw`.
    ///
    /// The returned text is not guaranteed to parse when it had to be recovered
    /// by the first-`{`-to-last-`}` fallback; parsing is the validator's job.
    pub fn clean(&self, raw: &str) -> Result<NormalizedJson, PipelineError> {
        let trimmed = raw.trim();
        let unfenced = strip_fences(trimmed);
        let cleaned = remove_trailing_commas(unfenced);
        let cleaned = cleaned.trim();

        if cleaned.starts_with('{') && serde_json::from_str::<Value>(cleaned).is_ok() {
            return Ok(NormalizedJson {
                text: cleaned.to_string(),
                recovery: Recovery::Strict,
            });
        }

        let text = extract_object(cleaned)
            .ok_or_else(|| PipelineError::normalization("no JSON object found in model response"))?;

        debug!("Recovered JSON object of {} bytes from {} bytes of output", text.len(), raw.len());

        Ok(NormalizedJson {
            text: text.to_string(),
            recovery: Recovery::Recovered,
        })
    }
}

/// Body of the first code fence that opens before the first `{`.
///
/// The closing fence is the last one in the text, so fences quoted inside JSON
/// string values (markdown lesson content) survive.
fn strip_fences(text: &str) -> &str {
    let open = match text.find(FENCE) {
        Some(open) => open,
        None => return text,
    };

    if let Some(brace) = text.find('{') {
        if brace < open {
            return text;
        }
    }

    let after_open = &text[open + FENCE.len()..];
    // drop the language tag line (```json, ```JSON, bare ```)
    let body = match after_open.find('\n') {
        Some(newline) if !after_open[..newline].contains('{') => &after_open[newline + 1..],
        _ => after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    match body.rfind(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Drop commas that directly precede `}` or `]`, ignoring string contents
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// End index (exclusive) of the balanced object starting at `start`
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// First top-level balanced object that parses, else the first top-level
/// balanced one, else first `{` to last `}`.
///
/// Objects nested inside a balanced span are never candidates on their own,
/// and scanning stops at the first `{` that never closes.
fn extract_object(text: &str) -> Option<&str> {
    let mut first_balanced: Option<&str> = None;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        let end = match balanced_end(text, start) {
            Some(end) => end,
            None => break,
        };

        let candidate = &text[start..end];
        if serde_json::from_str::<Value>(candidate).is_ok() {
            return Some(candidate);
        }
        first_balanced.get_or_insert(candidate);
        cursor = end;
    }

    if first_balanced.is_some() {
        return first_balanced;
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
