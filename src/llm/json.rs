//! JSON-from-prose salvage helpers.
//!
//! LLMs asked for JSON routinely wrap it in Markdown fences, prose
//! preambles, or an extra layer of braces. Ported from
//! `cosmos-engine::llm::client`'s candidate-generation pipeline:
//! strip fences, then scan for the first balanced `{...}`/`[...]`, trying
//! each candidate against the target type in order.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

fn push_unique(candidates: &mut Vec<String>, candidate: impl Into<String>) {
    let candidate = candidate.into();
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if !candidates.iter().any(|existing| existing == trimmed) {
        candidates.push(trimmed.to_string());
    }
}

/// Strips a single layer of ```` ``` ```` or ```` ```json ```` fencing, if
/// present.
#[must_use]
pub fn strip_markdown_fences(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let without_open = trimmed.strip_prefix("```")?;
    let after_header = without_open.find('\n').map_or(without_open, |idx| &without_open[idx + 1..]);
    let end_idx = after_header.rfind("```")?;
    Some(after_header[..end_idx].trim().to_string())
}

fn extract_balanced_json_from(content: &str, start: usize) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(content[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_json_candidates(content: &str, max_candidates: usize) -> Vec<String> {
    let mut out = Vec::new();
    for (idx, ch) in content.char_indices() {
        if ch == '{' || ch == '[' {
            if let Some(candidate) = extract_balanced_json_from(content, idx) {
                push_unique(&mut out, candidate);
                if out.len() >= max_candidates {
                    break;
                }
            }
        }
    }
    out
}

/// Attempts to parse `content` as `T`, salvaging JSON from surrounding
/// Markdown fences or prose if the raw content doesn't parse directly.
///
/// # Errors
///
/// Returns [`LlmError::MalformedRequest`] if no candidate parses.
pub fn parse_structured_content<T: DeserializeOwned>(content: &str) -> Result<T, LlmError> {
    let mut candidates = Vec::new();
    push_unique(&mut candidates, content);
    if let Some(stripped) = strip_markdown_fences(content) {
        push_unique(&mut candidates, stripped);
    }

    let mut idx = 0;
    while idx < candidates.len() {
        let current = candidates[idx].clone();
        for extracted in extract_json_candidates(&current, 4) {
            push_unique(&mut candidates, extracted);
        }
        idx += 1;
    }

    let mut last_err = None;
    for candidate in candidates {
        match serde_json::from_str::<T>(&candidate) {
            Ok(data) => return Ok(data),
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(LlmError::MalformedRequest {
        message: format!(
            "could not extract valid JSON from response: {}",
            last_err.unwrap_or_else(|| "unknown parse error".to_string())
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Probe {
        value: String,
    }

    #[test]
    fn parses_raw_json() {
        let parsed: Probe = parse_structured_content(r#"{"value":"ok"}"#).unwrap();
        assert_eq!(parsed.value, "ok");
    }

    #[test]
    fn parses_fenced_json() {
        let content = "```json\n{\"value\":\"ok\"}\n```";
        let parsed: Probe = parse_structured_content(content).unwrap();
        assert_eq!(parsed.value, "ok");
    }

    #[test]
    fn parses_json_with_leading_prose() {
        let content = "Here is the result:\n{\"value\":\"ok\"}\nThanks.";
        let parsed: Probe = parse_structured_content(content).unwrap();
        assert_eq!(parsed.value, "ok");
    }

    #[test]
    fn rejects_unparseable_content() {
        let result = parse_structured_content::<Probe>("not json at all");
        assert!(result.is_err());
    }
}
