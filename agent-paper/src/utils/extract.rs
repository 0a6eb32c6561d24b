//! Payload extraction from agent responses

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

const PREVIEW_CHARS: usize = 500;

/// Extract the body of a fenced code block, falling back to the raw text
///
/// Handles:
/// - ```<lang> blocks
/// - Generic ``` blocks
/// - Raw text (trimmed)
///
/// The block ends at the last fence in the text, so nested fences inside the
/// payload survive.
pub fn extract_fenced(text: &str, lang: &str) -> String {
    let tagged = format!("```{}", lang);

    let body_start = if !lang.is_empty() && text.contains(&tagged) {
        text.find(&tagged).map(|pos| pos + tagged.len())
    } else {
        text.find("```").map(|pos| {
            // Skip an unknown language tag on the opening fence
            let after = pos + 3;
            text[after..]
                .find('\n')
                .map(|nl| after + nl + 1)
                .unwrap_or(after)
        })
    };

    let Some(start) = body_start else {
        return text.trim().to_string();
    };

    let end = text[start..]
        .rfind("```")
        .map(|pos| pos + start)
        .unwrap_or(text.len());

    text[start..end].trim().to_string()
}

/// Extract a JSON object or array from an agent response
///
/// Prefers a ```json block; otherwise takes the span from the first `{`/`[`
/// to the last matching closer.
pub fn extract_json(text: &str) -> String {
    let fenced = extract_fenced(text, "json");
    if fenced.starts_with('{') || fenced.starts_with('[') {
        return fenced;
    }

    let open = text.find(|c| c == '{' || c == '[');
    let Some(open) = open else {
        return fenced;
    };
    let closer = if text[open..].starts_with('{') { '}' } else { ']' };

    match text.rfind(closer) {
        Some(close) if close > open => text[open..=close].to_string(),
        _ => fenced,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Parse an agent response into a typed structure
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json(text);
    serde_json::from_str(&json).with_context(|| {
        format!(
            "Failed to parse JSON from agent response (first {} chars):\n{}",
            PREVIEW_CHARS,
            preview(&json)
        )
    })
}

/// Parse a YAML document, naming its source in the error
pub fn parse_yaml<T: DeserializeOwned>(yaml: &str, source: &str) -> Result<T> {
    let yaml = yaml.trim_start_matches("---").trim();
    serde_yaml::from_str(yaml).with_context(|| {
        let hint = if yaml.contains('\t') {
            " (tabs are not allowed for indentation)"
        } else {
            ""
        };
        format!("Failed to parse YAML from {}{}", source, hint)
    })
}
