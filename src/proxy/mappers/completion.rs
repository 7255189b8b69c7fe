// Text-processing (chat completion) request/response mapping
use serde_json::{json, Value};

use crate::proxy::common::utils::truncate_chars;

/// Upper bound on the user prompt sent to the model.
pub const MAX_PROMPT_CHARS: usize = 100_000;

const SYSTEM_INSTRUCTION: &str = "You clean up text extracted from PDF documents. \
Fix broken line wraps, hyphenation and spacing, drop page headers, footers and page numbers, \
and keep the original wording and paragraph order. Reply with the cleaned text only.";

/// Chat-completion body for one document.
pub fn build_request(model: &str, extracted_text: &str, filename: Option<&str>) -> Value {
    let full_prompt = match filename {
        Some(name) => format!("Document: {}\n\n{}", name, extracted_text),
        None => extracted_text.to_string(),
    };

    // The cap covers the whole user prompt, filename prefix included
    let prompt = truncate_chars(&full_prompt, MAX_PROMPT_CHARS);
    if prompt.len() < full_prompt.len() {
        tracing::info!(
            "Prompt truncated to {} characters before processing",
            MAX_PROMPT_CHARS
        );
    }

    json!({
        "model": model,
        "temperature": 0,
        "messages": [
            { "role": "system", "content": SYSTEM_INSTRUCTION },
            { "role": "user", "content": prompt }
        ]
    })
}

/// First choice's message content, if present and non-blank.
pub fn extract_text(response: &Value) -> Option<String> {
    response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
