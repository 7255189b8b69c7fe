// Utility functions

/// Keep at most `max_chars` characters, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Strip one layer of JSON string quoting, e.g. `"\"Hello\""` -> `Hello`.
///
/// Values that are not wrapped in quotes, or that fail to parse as a JSON
/// string literal, come back unchanged.
pub fn unwrap_quoted(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        match serde_json::from_str::<String>(value) {
            Ok(inner) => return inner,
            Err(e) => {
                tracing::debug!("Keeping quoted value as-is, not a JSON string: {}", e);
            }
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_unwrap_quoted() {
        assert_eq!(unwrap_quoted("\"Hello world\""), "Hello world");
        assert_eq!(unwrap_quoted("\"say \\\"hi\\\"\""), "say \"hi\"");
        assert_eq!(unwrap_quoted("plain text"), "plain text");
        // Only one layer is removed
        assert_eq!(unwrap_quoted("\"\\\"twice\\\"\""), "\"twice\"");
        // Malformed escape is kept verbatim
        assert_eq!(unwrap_quoted("\"bad \\q escape\""), "\"bad \\q escape\"");
        // A lone quote is not a wrapped string
        assert_eq!(unwrap_quoted("\""), "\"");
        assert_eq!(unwrap_quoted("\"\""), "");
    }
}
