use serde_json::Value;

/// A payload decoded for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// Valid UTF-8 JSON.
    Structured(Value),
    /// Anything else, as text. Invalid UTF-8 is escaped (`\xff`).
    Text(String),
}

impl ParsedPayload {
    /// Body text: indented JSON for structured payloads, the text otherwise.
    pub fn pretty(&self) -> String {
        match self {
            // Serializing a `Value` cannot fail
            ParsedPayload::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ParsedPayload::Text(text) => text.clone(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedPayload::Structured(_))
    }
}

/// Decode raw payload bytes: JSON first, then UTF-8 text, then escaped bytes.
pub fn decode_payload(bytes: &[u8]) -> ParsedPayload {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return ParsedPayload::Structured(value);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => ParsedPayload::Text(text.to_string()),
        Err(_) => ParsedPayload::Text(bytes.escape_ascii().to_string()),
    }
}
