use crate::error::BridgeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

/// Payload for storage and encryption calls: either text or raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Bytes(_))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Bytes(_) => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Bytes(bytes) => Some(bytes),
            Content::Text(_) => None,
        }
    }

    /// Transport form for the script boundary: base64 for bytes plus the binary flag
    #[must_use]
    pub fn to_transport(&self) -> (String, bool) {
        match self {
            Content::Text(text) => (text.clone(), false),
            Content::Bytes(bytes) => (STANDARD.encode(bytes), true),
        }
    }

    /// Rebuild content from its transport form
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Encoding` if a binary payload is not valid base64.
    pub fn from_transport(payload: &str, is_binary: bool) -> Result<Self, BridgeError> {
        if is_binary {
            Ok(Content::Bytes(STANDARD.decode(payload.trim())?))
        } else {
            Ok(Content::Text(payload.to_string()))
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Bytes(bytes.to_vec())
    }
}

/// Accept dynamically typed host data: strings become text, arrays of bytes become binary
impl TryFrom<Value> for Content {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(Content::Text(text)),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Content::Bytes)
                .ok_or_else(|| {
                    BridgeError::UnsupportedContentType(
                        "array content must contain only byte values".to_string(),
                    )
                }),
            other => Err(BridgeError::UnsupportedContentType(format!(
                "content only supports text or bytes, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_transport_uses_base64() {
        let content = Content::from(vec![0u8, 1, 2, 255]);
        let (payload, is_binary) = content.to_transport();
        assert!(is_binary);
        assert_eq!(payload, "AAEC/w==");
        assert_eq!(Content::from_transport(&payload, true).unwrap(), content);
    }

    #[test]
    fn test_text_transport_is_verbatim() {
        let (payload, is_binary) = Content::from("Hello").to_transport();
        assert!(!is_binary);
        assert_eq!(payload, "Hello");
    }

    #[test]
    fn test_dynamic_content_rejects_other_types() {
        assert!(matches!(
            Content::try_from(json!({"a": 1})),
            Err(BridgeError::UnsupportedContentType(_))
        ));
        assert!(matches!(
            Content::try_from(json!(42)),
            Err(BridgeError::UnsupportedContentType(_))
        ));
        assert!(matches!(
            Content::try_from(json!([1, 300])),
            Err(BridgeError::UnsupportedContentType(_))
        ));
        assert_eq!(Content::try_from(json!([104, 105])).unwrap(), Content::Bytes(b"hi".to_vec()));
        assert_eq!(Content::try_from(json!("hi")).unwrap(), Content::Text("hi".to_string()));
    }
}
