//! Outbound calling convention
//!
//! Calls into the embedded script are plain function-call expressions with
//! single-quoted string arguments and JSON literals for structured values,
//! e.g. `getFile('notes.txt', {"decrypt":false,"verify":false}, '6f1c...')`.
//! Direct results come back as the JSON rendering of the script value.

use serde::Serialize;
use std::fmt;

/// A function-call expression under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCall {
    function: &'static str,
    args: Vec<String>,
}

impl ScriptCall {
    #[must_use]
    pub fn new(function: &'static str) -> Self {
        Self {
            function,
            args: Vec::new(),
        }
    }

    /// Append a string argument as a quoted script literal
    #[must_use]
    pub fn string(mut self, value: &str) -> Self {
        self.args.push(quote(value));
        self
    }

    /// Append any serialisable value as a JSON literal
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialised.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.args.push(serde_json::to_string(value)?);
        Ok(self)
    }

    /// Append an already rendered JSON literal
    #[must_use]
    pub fn raw_json(mut self, literal: String) -> Self {
        self.args.push(literal);
        self
    }

    #[must_use]
    pub fn boolean(mut self, value: bool) -> Self {
        self.args.push(value.to_string());
        self
    }

    #[must_use]
    pub fn function(&self) -> &'static str {
        self.function
    }

    #[must_use]
    pub fn to_expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScriptCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function, self.args.join(", "))
    }
}

/// Quote a string as a single-quoted script literal
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\u{2028}' => quoted.push_str("\\u2028"),
            '\u{2029}' => quoted.push_str("\\u2029"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

/// True when a direct result signals "no value"
#[must_use]
pub fn is_null_result(result: Option<&str>) -> bool {
    match result {
        None => true,
        Some(text) => {
            let text = text.trim();
            text.is_empty() || text == "null" || text == "undefined"
        }
    }
}

/// Keep a direct result only if it carries a value
#[must_use]
pub fn non_null(result: Option<String>) -> Option<String> {
    result.filter(|text| !is_null_result(Some(text)))
}

/// Turn a direct result into plain text
///
/// JSON string literals are decoded (escapes included); anything else only
/// loses a pair of surrounding double quotes, if present.
#[must_use]
pub fn unquote(result: &str) -> String {
    let trimmed = result.trim();
    if let Ok(text) = serde_json::from_str::<String>(trimmed) {
        return text;
    }
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expression_rendering() {
        let call = ScriptCall::new("getFile")
            .string("try.txt")
            .json(&json!({"decrypt": false}))
            .unwrap()
            .string("token-1");
        assert_eq!(
            call.to_expression(),
            r#"getFile('try.txt', {"decrypt":false}, 'token-1')"#
        );
    }

    #[test]
    fn test_call_without_arguments() {
        assert_eq!(ScriptCall::new("loadUserData").to_expression(), "loadUserData()");
    }

    #[test]
    fn test_quote_escapes_breaking_characters() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote("a\\b"), r"'a\\b'");
        assert_eq!(quote("line\nbreak"), r"'line\nbreak'");
        assert_eq!(quote("sep\u{2028}"), r"'sep\u2028'");
    }

    #[test]
    fn test_null_results() {
        assert!(is_null_result(None));
        assert!(is_null_result(Some("null")));
        assert!(is_null_result(Some(" ")));
        assert!(!is_null_result(Some("\"null\"")));
        assert!(!is_null_result(Some("false")));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""eyJ0eXAi""#), "eyJ0eXAi");
        assert_eq!(unquote(r#""line\nbreak \"q\"""#), "line\nbreak \"q\"");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote(r#""unterminated \q""#), r"unterminated \q");
    }
}
