//! Parser for outbound call expressions
//!
//! Understands exactly the subset the session produces: a function name
//! followed by comma-separated arguments, each a single-quoted string or a
//! JSON literal.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Deserializer, Value};

/// A parsed `name(args...)` expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub function: String,
    pub args: Vec<Value>,
}

impl ParsedCall {
    #[must_use]
    pub fn string(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }

    #[must_use]
    pub fn boolean(&self, index: usize) -> Option<bool> {
        self.args.get(index).and_then(Value::as_bool)
    }
}

/// Parse one call expression
///
/// # Errors
///
/// Returns an error describing the first unparseable position.
pub fn parse_call(expression: &str) -> Result<ParsedCall> {
    let expression = expression.trim();
    let open = expression
        .find('(')
        .ok_or_else(|| anyhow!("expected '(' in {expression}"))?;
    let function = expression[..open].trim();
    if function.is_empty() || !function.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid function name '{function}'");
    }

    let mut rest = expression[open + 1..].trim_start();
    let mut args = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix(')') {
            if !after.trim().is_empty() {
                bail!("trailing characters after call: {after}");
            }
            break;
        }
        let (value, after) = parse_argument(rest)
            .with_context(|| format!("argument {} of {function}", args.len()))?;
        args.push(value);
        rest = after.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after.trim_start();
        } else if !rest.starts_with(')') {
            bail!("expected ',' or ')' in {function}, found: {rest}");
        }
    }

    Ok(ParsedCall {
        function: function.to_string(),
        args,
    })
}

fn parse_argument(input: &str) -> Result<(Value, &str)> {
    match input.chars().next() {
        Some('\'') => parse_quoted(input),
        Some('{' | '[' | '"') => {
            let mut stream = Deserializer::from_str(input).into_iter::<Value>();
            let value = stream
                .next()
                .ok_or_else(|| anyhow!("missing JSON value"))??;
            Ok((value, &input[stream.byte_offset()..]))
        }
        Some(_) => {
            let end = input
                .find(|c: char| c == ',' || c == ')')
                .ok_or_else(|| anyhow!("unterminated literal: {input}"))?;
            let value = serde_json::from_str(input[..end].trim())
                .with_context(|| format!("invalid literal '{}'", &input[..end]))?;
            Ok((value, &input[end..]))
        }
        None => bail!("unexpected end of expression"),
    }
}

fn parse_quoted(input: &str) -> Result<(Value, &str)> {
    let mut text = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\'' => return Ok((Value::String(text), &input[index + 1..])),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| anyhow!("dangling escape"))?;
                match escaped {
                    'n' => text.push('\n'),
                    'r' => text.push('\r'),
                    'u' => {
                        let hex: String = (0..4).filter_map(|_| chars.next().map(|(_, c)| c)).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .with_context(|| format!("invalid unicode escape '{hex}'"))?;
                        text.push(char::from_u32(code).ok_or_else(|| anyhow!("invalid code point {code}"))?);
                    }
                    other => text.push(other),
                }
            }
            other => text.push(other),
        }
    }
    bail!("unterminated string literal")
}
