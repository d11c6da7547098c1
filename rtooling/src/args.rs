//! Argument parsing for model-issued tool calls and `/prompt` lines.
//!
//! ```rust
//! use rtooling::{parse_prompt_args, parse_tool_arguments};
//!
//! let args = parse_tool_arguments(r#"{"topic":"rust"}"#).expect("object should parse");
//! assert_eq!(args["topic"], "rust");
//!
//! let prompt_args = parse_prompt_args(r#"topic="graph neural networks" num_papers=3"#);
//! assert_eq!(prompt_args["topic"], "graph neural networks");
//! assert_eq!(prompt_args["num_papers"], "3");
//! ```

use serde_json::Value;

use crate::{JsonObject, PromptArguments, ToolError};

pub fn parse_json_value(args_json: &str) -> Result<Value, ToolError> {
    serde_json::from_str(args_json)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

/// Parses model-supplied arguments; blank input is an empty object.
pub fn parse_tool_arguments(args_json: &str) -> Result<JsonObject, ToolError> {
    if args_json.trim().is_empty() {
        return Ok(JsonObject::new());
    }

    match parse_json_value(args_json)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonObject::new()),
        _ => Err(ToolError::invalid_arguments("expected JSON object arguments")),
    }
}

/// Parses `key=value`, `key="quoted value"` and `key='quoted value'` pairs.
///
/// Tokens without `=` are skipped. An unterminated quote takes the rest of
/// the line.
pub fn parse_prompt_args(line: &str) -> PromptArguments {
    let mut args = PromptArguments::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let Some(eq) = rest[..token_end].find('=') else {
            rest = rest[token_end..].trim_start();
            continue;
        };

        let key = &rest[..eq];
        let after = &rest[eq + 1..];
        let (value, remaining) = match after.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &after[1..];
                match body.find(quote) {
                    Some(close) => (&body[..close], &body[close + 1..]),
                    None => (body, ""),
                }
            }
            _ => {
                let end = after.find(char::is_whitespace).unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };

        if is_key(key) {
            args.insert(key.to_string(), value.to_string());
        }
        rest = remaining.trim_start();
    }

    args
}

fn is_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
}
