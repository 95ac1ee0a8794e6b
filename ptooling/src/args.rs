//! JSON argument parsing helpers for tool executors.
//!
//! ```rust
//! use ptooling::{parse_arguments, required_string};
//!
//! let params = parse_arguments(r#"{"query":"rust"}"#).expect("object should parse");
//! assert_eq!(required_string(&params, "query").unwrap(), "rust");
//!
//! let empty = parse_arguments("").expect("empty arguments mean no parameters");
//! assert!(empty.as_object().is_some_and(|map| map.is_empty()));
//! ```

use serde_json::{Map, Value};

use crate::ToolError;

/// Parses a model-supplied argument string into a JSON object.
///
/// Blank input yields an empty object.
pub fn parse_arguments(arguments: &str) -> Result<Value, ToolError> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value: Value = serde_json::from_str(arguments)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))?;

    if !value.is_object() {
        return Err(ToolError::invalid_arguments(
            "expected JSON object arguments",
        ));
    }

    Ok(value)
}

pub fn required_string(params: &Value, key: &str) -> Result<String, ToolError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_string(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
