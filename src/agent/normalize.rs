//! Tool result → tool message text.

use crate::mcp::{ToolCallResult, ToolOutput};
use serde_json::Value;

/// Body used when a tool produced nothing usable
pub const NO_RESULT: &str = "(no result)";

/// Flatten a tool result into the text the model sees.
///
/// A non-empty structured payload wins and is rendered as compact JSON.
/// Otherwise text parts are kept verbatim and other parts are rendered as
/// JSON, joined by newlines.
pub fn normalize(result: &ToolCallResult) -> String {
    let structured = result.outputs.iter().find_map(|o| match o {
        ToolOutput::Structured(v) if !is_blank(v) => Some(v),
        _ => None,
    });
    if let Some(value) = structured {
        return value.to_string();
    }

    let parts: Vec<String> = result
        .outputs
        .iter()
        .filter_map(|o| match o {
            ToolOutput::Text(text) => Some(text.clone()),
            ToolOutput::Opaque(v) => Some(v.to_string()),
            ToolOutput::Structured(_) => None,
        })
        .collect();
    let text = parts.join("\n");
    if text.trim().is_empty() {
        NO_RESULT.to_string()
    } else {
        text
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
