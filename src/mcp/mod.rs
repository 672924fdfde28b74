//! MCP-style tool surface: tool definitions, call results, and the trait the
//! agent loop uses to list and invoke tools.
//!
//! Two implementations exist: [`LocalSurface`] runs the bridge in-process and
//! [`client::HttpMcpClient`] talks JSON-RPC to a `schedbridge-server`.

pub mod client;
pub mod server;

use crate::bridge::{self, BridgeError, SchedulerBridge};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tool definition as advertised by a tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDef {
    /// Tool name (e.g., "list_clients")
    pub name: String,
    /// Tool description, if the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for tool input parameters
    #[serde(rename = "inputSchema", default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl McpToolDef {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: Some(input_schema),
        }
    }
}

/// One piece of a tool result.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Machine-readable payload (`structuredContent` on the wire)
    Structured(Value),
    /// A `{"type": "text"}` content part
    Text(String),
    /// Any other content part, kept as raw JSON
    Opaque(Value),
}

/// Result of a successful `tools/call`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallResult {
    pub outputs: Vec<ToolOutput>,
    /// Set when the server reports a tool-level failure inside a result
    pub is_error: bool,
}

impl ToolCallResult {
    /// Wrap a bridge result: compact JSON text plus the structured payload.
    ///
    /// Structured content must be an object, so arrays are wrapped as
    /// `{"result": [...]}`.
    pub fn from_json(value: Value) -> Self {
        let text = value.to_string();
        let structured = if value.is_object() {
            value
        } else {
            json!({ "result": value })
        };
        Self {
            outputs: vec![ToolOutput::Structured(structured), ToolOutput::Text(text)],
            is_error: false,
        }
    }

    pub fn structured(&self) -> Option<&Value> {
        self.outputs.iter().find_map(|o| match o {
            ToolOutput::Structured(v) => Some(v),
            _ => None,
        })
    }

    /// Encode as a `tools/call` result object.
    pub fn to_wire(&self) -> Value {
        let mut content = Vec::new();
        let mut structured = None;
        for output in &self.outputs {
            match output {
                ToolOutput::Structured(v) => {
                    if structured.is_none() {
                        structured = Some(v.clone());
                    }
                }
                ToolOutput::Text(text) => content.push(json!({"type": "text", "text": text})),
                ToolOutput::Opaque(v) => content.push(v.clone()),
            }
        }
        let mut wire = json!({ "content": content, "isError": self.is_error });
        if let Some(structured) = structured {
            wire["structuredContent"] = structured;
        }
        wire
    }

    /// Decode a `tools/call` result object.
    pub fn from_wire(wire: &Value) -> Self {
        let mut outputs = Vec::new();
        if let Some(structured) = wire.get("structuredContent").filter(|v| !v.is_null()) {
            outputs.push(ToolOutput::Structured(structured.clone()));
        }
        for part in wire
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let text = part
                .get("type")
                .and_then(Value::as_str)
                .filter(|t| *t == "text")
                .and_then(|_| part.get("text"))
                .and_then(Value::as_str);
            match text {
                Some(text) => outputs.push(ToolOutput::Text(text.to_string())),
                None => outputs.push(ToolOutput::Opaque(part.clone())),
            }
        }
        Self {
            outputs,
            is_error: wire.get("isError").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// Where tools come from. One instance serves one session at a time.
#[async_trait]
pub trait ToolSurface: Send + Sync {
    /// Current tool definitions
    async fn list_tools(&self) -> Result<Vec<McpToolDef>, BridgeError>;

    /// Invoke a tool by name with JSON arguments
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, BridgeError>;
}

/// In-process tool surface backed directly by a [`SchedulerBridge`].
#[derive(Debug, Clone)]
pub struct LocalSurface {
    bridge: SchedulerBridge,
}

impl LocalSurface {
    pub fn new(bridge: SchedulerBridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &SchedulerBridge {
        &self.bridge
    }
}

#[async_trait]
impl ToolSurface for LocalSurface {
    async fn list_tools(&self) -> Result<Vec<McpToolDef>, BridgeError> {
        Ok(bridge::tools::definitions())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, BridgeError> {
        let value = bridge::tools::dispatch(&self.bridge, name, arguments).await?;
        Ok(ToolCallResult::from_json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_def_wire_names() {
        let def = McpToolDef::new("api_info", "probe", json!({"type": "object"}));
        let wire = serde_json::to_value(&def).unwrap();
        assert_eq!(wire["inputSchema"]["type"], "object");

        let bare: McpToolDef = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(bare.description.is_none());
        assert!(bare.input_schema.is_none());
    }

    #[test]
    fn test_from_json_wraps_arrays() {
        let result = ToolCallResult::from_json(json!([{"id": 1}]));
        assert_eq!(result.structured(), Some(&json!({"result": [{"id": 1}]})));
        assert!(result
            .outputs
            .contains(&ToolOutput::Text(r#"[{"id":1}]"#.to_string())));
    }

    #[test]
    fn test_wire_round_trip_keeps_parts() {
        let wire = json!({
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"}
            ],
            "isError": true
        });
        let result = ToolCallResult::from_wire(&wire);
        assert!(result.is_error);
        assert_eq!(result.structured(), None);
        assert_eq!(result.outputs[0], ToolOutput::Text("hello".to_string()));
        assert!(matches!(&result.outputs[1], ToolOutput::Opaque(v) if v["type"] == "image"));
        assert_eq!(result.to_wire(), wire);
    }

    #[tokio::test]
    async fn test_local_surface_lists_bridge_tools() {
        let bridge =
            SchedulerBridge::new("http://127.0.0.1:9/api", bridge::DEFAULT_TIMEOUT).unwrap();
        let surface = LocalSurface::new(bridge);
        let tools = surface.list_tools().await.unwrap();
        assert_eq!(tools.len(), bridge::tools::ALL_TOOL_NAMES.len());
    }
}
