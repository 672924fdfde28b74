//! Tool catalog in the model's function-calling shape.

use crate::bridge::BridgeError;
use crate::mcp::{McpToolDef, ToolSurface};
use serde_json::{json, Value};

/// Snapshot of a tool surface's definitions, taken once per session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<McpToolDef>,
}

impl Catalog {
    pub fn new(tools: Vec<McpToolDef>) -> Self {
        Self { tools }
    }

    /// Query the surface once.
    pub async fn fetch(surface: &dyn ToolSurface) -> Result<Self, BridgeError> {
        Ok(Self::new(surface.list_tools().await?))
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn tools(&self) -> &[McpToolDef] {
        &self.tools
    }

    /// Function schemas for the chat request's `tools` field.
    pub fn to_openai(&self) -> Vec<Value> {
        self.tools.iter().map(to_openai_schema).collect()
    }
}

fn to_openai_schema(tool: &McpToolDef) -> Value {
    let parameters = tool
        .input_schema
        .clone()
        .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": parameters
        }
    })
}
