//! JSON-RPC over HTTP client for a remote tool server.

use super::{McpToolDef, ToolCallResult, ToolSurface};
use crate::bridge::BridgeError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Tool surface served by a `schedbridge-server` (or any compatible server).
#[derive(Debug)]
pub struct HttpMcpClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpMcpClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Connectivity(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Connect and perform the `initialize` handshake. Returns the server's
    /// `initialize` result alongside the client.
    pub async fn connect(url: &str, timeout: Duration) -> Result<(Self, Value), BridgeError> {
        let client = Self::new(url, timeout)?;
        let info = client
            .request(
                "initialize",
                json!({
                    "protocolVersion": super::server::PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "schedbridge",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;
        debug!(server = %info["serverInfo"], "tool server initialized");
        Ok((client, info))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one JSON-RPC request and return its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BridgeError::Connectivity(format!(
                "tool server returned HTTP {}: {}",
                status, body
            )));
        }

        let reply: Value = serde_json::from_str(&body)
            .map_err(|e| BridgeError::Decode(format!("invalid JSON-RPC reply: {}", e)))?;
        if let Some(error) = reply.get("error") {
            return Err(BridgeError::from_rpc_error(error));
        }
        reply
            .get("result")
            .cloned()
            .ok_or_else(|| BridgeError::Decode("JSON-RPC reply without result".to_string()))
    }
}

#[async_trait]
impl ToolSurface for HttpMcpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolDef>, BridgeError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        serde_json::from_value(tools)
            .map_err(|e| BridgeError::Decode(format!("invalid tools/list result: {}", e)))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, BridgeError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(ToolCallResult::from_wire(&result))
    }
}
