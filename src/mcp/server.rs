//! Tool server: exposes the bridge as JSON-RPC over HTTP.
//!
//! Routes:
//! - `POST /mcp`    JSON-RPC 2.0 (`initialize`, `ping`, `tools/list`, `tools/call`)
//! - `GET  /health` liveness

use crate::bridge::error::{INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::bridge::{self, SchedulerBridge};
use crate::mcp::ToolCallResult;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SERVER_NAME: &str = "Meeting Scheduler MCP";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;

#[derive(Debug, Clone)]
struct ServerState {
    bridge: SchedulerBridge,
}

/// Build the router. Mount point for JSON-RPC is `/mcp`.
pub fn router(bridge: SchedulerBridge) -> Router {
    let state = Arc::new(ServerState { bridge });
    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(rpc))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, bridge: SchedulerBridge) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!(
        addr = %listener.local_addr()?,
        store = %bridge.base_url(),
        "tool server listening"
    );
    axum::serve(listener, router(bridge)).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn rpc(State(state): State<Arc<ServerState>>, body: String) -> Response {
    let request: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable JSON-RPC body");
            return Json(error_reply(Value::Null, PARSE_ERROR, &format!("Parse error: {}", e)))
                .into_response();
        }
    };

    match handle_request(&state.bridge, &request).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handle one JSON-RPC message. Notifications (no `id`) produce no reply.
pub async fn handle_request(bridge: &SchedulerBridge, request: &Value) -> Option<Value> {
    let id = request.get("id").cloned();
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Some(error_reply(
            id.unwrap_or(Value::Null),
            INVALID_REQUEST,
            "Invalid request: missing method",
        ));
    };
    let Some(id) = id else {
        debug!(method, "notification");
        return None;
    };

    let reply = match method {
        "initialize" => ok_reply(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),

        "ping" => ok_reply(id, json!({})),

        "tools/list" => ok_reply(id, json!({ "tools": bridge::tools::definitions() })),

        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(error_reply(id, INVALID_PARAMS, "tools/call requires `name`"));
            };
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

            debug!(tool = name, %arguments, "tools/call");
            match bridge::tools::dispatch(bridge, name, arguments).await {
                Ok(value) => ok_reply(id, ToolCallResult::from_json(value).to_wire()),
                Err(e) => {
                    warn!(tool = name, kind = e.kind(), error = %e, "tool call failed");
                    json!({ "jsonrpc": "2.0", "id": id, "error": e.to_rpc_error() })
                }
            }
        }

        _ => error_reply(
            id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {}", method),
        ),
    };
    Some(reply)
}

fn ok_reply(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_reply(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}
