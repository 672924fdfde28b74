//! Named tool surface of the bridge: descriptors plus argument dispatch.

use super::{BridgeError, ClientQuery, MeetingQuery, NewClient, NewMeeting, SchedulerBridge};
use crate::mcp::McpToolDef;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub const API_INFO: &str = "api_info";
pub const LIST_CLIENTS: &str = "list_clients";
pub const CREATE_CLIENT: &str = "create_client";
pub const LIST_MEETINGS: &str = "list_meetings";
pub const CREATE_MEETING: &str = "create_meeting";

/// All tool names, in advertised order
pub const ALL_TOOL_NAMES: &[&str] = &[
    API_INFO,
    LIST_CLIENTS,
    CREATE_CLIENT,
    LIST_MEETINGS,
    CREATE_MEETING,
];

/// Descriptors for every bridge operation.
pub fn definitions() -> Vec<McpToolDef> {
    vec![
        McpToolDef::new(
            API_INFO,
            "Get configured scheduler API base and simple status.",
            json!({"type": "object", "properties": {}}),
        ),
        McpToolDef::new(
            LIST_CLIENTS,
            "List clients. Filters: `name` (mapped to `search`), `email`, `search` (name,email,phone), `ordering` (name,-name,created_at). If `search` is provided it takes precedence over `name`.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Free-text match, sent as `search`"},
                    "email": {"type": "string", "description": "Exact email filter"},
                    "search": {"type": "string", "description": "Case-insensitive match over name, email and phone"},
                    "ordering": {"type": "string", "description": "name, -name, created_at or -created_at"}
                }
            }),
        ),
        McpToolDef::new(
            CREATE_CLIENT,
            "Create a client with name, email, and optional phone.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "email": {"type": "string", "description": "Must be unique across clients"},
                    "phone": {"type": "string"}
                },
                "required": ["name", "email"]
            }),
        ),
        McpToolDef::new(
            LIST_MEETINGS,
            "List meetings ordered by start time, with optional filters: `client_id`, `title`, `start` (meetings ending after), `end` (meetings starting before), `ordering`.",
            json!({
                "type": "object",
                "properties": {
                    "client_id": {"type": "integer", "description": "Client ID"},
                    "title": {"type": "string"},
                    "start": {"type": "string", "description": "ISO-8601; only meetings ending after this instant"},
                    "end": {"type": "string", "description": "ISO-8601; only meetings starting before this instant"},
                    "ordering": {"type": "string", "description": "start_time, end_time or created_at, optionally prefixed with -"}
                }
            }),
        ),
        McpToolDef::new(
            CREATE_MEETING,
            "Create a meeting; the scheduler rejects end <= start and any overlap with the client's existing meetings.",
            json!({
                "type": "object",
                "properties": {
                    "client": {"type": "integer", "description": "Client ID"},
                    "title": {"type": "string"},
                    "start_time": {"type": "string", "description": "ISO-8601 with timezone (UTC preferred)"},
                    "end_time": {"type": "string", "description": "ISO-8601 with timezone (UTC preferred)"},
                    "location": {"type": "string"},
                    "notes": {"type": "string"}
                },
                "required": ["client", "title", "start_time", "end_time"]
            }),
        ),
    ]
}

/// Run one named operation with JSON arguments and return its JSON result.
pub async fn dispatch(
    bridge: &SchedulerBridge,
    name: &str,
    arguments: Value,
) -> Result<Value, BridgeError> {
    match name {
        API_INFO => to_value(name, bridge.api_info().await),
        LIST_CLIENTS => {
            let query: ClientQuery = parse_args(name, arguments)?;
            to_value(name, bridge.list_clients(&query).await?)
        }
        CREATE_CLIENT => {
            let input: NewClient = parse_args(name, unwrap_payload(arguments))?;
            to_value(name, bridge.create_client(&input).await?)
        }
        LIST_MEETINGS => {
            let query: MeetingQuery = parse_args(name, arguments)?;
            to_value(name, bridge.list_meetings(&query).await?)
        }
        CREATE_MEETING => {
            let input: NewMeeting = parse_args(name, unwrap_payload(arguments))?;
            to_value(name, bridge.create_meeting(&input).await?)
        }
        _ => Err(BridgeError::UnknownTool(name.to_string())),
    }
}

/// Accept `{"payload": {...}}` as well as flat arguments for the create tools.
fn unwrap_payload(arguments: Value) -> Value {
    match arguments {
        Value::Object(mut map) if map.len() == 1 && map.get("payload").is_some_and(Value::is_object) => {
            map.remove("payload").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, BridgeError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| BridgeError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn to_value<T: serde::Serialize>(tool: &str, value: T) -> Result<Value, BridgeError> {
    serde_json::to_value(value)
        .map_err(|e| BridgeError::Decode(format!("failed to encode {} result: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_are_unique_and_complete() {
        let defs = definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ALL_TOOL_NAMES);
        for def in &defs {
            assert!(def.description.as_deref().is_some_and(|d| !d.is_empty()));
            assert_eq!(def.input_schema.as_ref().unwrap()["type"], "object");
        }
    }

    #[test]
    fn test_unwrap_payload() {
        let wrapped = json!({"payload": {"name": "Acme", "email": "a@acme.test"}});
        let flat = json!({"name": "Acme", "email": "a@acme.test"});
        assert_eq!(unwrap_payload(wrapped), flat);
        assert_eq!(unwrap_payload(flat.clone()), flat);
    }

    #[test]
    fn test_parse_args_reports_tool() {
        let err = parse_args::<NewClient>(CREATE_CLIENT, json!({"name": "Acme"})).unwrap_err();
        match err {
            BridgeError::InvalidArguments { tool, message } => {
                assert_eq!(tool, CREATE_CLIENT);
                assert!(message.contains("email"));
            }
            other => panic!("expected invalid arguments, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_args_null_is_empty() {
        let query: ClientQuery = parse_args(LIST_CLIENTS, Value::Null).unwrap();
        assert_eq!(query, ClientQuery::default());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let bridge = SchedulerBridge::new("http://127.0.0.1:9/api", super::super::DEFAULT_TIMEOUT)
            .unwrap();
        let err = dispatch(&bridge, "delete_everything", json!({})).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnknownTool(name) if name == "delete_everything"));
    }
}
