//! In-process scheduling store for end-to-end tests.
//!
//! Mirrors the store's observable contract: unique client emails, meetings
//! must end after they start, and a client's meetings may not overlap
//! (`start_time < new_end AND end_time > new_start`). Clients list as a bare
//! array, meetings inside a `{count, results}` envelope.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct StoreState {
    next_client_id: i64,
    next_meeting_id: i64,
    clients: Vec<Value>,
    meetings: Vec<Value>,
}

type Shared = Arc<Mutex<StoreState>>;
type Reply = (StatusCode, Json<Value>);

pub struct FakeStore {
    pub base_url: String,
}

impl FakeStore {
    pub async fn start() -> Self {
        Self::with_next_id(1).await
    }

    /// Start with the given id for the first client created.
    pub async fn with_next_id(next_client_id: i64) -> Self {
        let state: Shared = Arc::new(Mutex::new(StoreState {
            next_client_id,
            next_meeting_id: 1,
            ..StoreState::default()
        }));
        let app = Router::new()
            .route("/api/clients/", get(list_clients).post(create_client))
            .route("/api/meetings/", get(list_meetings).post(create_meeting))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{}/api", addr),
        }
    }
}

/// Serve the tool server router on an ephemeral port; returns the `/mcp` URL.
pub async fn spawn_tool_server(store_base: &str) -> String {
    let bridge =
        schedbridge::bridge::SchedulerBridge::new(store_base, schedbridge::bridge::DEFAULT_TIMEOUT)
            .unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, schedbridge::mcp::server::router(bridge))
            .await
            .unwrap();
    });
    format!("http://{}/mcp", addr)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn bad_request(body: Value) -> Reply {
    (StatusCode::BAD_REQUEST, Json(body))
}

fn parse_time(value: &Value) -> Option<DateTime<FixedOffset>> {
    value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

async fn list_clients(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock().unwrap();
    let search = params.get("search").map(|s| s.to_lowercase());
    let clients: Vec<Value> = state
        .clients
        .iter()
        .filter(|c| params.get("email").map_or(true, |e| c["email"] == e.as_str()))
        .filter(|c| {
            search.as_ref().map_or(true, |needle| {
                ["name", "email", "phone"].iter().any(|field| {
                    c[*field]
                        .as_str()
                        .is_some_and(|v| v.to_lowercase().contains(needle.as_str()))
                })
            })
        })
        .cloned()
        .collect();
    Json(Value::Array(clients))
}

async fn create_client(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = state.lock().unwrap();
    let (Some(name), Some(email)) = (body["name"].as_str(), body["email"].as_str()) else {
        return bad_request(json!({"name": ["This field is required."]}));
    };
    if state.clients.iter().any(|c| c["email"] == email) {
        return bad_request(json!({"email": ["client with this email already exists."]}));
    }
    let id = state.next_client_id;
    state.next_client_id += 1;
    let client = json!({
        "id": id,
        "name": name,
        "email": email,
        "phone": body.get("phone").cloned().unwrap_or(Value::Null),
        "created_at": now(),
    });
    state.clients.push(client.clone());
    (StatusCode::CREATED, Json(client))
}

async fn list_meetings(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock().unwrap();
    let start = params.get("start").and_then(|s| DateTime::parse_from_rfc3339(s).ok());
    let end = params.get("end").and_then(|s| DateTime::parse_from_rfc3339(s).ok());
    let mut meetings: Vec<Value> = state
        .meetings
        .iter()
        .filter(|m| params.get("client").map_or(true, |c| m["client"].to_string() == *c))
        .filter(|m| start.map_or(true, |s| parse_time(&m["end_time"]).is_some_and(|e| e > s)))
        .filter(|m| end.map_or(true, |e| parse_time(&m["start_time"]).is_some_and(|s| s < e)))
        .cloned()
        .collect();
    meetings.sort_by_key(|m| parse_time(&m["start_time"]));
    Json(json!({"count": meetings.len(), "results": meetings}))
}

async fn create_meeting(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = state.lock().unwrap();
    let Some(client) = body["client"].as_i64() else {
        return bad_request(json!({"client": ["This field is required."]}));
    };
    if !state.clients.iter().any(|c| c["id"] == client) {
        return bad_request(json!({"client": [format!("Invalid pk \"{}\" - object does not exist.", client)]}));
    }
    let (Some(start), Some(end)) = (parse_time(&body["start_time"]), parse_time(&body["end_time"]))
    else {
        return bad_request(json!({"start_time": ["Datetime has wrong format."]}));
    };
    if end <= start {
        return bad_request(json!({"non_field_errors": ["end_time must be after start_time."]}));
    }
    let overlaps = state.meetings.iter().any(|m| {
        m["client"] == client
            && parse_time(&m["start_time"]).is_some_and(|s| s < end)
            && parse_time(&m["end_time"]).is_some_and(|e| e > start)
    });
    if overlaps {
        return bad_request(json!({
            "non_field_errors": ["Meeting overlaps with an existing meeting for this client."]
        }));
    }

    let id = state.next_meeting_id;
    state.next_meeting_id += 1;
    let meeting = json!({
        "id": id,
        "client": client,
        "title": body["title"].as_str().unwrap_or_default(),
        "start_time": start.to_rfc3339(),
        "end_time": end.to_rfc3339(),
        "location": body.get("location").cloned().unwrap_or(Value::Null),
        "notes": body.get("notes").cloned().unwrap_or(Value::Null),
        "created_at": now(),
    });
    state.meetings.push(meeting.clone());
    (StatusCode::CREATED, Json(meeting))
}
