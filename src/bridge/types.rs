//! Store entities and the query/input shapes the bridge forwards.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A client record as returned by the scheduling store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

/// A meeting record as returned by the scheduling store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    /// Owning client id
    pub client: i64,
    pub title: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

/// Body of `POST /clients/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body of `POST /meetings/`.
///
/// Times stay as the caller wrote them; the store owns parsing and the
/// interval checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeeting {
    pub client: i64,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Filters accepted by `list_clients`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
}

impl ClientQuery {
    /// Query parameters sent to `GET /clients/`.
    ///
    /// `search` wins over `name`; `name` only ever travels as `search` so the
    /// store matches it case-insensitively across name, email and phone.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(email) = non_empty(&self.email) {
            params.push(("email", email.to_string()));
        }
        if let Some(search) = non_empty(&self.search).or_else(|| non_empty(&self.name)) {
            params.push(("search", search.to_string()));
        }
        if let Some(ordering) = non_empty(&self.ordering) {
            params.push(("ordering", ordering.to_string()));
        }
        params
    }
}

/// Filters accepted by `list_meetings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingQuery {
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Only meetings ending after this instant
    #[serde(default)]
    pub start: Option<String>,
    /// Only meetings starting before this instant
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
}

impl MeetingQuery {
    /// Query parameters sent to `GET /meetings/`.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(client_id) = self.client_id {
            params.push(("client", client_id.to_string()));
        }
        if let Some(title) = non_empty(&self.title) {
            params.push(("title", title.to_string()));
        }
        if let Some(start) = non_empty(&self.start) {
            params.push(("start", start.to_string()));
        }
        if let Some(end) = non_empty(&self.end) {
            params.push(("end", end.to_string()));
        }
        if let Some(ordering) = non_empty(&self.ordering) {
            params.push(("ordering", ordering.to_string()));
        }
        params
    }
}

/// Result of the connectivity probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub base: String,
    pub reachable: bool,
}

/// List responses come back either bare or wrapped in a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Page {
        #[serde(default = "Vec::new")]
        results: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Page { results: items } => items,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
