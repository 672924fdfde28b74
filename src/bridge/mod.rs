//! Tool bridge over the scheduling store's REST surface.
//!
//! Every operation is exactly one HTTP round trip with the client-wide
//! timeout. Store rejections are never re-checked, retried or reshaped here:
//! the status and raw body go back to the caller inside [`BridgeError`].

pub mod error;
pub mod tools;
pub mod types;

pub use error::BridgeError;
pub use types::{ApiInfo, Client, ClientQuery, Meeting, MeetingQuery, NewClient, NewMeeting};

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use types::Listing;

/// Default per-request timeout against the store
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one scheduling store base URL.
#[derive(Debug, Clone)]
pub struct SchedulerBridge {
    base_url: String,
    http: reqwest::Client,
}

impl SchedulerBridge {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Connectivity(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Probe the store with a one-item client listing. Never fails.
    pub async fn api_info(&self) -> ApiInfo {
        let reachable = match self
            .http
            .get(self.url("clients/"))
            .query(&[("limit", "1")])
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                warn!(base = %self.base_url, error = %e, "scheduler probe failed");
                false
            }
        };
        ApiInfo {
            base: self.base_url.clone(),
            reachable,
        }
    }

    pub async fn list_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, BridgeError> {
        let params = query.to_params();
        debug!(?params, "GET clients/");
        let response = self
            .http
            .get(self.url("clients/"))
            .query(&params)
            .send()
            .await?;
        let listing: Listing<Client> = read_json(response).await?;
        Ok(listing.into_vec())
    }

    pub async fn create_client(&self, input: &NewClient) -> Result<Client, BridgeError> {
        debug!(email = %input.email, "POST clients/");
        let response = self
            .http
            .post(self.url("clients/"))
            .json(input)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn list_meetings(&self, query: &MeetingQuery) -> Result<Vec<Meeting>, BridgeError> {
        let params = query.to_params();
        debug!(?params, "GET meetings/");
        let response = self
            .http
            .get(self.url("meetings/"))
            .query(&params)
            .send()
            .await?;
        let listing: Listing<Meeting> = read_json(response).await?;
        Ok(listing.into_vec())
    }

    pub async fn create_meeting(&self, input: &NewMeeting) -> Result<Meeting, BridgeError> {
        debug!(client = input.client, title = %input.title, "POST meetings/");
        let response = self
            .http
            .post(self.url("meetings/"))
            .json(input)
            .send()
            .await?;
        read_json(response).await
    }
}

/// Turn a store response into `T`, or into the matching error class with the
/// body preserved.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BridgeError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BridgeError::from_status(status.as_u16(), body));
    }
    serde_json::from_str(&body).map_err(|e| BridgeError::Decode(format!("{}: {}", e, body)))
}
