//! OpenAI-compatible chat completions client.

use crate::session::{Message, ToolCall};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Connectivity(String),

    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid model response: {0}")]
    Decode(String),

    #[error("model returned no choices")]
    EmptyResponse,

    #[error("{0}")]
    MissingApiKey(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::Decode(e.to_string())
        } else {
            LlmError::Connectivity(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl ChatResponse {
    /// A single-choice response, mostly for scripted models.
    pub fn reply(content: Option<&str>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: content.map(str::to_string),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }
}

/// Anything that answers chat completion requests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

pub struct OpenAiClient {
    base_url: String,
    api_key: SecretString,
    http: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Connectivity(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "chat request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        trace!(%body, "chat response");

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
        if parsed.choices.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_empty_tools() {
        let request = ChatRequest {
            model: "gpt-5".to_string(),
            messages: vec![Message::user("hi")],
            tools: None,
            tool_choice: None,
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("tool_choice").is_none());
        assert_eq!(wire["messages"][0], json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_response_with_tool_calls() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_clients", "arguments": "{\"name\":\"Acme\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3}
        });
        let parsed: ChatResponse = serde_json::from_value(body).unwrap();
        let msg = &parsed.choices[0].message;
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls.as_ref().unwrap()[0].function.name, "list_clients");
        assert_eq!(parsed.usage.unwrap().completion_tokens, 3);
    }

    #[test]
    fn test_non_string_arguments_are_kept_as_text() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [
                        {
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "list_meetings", "arguments": {"client_id": 7}}
                        },
                        {
                            "id": "call_2",
                            "type": "function",
                            "function": {"name": "api_info", "arguments": null}
                        },
                        {
                            "id": "call_3",
                            "function": {"name": "api_info"}
                        }
                    ]
                }
            }]
        });
        let parsed: ChatResponse = serde_json::from_value(body).unwrap();
        let calls = parsed.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"client_id":7}"#);
        assert_eq!(calls[1].function.arguments, "");
        assert_eq!(calls[2].function.arguments, "");
        assert_eq!(calls[2].call_type, "function");
    }

    #[test]
    fn test_reply_helper() {
        let response = ChatResponse::reply(Some("done"), vec![]);
        assert_eq!(response.choices[0].message.content.as_deref(), Some("done"));
        assert!(response.choices[0].message.tool_calls.is_none());
    }
}
