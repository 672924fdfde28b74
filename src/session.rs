//! Conversation state for one session.
//!
//! The message list is the exact payload of the next model submission.
//! Messages serialize in the OpenAI chat shape, tagged by `role`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text as emitted by the model; may be malformed
    #[serde(default, deserialize_with = "arguments_text")]
    pub arguments: String,
}

/// Some OpenAI-compatible servers send `arguments` as an object or `null`
/// instead of a JSON string. Keep strings, render anything else as text.
fn arguments_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn default_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No messages at all
    Empty,
    /// Only the system message
    Seeded,
    /// At least one user message appended
    Active,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    system: Option<String>,
    messages: Vec<Message>,
}

impl Session {
    /// Start a session, seeded with a system message if one is given.
    pub fn new(system: Option<String>) -> Self {
        let mut session = Self {
            system: system.filter(|s| !s.is_empty()),
            messages: Vec::new(),
        };
        session.reset();
        session
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: &str) {
        self.append(Message::user(content));
    }

    /// Drop everything but the system message. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.messages.clear();
        if let Some(system) = &self.system {
            self.messages.push(Message::system(system.clone()));
        }
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn state(&self) -> SessionState {
        match self.messages.as_slice() {
            [] => SessionState::Empty,
            [Message::System { .. }] => SessionState::Seeded,
            _ => SessionState::Active,
        }
    }

    /// Content of the most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Invocation ids from assistant messages with no matching tool message.
    ///
    /// Empty whenever the session is at rest between turns.
    pub fn unanswered_invocations(&self) -> Vec<&str> {
        let answered: HashSet<&str> = self
            .messages
            .iter()
            .filter_map(|m| match m {
                Message::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Assistant { tool_calls, .. } => Some(tool_calls),
                _ => None,
            })
            .flatten()
            .map(|tc| tc.id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }
}
