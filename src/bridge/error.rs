//! Error taxonomy for bridge operations.
//!
//! The same enum travels across the tool-server boundary: the server encodes
//! it into a JSON-RPC error object and the HTTP tool client decodes it back,
//! so a store rejection keeps its class, status and body end to end.

use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC code used for rejected writes and bad tool arguments
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC code used for everything else the bridge reports
pub const INTERNAL_ERROR: i64 = -32603;
/// JSON-RPC code for an unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The store rejected the request (4xx). Body is kept verbatim.
    #[error("Scheduler API error {status}: {body}")]
    Validation { status: u16, body: String },

    /// The store answered with a non-2xx status outside the 4xx range.
    #[error("Scheduler API failure {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Timeout, refused connection, or any other transport failure.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// A JSON-RPC error from the tool server that maps to no other class.
    #[error("tool server error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl BridgeError {
    /// Short machine-readable class name, carried in JSON-RPC error data
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Validation { .. } => "validation",
            BridgeError::Upstream { .. } => "upstream",
            BridgeError::Connectivity(_) => "connectivity",
            BridgeError::InvalidArguments { .. } => "invalid_arguments",
            BridgeError::UnknownTool(_) => "unknown_tool",
            BridgeError::Decode(_) => "decode",
            BridgeError::Rpc { .. } => "rpc",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BridgeError::Validation { .. })
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, BridgeError::Connectivity(_))
    }

    /// Classify a non-2xx store response.
    pub fn from_status(status: u16, body: String) -> Self {
        if (400..500).contains(&status) {
            BridgeError::Validation { status, body }
        } else {
            BridgeError::Upstream { status, body }
        }
    }

    pub fn rpc_code(&self) -> i64 {
        match self {
            BridgeError::Validation { .. } | BridgeError::InvalidArguments { .. } => {
                INVALID_PARAMS
            }
            BridgeError::UnknownTool(_) => METHOD_NOT_FOUND,
            BridgeError::Rpc { code, .. } => *code,
            _ => INTERNAL_ERROR,
        }
    }

    /// Encode as a JSON-RPC `error` object.
    pub fn to_rpc_error(&self) -> Value {
        let mut data = json!({ "kind": self.kind() });
        match self {
            BridgeError::Validation { status, body } | BridgeError::Upstream { status, body } => {
                data["status"] = json!(status);
                data["body"] = json!(body);
            }
            BridgeError::Connectivity(detail) | BridgeError::Decode(detail) => {
                data["detail"] = json!(detail);
            }
            BridgeError::InvalidArguments { tool, message } => {
                data["tool"] = json!(tool);
                data["detail"] = json!(message);
            }
            BridgeError::UnknownTool(name) => {
                data["tool"] = json!(name);
            }
            BridgeError::Rpc { .. } => {}
        }
        json!({
            "code": self.rpc_code(),
            "message": self.to_string(),
            "data": data,
        })
    }

    /// Decode a JSON-RPC `error` object produced by [`BridgeError::to_rpc_error`].
    ///
    /// Errors from servers that do not send `data.kind` become [`BridgeError::Rpc`].
    pub fn from_rpc_error(error: &Value) -> Self {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(INTERNAL_ERROR);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let data = error.get("data").cloned().unwrap_or(Value::Null);
        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| message.clone())
        };
        let status = data
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok());

        match (data.get("kind").and_then(Value::as_str), status) {
            (Some("validation"), Some(status)) => BridgeError::Validation {
                status,
                body: text("body"),
            },
            (Some("upstream"), Some(status)) => BridgeError::Upstream {
                status,
                body: text("body"),
            },
            (Some("connectivity"), _) => BridgeError::Connectivity(text("detail")),
            (Some("decode"), _) => BridgeError::Decode(text("detail")),
            (Some("invalid_arguments"), _) => BridgeError::InvalidArguments {
                tool: text("tool"),
                message: text("detail"),
            },
            (Some("unknown_tool"), _) => BridgeError::UnknownTool(text("tool")),
            _ => BridgeError::Rpc {
                code,
                message: message.clone(),
            },
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BridgeError::Decode(err.to_string())
        } else {
            BridgeError::Connectivity(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(BridgeError::from_status(400, "{}".into()).is_validation());
        assert!(BridgeError::from_status(409, "{}".into()).is_validation());
        assert!(!BridgeError::from_status(502, "bad gateway".into()).is_validation());
    }

    #[test]
    fn test_validation_message_keeps_status_and_body() {
        let err = BridgeError::Validation {
            status: 400,
            body: r#"{"non_field_errors":["Client already has a meeting in this time range"]}"#
                .to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Scheduler API error 400"));
        assert!(msg.contains("Client already has a meeting in this time range"));
    }

    #[test]
    fn test_rpc_error_preserves_class() {
        let original = BridgeError::Validation {
            status: 400,
            body: "duplicate email".to_string(),
        };
        let wire = original.to_rpc_error();
        assert_eq!(wire["code"], INVALID_PARAMS);

        match BridgeError::from_rpc_error(&wire) {
            BridgeError::Validation { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "duplicate email");
            }
            other => panic!("expected validation, got {other:?}"),
        }

        let wire = BridgeError::Connectivity("timed out".into()).to_rpc_error();
        assert!(BridgeError::from_rpc_error(&wire).is_connectivity());
    }

    #[test]
    fn test_foreign_rpc_error() {
        let wire = json!({"code": -32000, "message": "boom"});
        match BridgeError::from_rpc_error(&wire) {
            BridgeError::Rpc { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "boom");
            }
            other => panic!("expected rpc, got {other:?}"),
        }
    }
}
