use serde::{Deserialize, Serialize};
use serde_json::Value;

use audio_record_core::{CommandResult, RecordError};

/// One method invocation arriving over the bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCall {
    /// Target channel. Calls without one are addressed to the host's channel.
    #[serde(default)]
    pub channel: Option<String>,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
    /// Caller correlation token, echoed back on the response.
    #[serde(default)]
    pub id: Option<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            channel: None,
            method: method.into(),
            arguments: Value::Null,
            id: None,
        }
    }
}

/// Exactly one of these answers every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResult {
    Success { value: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResult {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<CommandResult> for MethodResult {
    fn from(result: CommandResult) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(RecordError::UnsupportedCommand(_)) => Self::NotImplemented,
            Err(e) => Self::error(e.code(), e.to_string()),
        }
    }
}

/// Wire form of a result, carrying the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub result: MethodResult,
}
