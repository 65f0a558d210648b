use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::models::error::RecordError;

/// The fixed set of commands the recording channel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    StartRecording,
    StopRecording,
    ResetRecording,
    GetRecordingStatus,
}

impl CommandName {
    pub const ALL: [CommandName; 4] = [
        Self::StartRecording,
        Self::StopRecording,
        Self::ResetRecording,
        Self::GetRecordingStatus,
    ];

    /// Method name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartRecording => "startRecording",
            Self::StopRecording => "stopRecording",
            Self::ResetRecording => "resetRecording",
            Self::GetRecordingStatus => "getRecordingStatus",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| RecordError::UnsupportedCommand(s.to_string()))
    }
}

/// One request from the bridge: a known name plus opaque arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: CommandName,
    pub arguments: Value,
}

impl Command {
    pub fn new(name: CommandName) -> Self {
        Self {
            name,
            arguments: Value::Null,
        }
    }

    /// Resolve a wire method name. Unknown names fail with
    /// `RecordError::UnsupportedCommand`.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, RecordError> {
        Ok(Self {
            name: name.parse()?,
            arguments,
        })
    }
}
