use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::SessionState;

/// Opaque identifier of one recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returned by a successful `start()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
}

/// Result of a completed recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Frames read from the device during the session.
    pub frames_captured: u64,
    /// Frames overwritten by ring buffer overflow.
    pub frames_dropped: u64,
    /// Frames still buffered at stop and handed to the observer.
    pub frames_flushed: u64,
    /// Set when the device failed mid-session and capture ended early.
    pub capture_error: Option<String>,
}

/// Outcome of `stop()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Completed(RecordingSummary),
    /// The stop arrived while the device was still being acquired and the
    /// acquisition was abandoned.
    CancelledStart,
}

/// Point-in-time view of the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(serialize_with = "serialize_state")]
    pub state: SessionState,
    pub session_id: Option<SessionId>,
    pub started_at: Option<DateTime<Utc>>,
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub frames_buffered: usize,
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

fn serialize_state<S: serde::Serializer>(
    state: &SessionState,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(state.name())
}
