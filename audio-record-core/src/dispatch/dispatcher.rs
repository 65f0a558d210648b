use std::sync::Arc;

use serde_json::{json, Value};

use super::command::{Command, CommandName};
use crate::models::error::RecordError;
use crate::models::session::StopOutcome;
use crate::models::state::SessionState;
use crate::session::manager::SessionManager;
use crate::traits::device::AudioDevice;

/// Success value or typed failure for one dispatched command.
pub type CommandResult = Result<Value, RecordError>;

/// Routes bridge commands to session transitions.
///
/// Holds no state of its own; serialization of concurrent commands is the
/// session manager's transition lock.
pub struct CommandDispatcher<D: AudioDevice> {
    session: Arc<SessionManager<D>>,
}

impl<D: AudioDevice> CommandDispatcher<D> {
    pub fn new(session: Arc<SessionManager<D>>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionManager<D>> {
        &self.session
    }

    /// Resolve `name` and dispatch it. Unknown names fail with
    /// `UnsupportedCommand` and never touch the session.
    pub fn dispatch_named(&self, name: &str, arguments: Value) -> CommandResult {
        let command = Command::parse(name, arguments)?;
        self.dispatch(&command)
    }

    pub fn dispatch(&self, command: &Command) -> CommandResult {
        log::debug!("dispatching {}", command.name);

        let result = match command.name {
            CommandName::StartRecording => {
                self.session.start().and_then(|started| to_value(&started))
            }
            CommandName::StopRecording => match self.session.stop()? {
                StopOutcome::Completed(summary) => to_value(&summary),
                StopOutcome::CancelledStart => Ok(json!({ "cancelled": true })),
            },
            // A successful reset always lands in idle.
            CommandName::ResetRecording => self
                .session
                .reset()
                .map(|()| json!({ "state": SessionState::Idle.name() })),
            CommandName::GetRecordingStatus => to_value(&self.session.snapshot()),
        };

        if let Err(ref e) = result {
            log::debug!("{} failed: {}", command.name, e);
        }
        result
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> CommandResult {
    serde_json::to_value(value).map_err(|e| RecordError::Encode(e.to_string()))
}
