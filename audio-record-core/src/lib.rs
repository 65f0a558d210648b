//! # audio-record-core
//!
//! Platform-agnostic audio recording core.
//!
//! Provides the single-session recording state machine, frame buffering, and
//! the command dispatcher that bridge hosts call into. Platform backends
//! implement the `AudioDevice` / `DeviceHandle` traits and plug into the
//! generic `SessionManager`.
//!
//! ## Architecture
//!
//! ```text
//! audio-record-core (this crate)
//! ├── traits/       ← AudioDevice, DeviceHandle, SessionObserver
//! ├── models/       ← RecordError, SessionState, SessionConfig, Frame, summaries
//! ├── processing/   ← RingBuffer
//! ├── session/      ← SessionManager + capture thread
//! └── dispatch/     ← Command, CommandDispatcher
//! ```

pub mod dispatch;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use dispatch::command::{Command, CommandName};
pub use dispatch::dispatcher::{CommandDispatcher, CommandResult};
pub use models::config::SessionConfig;
pub use models::error::{DeviceError, RecordError};
pub use models::frame::{DroppedFrameWarning, Frame};
pub use models::session::{
    RecordingSummary, SessionId, SessionSnapshot, StartedSession, StopOutcome,
};
pub use models::state::SessionState;
pub use processing::ring_buffer::RingBuffer;
pub use session::manager::SessionManager;
pub use traits::device::{AudioDevice, DeviceHandle, DeviceRead};
pub use traits::observer::SessionObserver;
