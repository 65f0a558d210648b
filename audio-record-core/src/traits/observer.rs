use crate::models::error::DeviceError;
use crate::models::frame::{DroppedFrameWarning, Frame};
use crate::models::session::SessionId;
use crate::models::state::SessionState;

/// Event observer for recording session notifications.
///
/// State changes and flushes are reported from the thread issuing the
/// command; dropped frames and capture errors from the capture thread.
/// Implementations must not call back into the session manager.
pub trait SessionObserver: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: &SessionState);

    /// Called when the ring buffer overwrote an unread frame.
    fn on_dropped_frame(&self, _session: SessionId, _warning: &DroppedFrameWarning) {}

    /// Called during `stop()` with the frames still buffered, oldest first.
    fn on_frames_flushed(&self, _session: SessionId, _frames: &[Frame]) {}

    /// Called when a device read fails mid-session.
    fn on_capture_error(&self, _session: SessionId, _error: &DeviceError) {}
}
