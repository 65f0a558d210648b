use audio_record_core::{
    DeviceError, DroppedFrameWarning, Frame, SessionId, SessionObserver, SessionState,
};

/// SessionObserver that forwards session events to the log.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_state_changed(&self, state: &SessionState) {
        match state {
            SessionState::Failed(e) => log::error!("session state: failed ({})", e),
            other => log::info!("session state: {}", other.name()),
        }
    }

    fn on_dropped_frame(&self, session: SessionId, warning: &DroppedFrameWarning) {
        // First drop, then every 100th.
        if warning.total_dropped % 100 == 1 {
            log::warn!(
                "session {}: buffer overflow, {} frames dropped so far",
                session,
                warning.total_dropped
            );
        }
    }

    fn on_frames_flushed(&self, session: SessionId, frames: &[Frame]) {
        let bytes: usize = frames.iter().map(|f| f.data().len()).sum();
        log::info!("session {}: flushed {} frames ({} bytes)", session, frames.len(), bytes);
    }

    fn on_capture_error(&self, session: SessionId, error: &DeviceError) {
        log::error!("session {}: capture ended: {}", session, error);
    }
}
