use super::error::RecordError;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → starting → recording → stopping → idle
///           ↓
///         failed ──reset──→ idle
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Recording,
    Stopping,
    Failed(RecordError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Whether a session currently holds (or is acquiring) the device.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Recording | Self::Stopping)
    }

    /// Lowercase name used in status payloads and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Failed(_) => "failed",
        }
    }
}
