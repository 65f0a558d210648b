use std::sync::Arc;

/// One immutable chunk of captured audio.
///
/// Sequence numbers start at 0 for each session and increase by one per
/// frame read from the device. Cloning shares the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence: u64,
    data: Arc<[u8]>,
}

impl Frame {
    pub fn new(sequence: u64, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            sequence,
            data: data.into(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Advisory notice that the ring buffer overwrote an unread frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedFrameWarning {
    /// Sequence number of the frame that was overwritten.
    pub dropped_sequence: u64,
    /// Total frames dropped by this buffer so far, including this one.
    pub total_dropped: u64,
}
