use crate::models::frame::{DroppedFrameWarning, Frame};

/// Fixed-capacity circular buffer of captured frames.
///
/// Wrap in `Arc<parking_lot::Mutex<RingBuffer>>` for cross-thread access.
///
/// Overflow behavior: the oldest unread frame is overwritten and a
/// `DroppedFrameWarning` is returned. Pushing never blocks.
#[derive(Debug)]
pub struct RingBuffer {
    slots: Vec<Option<Frame>>,
    read_index: usize,
    available: usize,
    dropped: u64,
}

impl RingBuffer {
    /// Creates a buffer holding `capacity` frames. A capacity of zero is
    /// rounded up to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            read_index: 0,
            available: 0,
            dropped: 0,
        }
    }

    /// Append a frame, overwriting the oldest unread frame when full.
    pub fn push(&mut self, frame: Frame) -> Option<DroppedFrameWarning> {
        let capacity = self.capacity();
        let write_index = (self.read_index + self.available) % capacity;

        if self.available < capacity {
            self.slots[write_index] = Some(frame);
            self.available += 1;
            return None;
        }

        // Full: write_index == read_index, the oldest slot.
        let overwritten = self.slots[write_index].replace(frame);
        self.read_index = (self.read_index + 1) % capacity;
        self.dropped += 1;

        overwritten.map(|old| DroppedFrameWarning {
            dropped_sequence: old.sequence(),
            total_dropped: self.dropped,
        })
    }

    /// Remove and return all buffered frames, oldest first.
    pub fn drain(&mut self) -> Vec<Frame> {
        let capacity = self.capacity();
        let mut frames = Vec::with_capacity(self.available);
        for i in 0..self.available {
            if let Some(frame) = self.slots[(self.read_index + i) % capacity].take() {
                frames.push(frame);
            }
        }
        self.read_index = 0;
        self.available = 0;
        frames
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Frames overwritten since creation or the last `reset`.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Discard buffered frames and clear the drop counter.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.read_index = 0;
        self.available = 0;
        self.dropped = 0;
    }
}
