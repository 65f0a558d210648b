//! Dedicated capture thread: opens the device, reports the acquisition
//! result, then reads frames into the session's ring buffer until halted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Sender, SyncSender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::error::{DeviceError, RecordError};
use crate::models::frame::Frame;
use crate::models::session::SessionId;
use crate::processing::ring_buffer::RingBuffer;
use crate::traits::device::{AudioDevice, DeviceHandle, DeviceRead};
use crate::traits::observer::SessionObserver;

pub(crate) type Acquisition<H> = Result<Arc<H>, DeviceError>;

/// State shared between the session manager and one capture thread.
pub(crate) struct CaptureShared {
    pub(crate) session_id: SessionId,
    running: AtomicBool,
    abandoned: AtomicBool,
    frames_captured: AtomicU64,
    pub(crate) buffer: Mutex<RingBuffer>,
    capture_error: Mutex<Option<DeviceError>>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl CaptureShared {
    pub(crate) fn new(
        session_id: SessionId,
        ring_capacity: usize,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Self {
        Self {
            session_id,
            running: AtomicBool::new(true),
            abandoned: AtomicBool::new(false),
            frames_captured: AtomicU64::new(0),
            buffer: Mutex::new(RingBuffer::new(ring_capacity)),
            capture_error: Mutex::new(None),
            observer,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the capture loop to exit after its current read.
    pub(crate) fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Mark the acquisition as given up by `start()`. The capture thread then
    /// owns closing whatever handle it opens.
    pub(crate) fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
        self.halt();
    }

    fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub(crate) fn frames_captured(&self) -> u64 {
        self.frames_captured.load(Ordering::SeqCst)
    }

    pub(crate) fn capture_error(&self) -> Option<DeviceError> {
        self.capture_error.lock().clone()
    }

    fn record(&self, frame: Frame) {
        self.frames_captured.fetch_add(1, Ordering::SeqCst);
        let dropped = self.buffer.lock().push(frame);

        if let Some(warning) = dropped {
            log::debug!(
                "session {}: ring buffer full, dropped frame {} ({} dropped so far)",
                self.session_id,
                warning.dropped_sequence,
                warning.total_dropped
            );
            if let Some(ref observer) = self.observer {
                observer.on_dropped_frame(self.session_id, &warning);
            }
        }
    }

    fn fail(&self, error: DeviceError) {
        log::error!("session {}: device read failed: {}", self.session_id, error);
        if let Some(ref observer) = self.observer {
            observer.on_capture_error(self.session_id, &error);
        }
        *self.capture_error.lock() = Some(error);
    }
}

/// Spawn the capture thread for one session.
///
/// The thread sends exactly one acquisition result on `ready` and signals
/// `done` when it terminates.
pub(crate) fn spawn<D: AudioDevice>(
    device: Arc<Mutex<D>>,
    shared: Arc<CaptureShared>,
    ready: SyncSender<Acquisition<D::Handle>>,
    done: Sender<()>,
) -> Result<thread::JoinHandle<()>, RecordError> {
    thread::Builder::new()
        .name("audio-record-capture".into())
        .spawn(move || {
            capture_loop(&device, &shared, ready);
            let _ = done.send(());
        })
        .map_err(|e| RecordError::Spawn(e.to_string()))
}

fn capture_loop<D: AudioDevice>(
    device: &Mutex<D>,
    shared: &CaptureShared,
    ready: SyncSender<Acquisition<D::Handle>>,
) {
    let opened = device.lock().open();
    let handle = match opened {
        Ok(handle) => Arc::new(handle),
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // start() stopped listening: nobody else will ever close this handle.
    if ready.send(Ok(Arc::clone(&handle))).is_err() {
        log::debug!("session {}: acquisition abandoned, closing late handle", shared.session_id);
        handle.close();
        return;
    }
    drop(ready);

    let mut sequence = 0u64;
    while shared.is_running() {
        match handle.read() {
            Ok(DeviceRead::Chunk(bytes)) => {
                shared.record(Frame::new(sequence, bytes));
                sequence += 1;
            }
            Ok(DeviceRead::EndOfStream) => {
                log::info!("session {}: device reached end of stream", shared.session_id);
                break;
            }
            Err(e) => {
                shared.fail(e);
                break;
            }
        }
    }

    if shared.is_abandoned() {
        handle.close();
    }
}
