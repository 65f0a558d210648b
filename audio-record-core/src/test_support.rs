//! Scripted device and observer used by the session and dispatch tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::error::DeviceError;
use crate::models::frame::{DroppedFrameWarning, Frame};
use crate::models::session::SessionId;
use crate::models::state::SessionState;
use crate::traits::device::{AudioDevice, DeviceHandle, DeviceRead};
use crate::traits::observer::SessionObserver;

/// Poll `condition` every millisecond until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[derive(Clone)]
enum ReadScript {
    /// Emit this many frames immediately, then end of stream.
    Frames(u64),
    /// Emit a frame every interval, forever.
    Endless(Duration),
    /// Emit this many frames, then block until the handle is closed.
    BlockAfter(u64),
    /// Emit this many frames, then fail.
    FailAfter(u64, DeviceError),
}

/// Counters observable after the device moved into a session manager.
#[derive(Clone, Default)]
pub(crate) struct DeviceCounters {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    produced: Arc<AtomicU64>,
}

impl DeviceCounters {
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Handles that transitioned to closed (repeated closes count once).
    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Frames returned by all handles' reads.
    pub(crate) fn produced(&self) -> u64 {
        self.produced.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedDevice {
    open_error: Option<DeviceError>,
    open_delay: Duration,
    script: ReadScript,
    counters: DeviceCounters,
}

impl ScriptedDevice {
    fn with_script(script: ReadScript) -> Self {
        Self {
            open_error: None,
            open_delay: Duration::ZERO,
            script,
            counters: DeviceCounters::default(),
        }
    }

    pub(crate) fn frames(count: u64) -> Self {
        Self::with_script(ReadScript::Frames(count))
    }

    pub(crate) fn endless(interval: Duration) -> Self {
        Self::with_script(ReadScript::Endless(interval))
    }

    pub(crate) fn blocking_after(count: u64) -> Self {
        Self::with_script(ReadScript::BlockAfter(count))
    }

    pub(crate) fn failing_after(count: u64, error: DeviceError) -> Self {
        Self::with_script(ReadScript::FailAfter(count, error))
    }

    pub(crate) fn failing(error: DeviceError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::frames(0)
        }
    }

    pub(crate) fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub(crate) fn counters(&self) -> DeviceCounters {
        self.counters.clone()
    }
}

impl AudioDevice for ScriptedDevice {
    type Handle = ScriptedHandle;

    fn open(&mut self) -> Result<ScriptedHandle, DeviceError> {
        if !self.open_delay.is_zero() {
            thread::sleep(self.open_delay);
        }
        if let Some(ref e) = self.open_error {
            return Err(e.clone());
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedHandle {
            script: self.script.clone(),
            emitted: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            counters: self.counters.clone(),
        })
    }

    fn name(&self) -> String {
        "scripted".into()
    }
}

pub(crate) struct ScriptedHandle {
    script: ReadScript,
    emitted: AtomicU64,
    closed: AtomicBool,
    counters: DeviceCounters,
}

impl ScriptedHandle {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self) -> Result<DeviceRead, DeviceError> {
        let n = self.emitted.fetch_add(1, Ordering::SeqCst);
        self.counters.produced.fetch_add(1, Ordering::SeqCst);
        Ok(DeviceRead::Chunk(vec![n as u8; 8]))
    }
}

impl DeviceHandle for ScriptedHandle {
    fn read(&self) -> Result<DeviceRead, DeviceError> {
        if self.is_closed() {
            return Ok(DeviceRead::EndOfStream);
        }
        let emitted = self.emitted.load(Ordering::SeqCst);

        match self.script {
            ReadScript::Frames(limit) if emitted >= limit => Ok(DeviceRead::EndOfStream),
            ReadScript::Frames(_) => self.emit(),
            ReadScript::Endless(interval) => {
                thread::sleep(interval);
                self.emit()
            }
            ReadScript::BlockAfter(limit) if emitted >= limit => {
                while !self.is_closed() {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(DeviceRead::EndOfStream)
            }
            ReadScript::BlockAfter(_) => self.emit(),
            ReadScript::FailAfter(limit, ref e) if emitted >= limit => Err(e.clone()),
            ReadScript::FailAfter(..) => self.emit(),
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Observer that records everything it is told.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    states: Mutex<Vec<&'static str>>,
    flushed: Mutex<Vec<u64>>,
    dropped: AtomicUsize,
    capture_errors: AtomicUsize,
}

impl RecordingObserver {
    pub(crate) fn states(&self) -> Vec<&'static str> {
        self.states.lock().clone()
    }

    pub(crate) fn flushed_sequences(&self) -> Vec<u64> {
        self.flushed.lock().clone()
    }

    pub(crate) fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub(crate) fn capture_errors(&self) -> usize {
        self.capture_errors.load(Ordering::SeqCst)
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_changed(&self, state: &SessionState) {
        self.states.lock().push(state.name());
    }

    fn on_dropped_frame(&self, _session: SessionId, _warning: &DroppedFrameWarning) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }

    fn on_frames_flushed(&self, _session: SessionId, frames: &[Frame]) {
        self.flushed.lock().extend(frames.iter().map(Frame::sequence));
    }

    fn on_capture_error(&self, _session: SessionId, _error: &DeviceError) {
        self.capture_errors.fetch_add(1, Ordering::SeqCst);
    }
}
