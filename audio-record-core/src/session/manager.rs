use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::capture::{self, Acquisition, CaptureShared};
use crate::models::config::SessionConfig;
use crate::models::error::RecordError;
use crate::models::session::{
    RecordingSummary, SessionId, SessionSnapshot, StartedSession, StopOutcome,
};
use crate::models::state::SessionState;
use crate::traits::device::{AudioDevice, DeviceHandle};
use crate::traits::observer::SessionObserver;

/// Coordination between a `start()` waiting on the device and a `stop()`
/// that arrives meanwhile.
#[derive(Default)]
struct PendingStart {
    cancel_requested: AtomicBool,
    cancelled: AtomicBool,
}

/// Identity of the current session, readable by snapshots during any
/// non-idle state.
#[derive(Clone)]
struct SessionMeta {
    id: SessionId,
    started_at: DateTime<Utc>,
    started: Instant,
    shared: Arc<CaptureShared>,
}

/// Resources `stop()` must release.
struct CaptureControl<H> {
    handle: Arc<H>,
    done: Receiver<()>,
    thread: thread::JoinHandle<()>,
}

struct Inner<H> {
    state: SessionState,
    pending: Option<Arc<PendingStart>>,
    current: Option<SessionMeta>,
    control: Option<CaptureControl<H>>,
}

/// Single-session recording state machine.
///
/// All transitions (`start`, `stop`, `reset`) run under one transition lock,
/// so at most one executes at a time and at most one session is ever
/// non-idle. Observable state sits behind a second lock so `snapshot` never
/// waits on a transition.
///
/// ```text
/// [AudioDevice] ──open/read──→ [capture thread] ──push──→ [RingBuffer]
///                                                              │
///                                 stop() ── drain ─────────────┘
/// ```
pub struct SessionManager<D: AudioDevice> {
    device: Arc<Mutex<D>>,
    device_name: String,
    config: SessionConfig,
    transition: Mutex<()>,
    inner: Mutex<Inner<D::Handle>>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl<D: AudioDevice> SessionManager<D> {
    pub fn new(device: D, config: SessionConfig) -> Result<Self, RecordError> {
        config.validate().map_err(RecordError::InvalidConfig)?;
        Ok(Self {
            device_name: device.name(),
            device: Arc::new(Mutex::new(device)),
            config,
            transition: Mutex::new(()),
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                pending: None,
                current: None,
                control: None,
            }),
            observer: None,
        })
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observer = Some(observer);
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        let (frames_captured, frames_dropped, frames_buffered) = match inner.current {
            Some(ref meta) => {
                let buffer = meta.shared.buffer.lock();
                (meta.shared.frames_captured(), buffer.dropped_count(), buffer.len())
            }
            None => (0, 0, 0),
        };

        SessionSnapshot {
            state: inner.state.clone(),
            session_id: inner.current.as_ref().map(|m| m.id),
            started_at: inner.current.as_ref().map(|m| m.started_at),
            frames_captured,
            frames_dropped,
            frames_buffered,
        }
    }

    /// Acquire the device and begin recording. Transitions: idle → starting → recording.
    ///
    /// On acquisition failure or timeout the session moves to failed and
    /// stays there until `reset()`.
    pub fn start(&self) -> Result<StartedSession, RecordError> {
        // Fail fast without queueing behind an in-flight transition.
        self.check_startable()?;
        let _transition = self.transition.lock();
        self.check_startable()?;

        let pending = Arc::new(PendingStart::default());
        {
            let mut inner = self.inner.lock();
            inner.pending = Some(Arc::clone(&pending));
        }
        self.set_state(SessionState::Starting);

        let session_id = SessionId::new();
        let shared = Arc::new(CaptureShared::new(
            session_id,
            self.config.ring_capacity,
            self.observer.clone(),
        ));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (done_tx, done_rx) = mpsc::channel();

        let spawned = capture::spawn(
            Arc::clone(&self.device),
            Arc::clone(&shared),
            ready_tx,
            done_tx,
        );
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => return Err(self.fail_start(e)),
        };

        let handle = match self.await_acquisition(&ready_rx, &pending, &shared) {
            Ok(handle) => handle,
            Err(RecordError::Cancelled) => {
                pending.cancelled.store(true, Ordering::SeqCst);
                self.inner.lock().pending = None;
                self.set_state(SessionState::Idle);
                log::info!("start cancelled by stop request during acquisition");
                return Err(RecordError::Cancelled);
            }
            Err(e) => return Err(self.fail_start(e)),
        };

        let meta = SessionMeta {
            id: session_id,
            started_at: Utc::now(),
            started: Instant::now(),
            shared,
        };
        let started = StartedSession {
            session_id,
            started_at: meta.started_at,
        };
        {
            let mut inner = self.inner.lock();
            inner.pending = None;
            inner.current = Some(meta);
            inner.control = Some(CaptureControl {
                handle,
                done: done_rx,
                thread,
            });
        }
        self.set_state(SessionState::Recording);
        log::info!("session {} recording from {}", session_id, self.device_name);

        Ok(started)
    }

    /// Halt capture, release the device, and flush buffered frames.
    /// Transitions: recording → stopping → idle.
    ///
    /// A stop that arrives while the device is still being acquired cancels
    /// the acquisition if it has not completed yet; otherwise it waits for
    /// the start to finish and stops the new session.
    pub fn stop(&self) -> Result<StopOutcome, RecordError> {
        let pending = {
            let inner = self.inner.lock();
            match inner.state {
                SessionState::Starting => inner.pending.clone(),
                _ => None,
            }
        };
        if let Some(ref pending) = pending {
            log::info!("stop requested during acquisition");
            pending.cancel_requested.store(true, Ordering::SeqCst);
        }

        let _transition = self.transition.lock();

        if let Some(pending) = pending {
            if pending.cancelled.load(Ordering::SeqCst) {
                return Ok(StopOutcome::CancelledStart);
            }
        }

        let (meta, control) = {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Recording => {}
                SessionState::Failed(ref e) => {
                    return Err(RecordError::SessionFailed(e.to_string()))
                }
                _ => return Err(RecordError::NotActive),
            }
            match (inner.current.clone(), inner.control.take()) {
                (Some(meta), Some(control)) => (meta, control),
                _ => return Err(RecordError::NotActive),
            }
        };
        self.set_state(SessionState::Stopping);

        meta.shared.halt();
        let acknowledged = self.await_shutdown(&control.done);
        control.handle.close();
        if acknowledged {
            let _ = control.thread.join();
        } else {
            log::warn!(
                "session {}: capture thread unresponsive after {}ms, device force-released",
                meta.id,
                self.config.shutdown_timeout.as_millis()
            );
        }

        let flushed = meta.shared.buffer.lock().drain();
        if let Some(ref observer) = self.observer {
            observer.on_frames_flushed(meta.id, &flushed);
        }

        let frames_dropped = meta.shared.buffer.lock().dropped_count();
        let summary = RecordingSummary {
            session_id: meta.id,
            started_at: meta.started_at,
            duration: meta.started.elapsed(),
            frames_captured: meta.shared.frames_captured(),
            frames_dropped,
            frames_flushed: flushed.len() as u64,
            capture_error: meta.shared.capture_error().map(|e| e.to_string()),
        };

        self.inner.lock().current = None;
        self.set_state(SessionState::Idle);

        if !acknowledged {
            return Err(RecordError::ShutdownTimeout {
                timeout: self.config.shutdown_timeout,
                frames_captured: summary.frames_captured,
            });
        }

        log::info!(
            "session {} stopped: {} frames in {}ms ({} dropped)",
            summary.session_id,
            summary.frames_captured,
            summary.duration.as_millis(),
            summary.frames_dropped
        );
        Ok(StopOutcome::Completed(summary))
    }

    /// Clear a failed session. Transitions: failed → idle.
    ///
    /// Idempotent from idle. A live session must be stopped instead.
    pub fn reset(&self) -> Result<(), RecordError> {
        let _transition = self.transition.lock();
        let state = self.inner.lock().state.clone();
        match state {
            SessionState::Idle => Ok(()),
            SessionState::Failed(_) => {
                self.set_state(SessionState::Idle);
                log::info!("failed session reset to idle");
                Ok(())
            }
            _ => Err(RecordError::AlreadyActive),
        }
    }

    // --- Internal helpers ---

    fn check_startable(&self) -> Result<(), RecordError> {
        match self.inner.lock().state {
            SessionState::Idle => Ok(()),
            SessionState::Failed(ref e) => Err(RecordError::SessionFailed(e.to_string())),
            _ => Err(RecordError::AlreadyActive),
        }
    }

    fn set_state(&self, new_state: SessionState) {
        {
            let mut inner = self.inner.lock();
            inner.state = new_state.clone();
        }
        if let Some(ref observer) = self.observer {
            observer.on_state_changed(&new_state);
        }
    }

    fn fail_start(&self, error: RecordError) -> RecordError {
        log::error!("start failed: {}", error);
        self.inner.lock().pending = None;
        self.set_state(SessionState::Failed(error.clone()));
        error
    }

    /// Wait for the capture thread's acquisition result in `poll_interval`
    /// slices, honoring cancellation and `acquire_timeout`.
    fn await_acquisition(
        &self,
        ready: &Receiver<Acquisition<D::Handle>>,
        pending: &PendingStart,
        shared: &CaptureShared,
    ) -> Result<Arc<D::Handle>, RecordError> {
        let deadline = Instant::now() + self.config.acquire_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let slice = remaining.min(self.config.poll_interval);

            match ready.recv_timeout(slice) {
                Ok(Ok(handle)) => return Ok(handle),
                Ok(Err(e)) => return Err(RecordError::Acquisition(e)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RecordError::Spawn(
                        "capture thread exited before acquiring the device".into(),
                    ))
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if pending.cancel_requested.load(Ordering::SeqCst) {
                return settle_cancel(ready, shared);
            }
            if Instant::now() >= deadline {
                abandon_acquisition(ready, shared);
                return Err(RecordError::AcquisitionTimeout(self.config.acquire_timeout));
            }
        }
    }

    /// Returns false if the capture thread did not terminate within
    /// `shutdown_timeout`.
    fn await_shutdown(&self, done: &Receiver<()>) -> bool {
        match done.recv_timeout(self.config.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// Resolve a stop request that arrived during acquisition. A result already
/// delivered by the capture thread stands, and the queued stop applies to it.
fn settle_cancel<H: DeviceHandle>(
    ready: &Receiver<Acquisition<H>>,
    shared: &CaptureShared,
) -> Result<Arc<H>, RecordError> {
    match ready.try_recv() {
        Ok(Ok(handle)) => return Ok(handle),
        Ok(Err(e)) => return Err(RecordError::Acquisition(e)),
        Err(_) => {}
    }
    abandon_acquisition(ready, shared);
    Err(RecordError::Cancelled)
}

fn abandon_acquisition<H: DeviceHandle>(ready: &Receiver<Acquisition<H>>, shared: &CaptureShared) {
    shared.abandon();
    // The handle may have landed after the last receive.
    if let Ok(Ok(handle)) = ready.try_recv() {
        handle.close();
    }
}

impl<D: AudioDevice> Drop for SessionManager<D> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(control) = inner.control.take() {
            if let Some(ref meta) = inner.current {
                meta.shared.halt();
            }
            control.handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::error::DeviceError;
    use crate::test_support::{wait_until, RecordingObserver, ScriptedDevice, ScriptedHandle};

    fn fast_config() -> SessionConfig {
        SessionConfig {
            ring_capacity: 16,
            acquire_timeout: Duration::from_millis(500),
            shutdown_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(2),
        }
    }

    fn completed(outcome: StopOutcome) -> RecordingSummary {
        match outcome {
            StopOutcome::Completed(summary) => summary,
            StopOutcome::CancelledStart => panic!("expected a completed session"),
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SessionConfig {
            ring_capacity: 0,
            ..fast_config()
        };
        let result = SessionManager::new(ScriptedDevice::frames(0), config);
        assert!(matches!(result, Err(RecordError::InvalidConfig(_))));
    }

    #[test]
    fn start_then_stop_reports_every_frame() {
        let device = ScriptedDevice::frames(10);
        let counters = device.counters();
        let manager = SessionManager::new(device, fast_config()).unwrap();

        let started = manager.start().unwrap();
        assert!(manager.state().is_recording());
        assert!(wait_until(Duration::from_secs(2), || counters.produced() == 10));

        let summary = completed(manager.stop().unwrap());
        assert_eq!(summary.session_id, started.session_id);
        assert_eq!(summary.frames_captured, 10);
        assert_eq!(summary.frames_flushed, 10);
        assert_eq!(summary.frames_dropped, 0);
        assert!(summary.capture_error.is_none());
        assert!(manager.state().is_idle());
        assert_eq!(counters.closes(), 1);
    }

    #[test]
    fn frame_count_matches_device_output_under_overflow() {
        let device = ScriptedDevice::endless(Duration::from_micros(200));
        let counters = device.counters();
        let config = SessionConfig {
            ring_capacity: 4,
            ..fast_config()
        };
        let manager = SessionManager::new(device, config).unwrap();

        manager.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || counters.produced() >= 50));
        let summary = completed(manager.stop().unwrap());

        assert_eq!(summary.frames_captured, counters.produced());
        assert_eq!(summary.frames_flushed, 4);
        assert_eq!(summary.frames_dropped, summary.frames_captured - 4);
    }

    #[test]
    fn second_start_is_rejected_without_side_effects() {
        let device = ScriptedDevice::frames(3);
        let counters = device.counters();
        let manager = SessionManager::new(device, fast_config()).unwrap();

        let first = manager.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || manager.snapshot().frames_captured == 3));

        assert_eq!(manager.start(), Err(RecordError::AlreadyActive));
        let snapshot = manager.snapshot();
        assert!(snapshot.state.is_recording());
        assert_eq!(snapshot.session_id, Some(first.session_id));
        assert_eq!(snapshot.frames_captured, 3);
        assert_eq!(counters.opens(), 1);
    }

    #[test]
    fn stop_when_idle_is_rejected() {
        let manager = SessionManager::new(ScriptedDevice::frames(0), fast_config()).unwrap();
        assert_eq!(manager.stop(), Err(RecordError::NotActive));
        assert_eq!(manager.stop(), Err(RecordError::NotActive));
        assert!(manager.state().is_idle());
        assert!(manager.snapshot().session_id.is_none());
    }

    #[test]
    fn acquisition_failure_requires_reset() {
        let device = ScriptedDevice::failing(DeviceError::PermissionDenied);
        let manager = SessionManager::new(device, fast_config()).unwrap();

        let err = manager.start().unwrap_err();
        assert_eq!(err, RecordError::Acquisition(DeviceError::PermissionDenied));
        assert!(manager.state().is_failed());

        assert!(matches!(manager.start(), Err(RecordError::SessionFailed(_))));
        assert!(matches!(manager.stop(), Err(RecordError::SessionFailed(_))));
        assert!(manager.state().is_failed());

        manager.reset().unwrap();
        assert!(manager.state().is_idle());
    }

    #[test]
    fn slow_acquisition_times_out_and_closes_late_handle() {
        let device = ScriptedDevice::frames(1).with_open_delay(Duration::from_millis(150));
        let counters = device.counters();
        let config = SessionConfig {
            acquire_timeout: Duration::from_millis(30),
            ..fast_config()
        };
        let manager = SessionManager::new(device, config).unwrap();

        let err = manager.start().unwrap_err();
        assert_eq!(err, RecordError::AcquisitionTimeout(Duration::from_millis(30)));
        assert!(manager.state().is_failed());

        assert!(wait_until(Duration::from_secs(2), || counters.closes() == 1));
        assert_eq!(counters.produced(), 0);
    }

    #[test]
    fn stop_during_acquisition_cancels_start() {
        let device = ScriptedDevice::frames(1).with_open_delay(Duration::from_millis(200));
        let counters = device.counters();
        let manager = Arc::new(SessionManager::new(device, fast_config()).unwrap());

        let starter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.start())
        };
        assert!(wait_until(Duration::from_secs(2), || manager.state() == SessionState::Starting));

        assert_eq!(manager.stop(), Ok(StopOutcome::CancelledStart));
        assert_eq!(starter.join().unwrap(), Err(RecordError::Cancelled));
        assert!(manager.state().is_idle());
        assert!(wait_until(Duration::from_secs(2), || counters.closes() == 1));
    }

    #[test]
    fn stop_during_acquisition_waits_for_completed_open() {
        // The open finishes inside one receive slice, so acquisition
        // completes before the pending stop is looked at.
        let device = ScriptedDevice::frames(2).with_open_delay(Duration::from_millis(50));
        let counters = device.counters();
        let config = SessionConfig {
            acquire_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(200),
            ..fast_config()
        };
        let manager = Arc::new(SessionManager::new(device, config).unwrap());

        let starter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.start())
        };
        assert!(wait_until(Duration::from_secs(2), || manager.state() == SessionState::Starting));

        let summary = completed(manager.stop().unwrap());
        let started = starter.join().unwrap().unwrap();
        assert_eq!(summary.session_id, started.session_id);
        assert_eq!(summary.frames_captured, counters.produced());
        assert!(manager.state().is_idle());
        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.closes(), 1);
    }

    #[test]
    fn cancel_keeps_acquisition_that_already_completed() {
        let mut device = ScriptedDevice::frames(0);
        let counters = device.counters();
        let shared = CaptureShared::new(SessionId::new(), 4, None);
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        assert!(ready_tx.send(Ok(Arc::new(device.open().unwrap()))).is_ok());

        let handle = settle_cancel(&ready_rx, &shared).unwrap();
        assert!(shared.is_running());
        assert_eq!(counters.closes(), 0);

        handle.close();
        assert_eq!(counters.closes(), 1);
    }

    #[test]
    fn cancel_before_acquisition_abandons_capture() {
        let shared = CaptureShared::new(SessionId::new(), 4, None);
        let (_ready_tx, ready_rx) = mpsc::sync_channel::<Acquisition<ScriptedHandle>>(1);

        let result = settle_cancel(&ready_rx, &shared).map(|_| ());
        assert_eq!(result, Err(RecordError::Cancelled));
        assert!(!shared.is_running());
    }

    #[test]
    fn blocked_read_forces_release_on_stop() {
        let device = ScriptedDevice::blocking_after(2);
        let counters = device.counters();
        let manager = SessionManager::new(device, fast_config()).unwrap();

        manager.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || counters.produced() == 2));

        let err = manager.stop().unwrap_err();
        assert_eq!(
            err,
            RecordError::ShutdownTimeout {
                timeout: Duration::from_millis(200),
                frames_captured: 2,
            }
        );
        assert!(manager.state().is_idle());
        assert!(counters.closes() >= 1);

        // Released device can be reacquired.
        manager.start().unwrap();
        assert_eq!(counters.opens(), 2);
    }

    #[test]
    fn read_error_is_reported_in_summary() {
        let device = ScriptedDevice::failing_after(3, DeviceError::Io("bus reset".into()));
        let counters = device.counters();
        let observer = Arc::new(RecordingObserver::default());
        let mut manager = SessionManager::new(device, fast_config()).unwrap();
        manager.set_observer(observer.clone());

        manager.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || observer.capture_errors() == 1));

        let summary = completed(manager.stop().unwrap());
        assert_eq!(summary.frames_captured, 3);
        assert_eq!(summary.capture_error.as_deref(), Some("device i/o error: bus reset"));
        assert_eq!(counters.closes(), 1);
    }

    #[test]
    fn observer_sees_transitions_and_flush() {
        let observer = Arc::new(RecordingObserver::default());
        let device = ScriptedDevice::frames(5);
        let counters = device.counters();
        let config = SessionConfig {
            ring_capacity: 3,
            ..fast_config()
        };
        let mut manager = SessionManager::new(device, config).unwrap();
        manager.set_observer(observer.clone());

        manager.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || counters.produced() == 5));
        manager.stop().unwrap();

        assert_eq!(observer.states(), vec!["starting", "recording", "stopping", "idle"]);
        assert_eq!(observer.flushed_sequences(), vec![2, 3, 4]);
        assert_eq!(observer.dropped(), 2);
    }

    #[test]
    fn concurrent_starts_admit_one_session() {
        let device = ScriptedDevice::endless(Duration::from_millis(1));
        let counters = device.counters();
        let manager = Arc::new(SessionManager::new(device, fast_config()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || manager.start())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == RecordError::AlreadyActive));
        assert_eq!(counters.opens(), 1);

        completed(manager.stop().unwrap());
    }

    #[test]
    fn reset_rejects_live_session() {
        let manager = SessionManager::new(ScriptedDevice::frames(1), fast_config()).unwrap();
        manager.reset().unwrap();

        manager.start().unwrap();
        assert_eq!(manager.reset(), Err(RecordError::AlreadyActive));
        assert!(manager.state().is_recording());
        completed(manager.stop().unwrap());
    }

    #[test]
    fn sessions_get_fresh_identifiers() {
        let manager = SessionManager::new(ScriptedDevice::frames(0), fast_config()).unwrap();
        assert_eq!(manager.device_name(), "scripted");
        let first = manager.start().unwrap();
        completed(manager.stop().unwrap());
        let second = manager.start().unwrap();
        assert_ne!(first.session_id, second.session_id);
        completed(manager.stop().unwrap());
    }
}
