//! Synthetic microphone that records a sine tone at real-time pace.
//!
//! Stands in for a platform capture backend so the channel can be exercised
//! end to end without audio hardware.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use audio_record_core::{AudioDevice, DeviceError, DeviceHandle, DeviceRead};

use crate::error::ChannelError;

/// Configuration for the synthetic tone microphone.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneConfig {
    /// Sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Duration of one frame in milliseconds (default: 20).
    pub frame_ms: u32,

    /// Tone frequency in Hz (default: 440).
    pub tone_hz: f32,

    /// Peak amplitude in (0, 1] (default: 0.25).
    pub amplitude: f32,

    /// Frames to produce before end of stream (None = unlimited).
    pub frame_limit: Option<u64>,
}

impl ToneConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.frame_ms == 0 {
            return Err("frame duration must be positive".into());
        }
        if self.samples_per_frame() == 0 {
            return Err(format!(
                "{}ms at {}Hz is shorter than one sample",
                self.frame_ms, self.sample_rate
            ));
        }
        if !(self.tone_hz > 0.0 && self.tone_hz < self.sample_rate as f32 / 2.0) {
            return Err(format!(
                "tone {}Hz must be below Nyquist ({}Hz)",
                self.tone_hz,
                self.sample_rate / 2
            ));
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(format!("amplitude {} must be in (0, 1]", self.amplitude));
        }
        Ok(())
    }

    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.frame_ms as u64 / 1000) as usize
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_ms as u64)
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_ms: 20,
            tone_hz: 440.0,
            amplitude: 0.25,
            frame_limit: None,
        }
    }
}

/// Tone generator implementing the `AudioDevice` boundary.
pub struct ToneMicrophone {
    config: ToneConfig,
}

impl ToneMicrophone {
    pub fn new(config: ToneConfig) -> Result<Self, ChannelError> {
        config.validate().map_err(ChannelError::InvalidToneConfig)?;
        Ok(Self { config })
    }
}

impl AudioDevice for ToneMicrophone {
    type Handle = ToneHandle;

    fn open(&mut self) -> Result<ToneHandle, DeviceError> {
        log::debug!(
            "opening tone microphone: {}Hz tone, {}Hz, {}ms frames",
            self.config.tone_hz,
            self.config.sample_rate,
            self.config.frame_ms
        );
        Ok(ToneHandle {
            config: self.config.clone(),
            cursor: Mutex::new(ToneCursor {
                phase: 0.0,
                emitted: 0,
                next_frame_at: Instant::now(),
            }),
            closed: AtomicBool::new(false),
        })
    }

    fn name(&self) -> String {
        format!("tone {}Hz", self.config.tone_hz)
    }
}

struct ToneCursor {
    phase: f64,
    emitted: u64,
    next_frame_at: Instant,
}

/// An open tone stream. Reads block until the next frame is due.
pub struct ToneHandle {
    config: ToneConfig,
    cursor: Mutex<ToneCursor>,
    closed: AtomicBool,
}

impl DeviceHandle for ToneHandle {
    fn read(&self) -> Result<DeviceRead, DeviceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(DeviceRead::EndOfStream);
        }

        let mut cursor = self.cursor.lock();
        if self.config.frame_limit.is_some_and(|limit| cursor.emitted >= limit) {
            return Ok(DeviceRead::EndOfStream);
        }

        let wait = cursor.next_frame_at.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        if self.closed.load(Ordering::SeqCst) {
            return Ok(DeviceRead::EndOfStream);
        }

        let step = TAU * self.config.tone_hz as f64 / self.config.sample_rate as f64;
        let samples = synthesize(
            &mut cursor.phase,
            step,
            self.config.amplitude,
            self.config.samples_per_frame(),
        );
        cursor.emitted += 1;
        cursor.next_frame_at += self.config.frame_duration();

        Ok(DeviceRead::Chunk(to_pcm16(&samples)))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::debug!("tone microphone closed");
        }
    }
}

/// Generate `count` sine samples, advancing `phase` by `step` radians each.
pub fn synthesize(phase: &mut f64, step: f64, amplitude: f32, count: usize) -> Vec<f32> {
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        samples.push(phase.sin() as f32 * amplitude);
        *phase = (*phase + step) % TAU;
    }
    samples
}

/// Convert Float32 samples to 16-bit signed little-endian PCM.
pub fn to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let int16_value = (clamped * i16::MAX as f32) as i16;
        data.extend_from_slice(&int16_value.to_le_bytes());
    }
    data
}
