use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use audio_record_channel::{ChannelError, ChannelHost, LoggingObserver, ToneConfig, ToneMicrophone};
use audio_record_core::{CommandDispatcher, SessionConfig, SessionManager};

/// Serve the audio_record_channel over newline-delimited JSON on stdin/stdout.
#[derive(Parser)]
#[command(name = "audio-record-channel")]
#[command(about = "Audio recording method channel backed by a synthetic tone microphone")]
struct Args {
    /// Ring buffer capacity in frames
    #[arg(long, default_value = "256")]
    ring_capacity: usize,

    /// Device acquisition timeout in milliseconds
    #[arg(long, default_value = "2000")]
    acquire_timeout_ms: u64,

    /// Capture shutdown timeout in milliseconds
    #[arg(long, default_value = "1000")]
    shutdown_timeout_ms: u64,

    /// Sample rate of the tone microphone in Hz
    #[arg(long, default_value = "16000")]
    sample_rate: u32,

    /// Frame duration in milliseconds
    #[arg(long, default_value = "20")]
    frame_ms: u32,

    /// Tone frequency in Hz
    #[arg(long, default_value = "440")]
    tone_hz: f32,

    /// Stop producing audio after this many frames
    #[arg(long)]
    frame_limit: Option<u64>,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ring_capacity: self.ring_capacity,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
            ..Default::default()
        }
    }

    fn tone_config(&self) -> ToneConfig {
        ToneConfig {
            sample_rate: self.sample_rate,
            frame_ms: self.frame_ms,
            tone_hz: self.tone_hz,
            frame_limit: self.frame_limit,
            ..Default::default()
        }
    }
}

fn run(args: Args) -> Result<(), ChannelError> {
    let mic = ToneMicrophone::new(args.tone_config())?;
    let mut session = SessionManager::new(mic, args.session_config())?;
    session.set_observer(Arc::new(LoggingObserver));

    let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(session)));
    let host = ChannelHost::new(dispatcher);
    log::info!("serving {} on stdin/stdout", host.name());

    let stdin = io::stdin();
    let stdout = io::stdout();
    host.serve(stdin.lock(), stdout.lock())?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("audio-record-channel: {}", e);
            ExitCode::FAILURE
        }
    }
}
