//! # audio-record-channel
//!
//! Bridge host for the `audio_record_channel` method channel.
//!
//! Provides:
//! - `ChannelHost`: answers method calls through an injected `CommandDispatcher`
//! - `MethodCall` / `MethodResult`: the JSON call/result envelope
//! - `ToneMicrophone`: synthetic `AudioDevice` producing a sine tone
//! - `LoggingObserver`: forwards session events to the log
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_record_core::{CommandDispatcher, SessionConfig, SessionManager};
//! use audio_record_channel::{ChannelHost, MethodCall, ToneConfig, ToneMicrophone};
//!
//! let mic = ToneMicrophone::new(ToneConfig::default())?;
//! let session = Arc::new(SessionManager::new(mic, SessionConfig::default())?);
//! let host = ChannelHost::new(Arc::new(CommandDispatcher::new(session)));
//! let response = host.handle(MethodCall::new("startRecording"));
//! ```

pub mod envelope;
pub mod error;
pub mod host;
pub mod observer;
pub mod tone;

/// Name of the method channel the UI layer calls into.
pub const CHANNEL_NAME: &str = "audio_record_channel";

pub use envelope::{MethodCall, MethodResponse, MethodResult};
pub use error::ChannelError;
pub use host::ChannelHost;
pub use observer::LoggingObserver;
pub use tone::{ToneConfig, ToneMicrophone};
