use thiserror::Error;

use audio_record_core::RecordError;

/// Errors raised while setting up or serving the channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid tone configuration: {0}")]
    InvalidToneConfig(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}
