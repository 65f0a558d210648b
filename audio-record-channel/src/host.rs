use std::io::{BufRead, Write};
use std::sync::Arc;

use audio_record_core::{AudioDevice, CommandDispatcher};

use crate::envelope::{MethodCall, MethodResponse, MethodResult};
use crate::error::ChannelError;
use crate::CHANNEL_NAME;

/// Owns one named method channel and answers calls through an injected
/// dispatcher.
pub struct ChannelHost<D: AudioDevice> {
    name: String,
    dispatcher: Arc<CommandDispatcher<D>>,
}

impl<D: AudioDevice> ChannelHost<D> {
    /// Host the default `audio_record_channel`.
    pub fn new(dispatcher: Arc<CommandDispatcher<D>>) -> Self {
        Self::with_name(CHANNEL_NAME, dispatcher)
    }

    pub fn with_name(name: impl Into<String>, dispatcher: Arc<CommandDispatcher<D>>) -> Self {
        Self {
            name: name.into(),
            dispatcher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self, call: MethodCall) -> MethodResponse {
        if let Some(ref channel) = call.channel {
            if *channel != self.name {
                return MethodResponse {
                    id: call.id,
                    result: MethodResult::error(
                        "UNKNOWN_CHANNEL",
                        format!("no handler for channel {}", channel),
                    ),
                };
            }
        }

        log::debug!("{}: {} called", self.name, call.method);
        let dispatched = self.dispatcher.dispatch_named(&call.method, call.arguments);
        let result = MethodResult::from(dispatched);
        if let MethodResult::Error { ref code, ref message } = result {
            log::warn!("{}: {} failed [{}]: {}", self.name, call.method, code, message);
        }

        MethodResponse { id: call.id, result }
    }

    /// Decode one JSON call and answer it. Malformed input still gets a reply.
    pub fn handle_line(&self, line: &str) -> MethodResponse {
        match serde_json::from_str::<MethodCall>(line) {
            Ok(call) => self.handle(call),
            Err(e) => MethodResponse {
                id: None,
                result: MethodResult::error("MALFORMED_CALL", e.to_string()),
            },
        }
    }

    /// Serve newline-delimited JSON calls until `reader` reaches end of input.
    ///
    /// Writes one response line per non-blank input line and flushes after
    /// each. Returns the number of calls answered.
    pub fn serve<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
    ) -> Result<u64, ChannelError> {
        let mut answered = 0;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line);
            serde_json::to_writer(&mut writer, &response)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            answered += 1;
        }
        log::info!("{}: input closed after {} calls", self.name, answered);
        Ok(answered)
    }
}
