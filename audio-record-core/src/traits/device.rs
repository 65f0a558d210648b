use crate::models::error::DeviceError;

/// Result of a single device read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRead {
    /// One chunk of raw audio bytes.
    Chunk(Vec<u8>),
    /// The device will produce no further data.
    EndOfStream,
}

/// Factory for platform audio input handles.
///
/// `open` is called once per session, on the capture thread. It may block;
/// the session manager bounds how long it waits for the result.
pub trait AudioDevice: Send + 'static {
    type Handle: DeviceHandle;

    fn open(&mut self) -> Result<Self::Handle, DeviceError>;

    /// Human-readable device name for logs.
    fn name(&self) -> String {
        "audio input".into()
    }
}

/// An open audio input resource.
///
/// The handle is shared between the capture thread (which reads) and the
/// session manager (which closes), so both operations take `&self`.
pub trait DeviceHandle: Send + Sync + 'static {
    /// Read the next chunk. May block until data is available.
    fn read(&self) -> Result<DeviceRead, DeviceError>;

    /// Release the device. Must be idempotent, and should make a pending
    /// `read` return where the platform allows it.
    fn close(&self);
}
