//! Transport trait for byte links to the device

use crate::Result;

/// A bidirectional byte link to the microcontroller.
///
/// Transports hand out raw chunks exactly as they arrive; framing is the
/// decoder's job. The read loop owns the transport and calls these methods
/// from a single task.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next chunk of bytes.
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - Data received (never empty)
    /// - `Ok(None)` - End of stream
    /// - `Err(e)` - The link failed
    ///
    /// Must be cancel safe: dropping the future loses no data that a later
    /// call would have returned.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Send bytes to the device.
    ///
    /// Must not wait for the device to take them: the read loop calls this
    /// for every acknowledgement between reads. Implementations that can
    /// stall queue the bytes and report a failed write on a later call.
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Release the link. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &str;
}
