//! Transport over any tokio reader/writer pair

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::transport::Transport;
use crate::{LcdError, Result, TransportOp};

#[cfg(unix)]
use {
    super::serial::SerialPort,
    crate::config::SerialConfig,
    std::path::Path,
    tokio::io::{ReadHalf, WriteHalf},
    tracing::info,
};

/// Read buffer used when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// A serial device node.
#[cfg(unix)]
pub type DeviceTransport = IoTransport<ReadHalf<SerialPort>, WriteHalf<SerialPort>>;

/// Wraps an async reader and writer.
///
/// Works with serial ports, pipes, sockets and `tokio::io::duplex` pairs
/// alike. Each read returns whatever the reader produced, up to the buffer
/// size. Writes are queued to a writer task, so a peer that stops draining
/// its input never holds up reading.
pub struct IoTransport<R, W> {
    reader: Option<R>,
    outgoing: Outgoing<W>,
    buffer: Vec<u8>,
    name: String,
}

enum Outgoing<W> {
    /// Nothing written yet
    Idle(W),
    /// Owned by the writer task
    Queued { queue: mpsc::UnboundedSender<Vec<u8>>, task: JoinHandle<io::Result<()>> },
    Closed,
}

impl<R, W> IoTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W, buffer_size: usize) -> Self {
        Self {
            reader: Some(reader),
            outgoing: Outgoing::Idle(writer),
            buffer: vec![0; buffer_size.max(1)],
            name: "io".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer = vec![0; buffer_size.max(1)];
        self
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none() && matches!(self.outgoing, Outgoing::Closed)
    }

    fn spawn_writer(mut writer: W, name: String) -> Outgoing<W> {
        let (queue, mut pending) = mpsc::unbounded_channel::<Vec<u8>>();

        let task = tokio::spawn(async move {
            let result = async {
                while let Some(bytes) = pending.recv().await {
                    writer.write_all(&bytes).await?;
                    writer.flush().await?;
                }
                writer.shutdown().await
            }
            .await;

            match &result {
                Ok(()) => trace!("{}: writer finished", name),
                Err(e) => warn!("{}: write failed: {}", name, e),
            }
            result
        });

        Outgoing::Queued { queue, task }
    }

    /// Error to report once the writer task has stopped.
    async fn writer_failure(&mut self) -> LcdError {
        let Outgoing::Queued { task, .. } = std::mem::replace(&mut self.outgoing, Outgoing::Closed)
        else {
            return LcdError::transport_failed(TransportOp::Write, "transport is closed");
        };

        match task.await {
            Ok(Err(e)) => LcdError::transport_io(TransportOp::Write, e),
            Ok(Ok(())) => LcdError::transport_failed(TransportOp::Write, "writer stopped"),
            Err(e) => LcdError::transport_failed(TransportOp::Write, e.to_string()),
        }
    }
}

/// Open a serial device node for reading and writing.
///
/// Terminals are switched to raw mode with the configured speed, framing
/// and flow control. Must be called from within a tokio runtime.
#[cfg(unix)]
pub async fn open_device<P: AsRef<Path>>(path: P, serial: &SerialConfig) -> Result<DeviceTransport> {
    let path = path.as_ref();
    serial.validate()?;

    let port =
        SerialPort::open(path, serial).map_err(|e| LcdError::transport_io(TransportOp::Open, e))?;

    info!(
        device = %path.display(),
        baud_rate = serial.baud_rate,
        data_bits = serial.data_bits,
        stop_bits = serial.stop_bits,
        parity = ?serial.parity,
        flow_control = ?serial.flow_control,
        "Opened serial device"
    );

    let (reader, writer) = tokio::io::split(port);
    Ok(IoTransport::new(reader, writer, DEFAULT_BUFFER_SIZE).with_name(path.display().to_string()))
}

#[async_trait::async_trait]
impl<R, W> Transport for IoTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(LcdError::transport_failed(TransportOp::Read, "transport is closed"));
        };

        let count = reader
            .read(&mut self.buffer)
            .await
            .map_err(|e| LcdError::transport_io(TransportOp::Read, e))?;

        if count == 0 {
            debug!("{}: end of stream", self.name);
            return Ok(None);
        }

        trace!("{}: read {} bytes", self.name, count);
        Ok(Some(self.buffer[..count].to_vec()))
    }

    /// Queues `bytes` and returns. A failure of an earlier write is
    /// reported here.
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if matches!(self.outgoing, Outgoing::Idle(_)) {
            if let Outgoing::Idle(writer) = std::mem::replace(&mut self.outgoing, Outgoing::Closed) {
                self.outgoing = Self::spawn_writer(writer, self.name.clone());
            }
        }

        let sent = match &self.outgoing {
            Outgoing::Queued { queue, .. } => queue.send(bytes.to_vec()).is_ok(),
            Outgoing::Idle(_) | Outgoing::Closed => {
                return Err(LcdError::transport_failed(TransportOp::Write, "transport is closed"));
            }
        };

        if sent { Ok(()) } else { Err(self.writer_failure().await) }
    }

    /// Stops reading at once. Queued bytes are still written in the
    /// background; closing does not wait for them.
    async fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        self.reader = None;
        let result = match std::mem::replace(&mut self.outgoing, Outgoing::Closed) {
            Outgoing::Idle(mut writer) => {
                writer.shutdown().await.map_err(|e| LcdError::transport_io(TransportOp::Close, e))
            }
            // Dropping the queue lets the writer task drain and shut down
            Outgoing::Queued { .. } | Outgoing::Closed => Ok(()),
        };

        match &result {
            Ok(()) => debug!("{}: closed", self.name),
            Err(e) => warn!("{}: error while closing: {}", self.name, e),
        }
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf, duplex};

    fn pair() -> (IoTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>, DuplexStream) {
        let (host, device) = duplex(64);
        let (reader, writer) = tokio::io::split(host);
        (IoTransport::new(reader, writer, 16).with_name("test"), device)
    }

    #[tokio::test]
    async fn reads_chunks_and_writes_back() {
        let (mut transport, mut device) = pair();

        device.write_all(b"#L\x0e\x00").await.unwrap();
        let chunk = transport.read_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, b"#L\x0e\x00");

        transport.write_bytes(&[0x07]).await.unwrap();
        let mut ack = [0u8; 1];
        device.read_exact(&mut ack).await.unwrap();
        assert_eq!(ack, [0x07]);
    }

    #[tokio::test]
    async fn chunks_are_bounded_by_buffer_size() {
        let (mut transport, mut device) = pair();
        device.write_all(&[1u8; 40]).await.unwrap();

        let first = transport.read_chunk().await.unwrap().unwrap();
        assert_eq!(first.len(), 16);
    }

    #[tokio::test]
    async fn dropped_peer_ends_stream() {
        let (mut transport, device) = pair();
        drop(device);
        assert!(transport.read_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let (mut transport, _device) = pair();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_closed());

        let err = transport.read_chunk().await.unwrap_err();
        assert!(matches!(err, LcdError::Transport { op: TransportOp::Read, .. }));
        assert!(transport.write_bytes(&[0x07]).await.is_err());
    }

    #[tokio::test]
    async fn stalled_peer_does_not_hold_up_writes() {
        let (mut transport, _device) = pair();

        // Far more than the 64-byte pipe holds, and nobody reads
        for _ in 0..500 {
            tokio::time::timeout(Duration::from_secs(1), transport.write_bytes(&[0x07]))
                .await
                .expect("write should only queue")
                .unwrap();
        }
        tokio::time::timeout(Duration::from_secs(1), transport.close())
            .await
            .expect("close should not wait for the peer")
            .unwrap();
    }

    #[tokio::test]
    async fn failed_write_is_reported_by_a_later_one() {
        let (mut transport, device) = pair();
        drop(device);
        transport.write_bytes(&[0x07]).await.unwrap();

        let err = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match transport.write_bytes(&[0x07]).await {
                    Ok(()) => tokio::task::yield_now().await,
                    Err(e) => break e,
                }
            }
        })
        .await
        .expect("writer failure should surface");

        assert!(matches!(err, LcdError::Transport { op: TransportOp::Write, .. }));
        assert!(err.is_fatal());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_device_is_no_device_found() {
        use crate::SessionFailure;

        let err = open_device("/dev/lcdscope-does-not-exist", &SerialConfig::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_fatal());
        assert_eq!(SessionFailure::classify(&err, false), SessionFailure::NoDeviceFound);
    }
}
