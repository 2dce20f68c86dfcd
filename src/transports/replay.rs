//! Replay transport for captured byte streams

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::config::ReplayConfig;
use crate::transport::Transport;
use crate::{LcdError, Result, TransportOp};

/// Feeds a recorded device stream back in fixed-size chunks.
///
/// Bytes written to the transport are counted instead of sent anywhere, so
/// tests can check that every chunk was acknowledged.
pub struct ReplayTransport {
    data: Vec<u8>,
    position: usize,
    chunk_size: usize,
    pacing: Option<std::time::Duration>,
    interval: Option<Interval>,
    written: Arc<AtomicU64>,
    closed: bool,
    name: String,
}

impl ReplayTransport {
    /// Load a capture file.
    pub async fn open<P: AsRef<Path>>(path: P, config: &ReplayConfig) -> Result<Self> {
        let path = path.as_ref();
        let data =
            tokio::fs::read(path).await.map_err(|e| LcdError::file_error(path.to_path_buf(), e))?;

        info!("Opened capture {}: {} bytes", path.display(), data.len());
        Ok(Self::from_bytes(data, config).with_name(path.display().to_string()))
    }

    /// Replay an in-memory capture.
    pub fn from_bytes(data: impl Into<Vec<u8>>, config: &ReplayConfig) -> Self {
        Self {
            data: data.into(),
            position: 0,
            chunk_size: config.chunk_size.max(1),
            pacing: config.interval(),
            interval: None,
            written: Arc::new(AtomicU64::new(0)),
            closed: false,
            name: "replay".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shared counter of bytes written back, readable after the transport
    /// has been handed to a driver.
    pub fn written_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.written)
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Total chunks this capture replays as.
    pub fn total_chunks(&self) -> usize {
        self.data.len().div_ceil(self.chunk_size)
    }
}

#[async_trait::async_trait]
impl Transport for ReplayTransport {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.closed {
            return Err(LcdError::transport_failed(TransportOp::Read, "replay is closed"));
        }
        if self.position >= self.data.len() {
            debug!("{}: reached end of capture", self.name);
            return Ok(None);
        }

        // Created lazily so construction does not need a runtime
        if let Some(period) = self.pacing {
            let ticker = self.interval.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;
        }

        let end = (self.position + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.position..end].to_vec();
        self.position = end;

        trace!("{}: chunk of {} bytes, {} remaining", self.name, chunk.len(), self.remaining());
        Ok(Some(chunk))
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(LcdError::transport_failed(TransportOp::Write, "replay is closed"));
        }
        self.written.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            debug!("{}: closed at byte {}/{}", self.name, self.position, self.data.len());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
