//! Test utilities for building device byte streams
//!
//! Shared by unit tests, integration tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::FrameEncoder;
use crate::transport::Transport;
use crate::types::{CommandPayload, NumberFormat, Severity, TextMode};
use crate::{LcdError, Result, TransportOp};

/// Concatenate the frames for `payloads`.
///
/// # Panics
///
/// If a payload cannot be framed.
pub fn encode_all(payloads: &[CommandPayload]) -> Vec<u8> {
    let mut stream = Vec::new();
    for payload in payloads {
        match FrameEncoder::encode_payload(payload) {
            Ok(frame) => stream.extend(frame),
            Err(e) => panic!("cannot frame {:?}: {}", payload, e),
        }
    }
    stream
}

/// A boot screen as a typical firmware draws it.
pub fn boot_screen() -> Vec<CommandPayload> {
    vec![
        CommandPayload::DebugText { text: "lcd init".into(), severity: Severity::Ok },
        CommandPayload::DisplayClearRow { row: 0 },
        CommandPayload::DisplayWriteTextAt {
            text: " STATUS ".into(),
            row: 0,
            column: 6,
            mode: TextMode::Inverse,
        },
        CommandPayload::DisplaySetCursor { row: Some(2), column: Some(0) },
        CommandPayload::DisplayWriteChar { text: "temp: 21C".into(), mode: TextMode::Normal },
        CommandPayload::DisplaySetCursor { row: Some(3), column: None },
        CommandPayload::DisplayWriteChar { text: ">".into(), mode: TextMode::Inverse },
        CommandPayload::DisplayWriteColumnData { bytes: vec![0x7e] },
        CommandPayload::DebugNumber { label: "adc".into(), value: 0x3ff, format: NumberFormat::U16Hex },
        CommandPayload::DisplayWriteTextAt {
            text: "ok".into(),
            row: 7,
            column: 19,
            mode: TextMode::Normal,
        },
    ]
}

/// `repeats` copies of the boot screen, framed.
pub fn boot_stream(repeats: usize) -> Vec<u8> {
    encode_all(&boot_screen()).repeat(repeats)
}

/// Transport that plays back a fixed script of read results.
///
/// Written bytes and `close` calls are recorded in shared handles so they
/// can be inspected after the transport moved into a driver.
pub struct ScriptedTransport {
    script: VecDeque<Result<Vec<u8>>>,
    hold_open: bool,
    closed: bool,
    written: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Reads return `chunks` in order, then end of stream.
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            script: chunks.into_iter().map(Ok).collect(),
            hold_open: false,
            closed: false,
            written: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// After the script, wait forever instead of ending.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Append a read failure to the script.
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.script.push_back(Err(LcdError::transport_io(
            TransportOp::Read,
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, reason.to_string()),
        )));
        self
    }

    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }

    /// Number of times `close` actually released the transport.
    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.script.pop_front() {
            Some(step) => step.map(Some),
            None if self.hold_open => futures::future::pending().await,
            None => Ok(None),
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match self.written.lock() {
            Ok(mut written) => written.extend_from_slice(bytes),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(bytes),
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
