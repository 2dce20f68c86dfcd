//! Driver spawns and manages the transport read loop

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::config::MonitorConfig;
use crate::display::DisplayEngine;
use crate::protocol::FrameDecoder;
use crate::session::{SessionEnd, SessionEvent, SessionStatus};
use crate::transport::Transport;
use crate::types::{Command, CommandPayload, DisplaySnapshot, Severity};
use crate::{FramingError, LcdError, Result, SessionFailure};

/// Requests from a session handle to its read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverControl {
    /// Reset the display and command counter
    Reset,
}

/// Result of spawning the read loop
pub struct DriverChannels {
    /// Latest display snapshot, updated after every mutation
    pub display: watch::Receiver<Arc<DisplaySnapshot>>,
    /// Running / ended state of the session
    pub status: watch::Receiver<SessionStatus>,
    /// Per-frame events, subscribed before the loop starts
    pub events: broadcast::Receiver<SessionEvent>,
    /// Control requests into the loop
    pub control: mpsc::UnboundedSender<DriverControl>,
    /// Cancellation token for disconnect
    pub cancel: CancellationToken,
}

/// Spawns the task that owns the transport, decoder and display engine.
///
/// Chunks are decoded and dispatched strictly in arrival order, one chunk at
/// a time, and every received chunk is acknowledged. The loop stops on end
/// of stream, transport error or cancellation, and closes the transport
/// exactly once on the way out.
pub struct Driver;

impl Driver {
    /// Spawn the read loop for `transport`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T>(transport: T, config: &MonitorConfig) -> DriverChannels
    where
        T: Transport,
    {
        let mut engine = DisplayEngine::new(config.display.geometry());
        engine.set_reset_on_clear(config.display.reset_on_clear);

        let (display_tx, display_rx) = watch::channel(Arc::new(engine.snapshot()));
        let (status_tx, status_rx) = watch::channel(SessionStatus::Running);
        let (events_tx, events_rx) = broadcast::channel(config.event_capacity.max(1));
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        engine.set_listener(Box::new(move |engine: &DisplayEngine| {
            display_tx.send_replace(Arc::new(engine.snapshot()));
        }));

        let read_loop = ReadLoop {
            transport,
            engine,
            decoder: FrameDecoder::new(),
            ack: [config.ack_byte],
            display: display_rx.clone(),
            events: events_tx,
            status: status_tx,
            control: control_rx,
            cancel: cancel.clone(),
        };
        tokio::spawn(read_loop.run());

        DriverChannels {
            display: display_rx,
            status: status_rx,
            events: events_rx,
            control: control_tx,
            cancel,
        }
    }
}

enum Step {
    Cancelled,
    Control(DriverControl),
    Chunk(Result<Option<Vec<u8>>>),
}

struct ReadLoop<T> {
    transport: T,
    engine: DisplayEngine,
    decoder: FrameDecoder,
    ack: [u8; 1],
    display: watch::Receiver<Arc<DisplaySnapshot>>,
    events: broadcast::Sender<SessionEvent>,
    status: watch::Sender<SessionStatus>,
    control: mpsc::UnboundedReceiver<DriverControl>,
    cancel: CancellationToken,
}

impl<T: Transport> ReadLoop<T> {
    async fn run(mut self) {
        info!(transport = self.transport.name(), "Read loop started");
        let mut chunk_count = 0u64;

        let end = loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Cancelled,
                Some(control) = self.control.recv() => Step::Control(control),
                result = self.transport.read_chunk() => Step::Chunk(result),
            };

            match step {
                Step::Cancelled => {
                    info!("Read loop cancelled");
                    break SessionEnd::Disconnected;
                }
                Step::Control(DriverControl::Reset) => {
                    self.engine.reset();
                    self.publish(SessionEvent::Reset { snapshot: self.latest_snapshot() });
                }
                Step::Chunk(Ok(Some(bytes))) => {
                    chunk_count += 1;
                    trace!("Chunk {}: {} bytes", chunk_count, bytes.len());

                    for result in self.decoder.feed(&bytes) {
                        self.dispatch(result);
                    }

                    if let Err(e) = self.transport.write_bytes(&self.ack).await {
                        break Self::failed(e);
                    }
                }
                Step::Chunk(Ok(None)) => {
                    info!("Transport stream ended after {} chunks", chunk_count);
                    break SessionEnd::StreamEnded;
                }
                Step::Chunk(Err(e)) => break Self::failed(e),
            }
        };

        self.decoder.reset();

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {}", e);
        }

        let stats = self.decoder.stats();
        info!(
            chunks = chunk_count,
            frames_decoded = stats.frames_decoded,
            frames_rejected = stats.frames_rejected,
            "Read loop ended"
        );
        self.status.send_replace(SessionStatus::Ended(end));
    }

    fn failed(error: LcdError) -> SessionEnd {
        error!("Transport error: {}", error);
        SessionEnd::Failed(SessionFailure::classify(&error, true), Arc::new(error))
    }

    fn dispatch(&mut self, result: std::result::Result<Command, FramingError>) {
        let command = match result {
            Ok(command) => Arc::new(command),
            Err(error) => {
                warn!("{}", error);
                self.publish(SessionEvent::Rejected(error));
                return;
            }
        };

        if !command.is_display() {
            log_device_message(&command);
            self.publish(SessionEvent::Debug { command });
            return;
        }

        let event = match self.engine.apply(&command) {
            Ok(()) => SessionEvent::Display { snapshot: self.latest_snapshot(), command },
            Err(_) => SessionEvent::Unsupported { command },
        };
        self.publish(event);
    }

    fn latest_snapshot(&self) -> Arc<DisplaySnapshot> {
        Arc::clone(&self.display.borrow())
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

fn log_device_message(command: &Command) {
    match &command.payload {
        CommandPayload::DebugText { severity: Severity::Error, .. } => {
            warn!(frame = command.frame_id, "Device: {}", command.describe());
        }
        _ => info!(frame = command.frame_id, "Device: {}", command.describe()),
    }
}
