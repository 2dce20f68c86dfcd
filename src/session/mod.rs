//! Session handles over a running read loop

use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::driver::{Driver, DriverControl};
use crate::stream::ThrottleExt;
use crate::transport::Transport;
use crate::transports::ReplayTransport;
#[cfg(unix)]
use crate::transports::open_device;
use crate::types::{Command, DisplaySnapshot, UpdateRate};
use crate::{FramingError, LcdError, Result, SessionFailure};


/// What happened to one decoded frame, or to the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A display command was applied; `snapshot` is the state right after it
    Display { command: Arc<Command>, snapshot: Arc<DisplaySnapshot> },
    /// Debug output from the device
    Debug { command: Arc<Command> },
    /// Decoded, but not something the display can render
    Unsupported { command: Arc<Command> },
    /// The decoder dropped a frame
    Rejected(FramingError),
    /// The display was reset through [`Session::reset`]
    Reset { snapshot: Arc<DisplaySnapshot> },
}

/// Why a session stopped.
#[derive(Debug, Clone)]
pub enum SessionEnd {
    /// The transport reported end of stream
    StreamEnded,
    /// [`Session::disconnect`] was called or the session was dropped
    Disconnected,
    /// The transport failed
    Failed(SessionFailure, Arc<LcdError>),
}

#[derive(Debug, Clone)]
pub enum SessionStatus {
    Running,
    Ended(SessionEnd),
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::Running)
    }
}

/// Handle to one monitoring session.
///
/// Dropping the handle disconnects.
pub struct Session {
    display: watch::Receiver<Arc<DisplaySnapshot>>,
    status: watch::Receiver<SessionStatus>,
    first_events: Option<broadcast::Receiver<SessionEvent>>,
    events: broadcast::Receiver<SessionEvent>,
    control: mpsc::UnboundedSender<DriverControl>,
    cancel: CancellationToken,
}

impl Session {
    /// Start a session over an already open transport.
    pub fn attach<T: Transport>(transport: T, config: &MonitorConfig) -> Self {
        info!("Attaching session to {}", transport.name());
        let channels = Driver::spawn(transport, config);

        Self {
            display: channels.display,
            status: channels.status,
            events: channels.events.resubscribe(),
            first_events: Some(channels.events),
            control: channels.control,
            cancel: channels.cancel,
        }
    }

    /// Per-frame events in arrival order.
    ///
    /// The first call sees every event since the session started; later
    /// calls start from the moment they are made. A subscriber that falls
    /// more than `event_capacity` events behind skips the oldest ones. The
    /// stream ends when the session ends.
    pub fn events(&mut self) -> impl Stream<Item = SessionEvent> + Send + Unpin + 'static {
        let receiver = self.first_events.take().unwrap_or_else(|| self.events.resubscribe());

        BroadcastStream::new(receiver).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber fell behind, skipped {} events", skipped);
                    None
                }
            }
        })
        .boxed()
    }

    /// Display snapshots as they change, starting with the current one.
    pub fn display_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = Arc<DisplaySnapshot>> + Send + Unpin + 'static {
        let updates = WatchStream::new(self.display.clone());

        match rate.throttle_interval() {
            None => updates.boxed(),
            Some(interval) => {
                debug!("Display updates throttled to {:?}", interval);
                updates.throttle(interval).boxed()
            }
        }
    }

    pub fn current_display(&self) -> Arc<DisplaySnapshot> {
        Arc::clone(&self.display.borrow())
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.borrow().is_running()
    }

    /// Wait for the session to end.
    pub async fn closed(&self) -> SessionEnd {
        let mut status = self.status.clone();
        let ended = status.wait_for(|current| !current.is_running()).await.map(|s| (*s).clone());

        match ended {
            Ok(SessionStatus::Ended(end)) => end,
            _ => SessionEnd::Disconnected,
        }
    }

    /// Clear the display, home the cursor and zero the command counter.
    pub fn reset(&self) -> Result<()> {
        self.control.send(DriverControl::Reset).map_err(|_| LcdError::SessionClosed)
    }

    /// Stop the read loop and close the transport.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Dropping session");
        self.cancel.cancel();
    }
}

/// Entry point for monitoring sessions.
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use lcdscope::{Lcdscope, MonitorConfig, UpdateRate};
///
/// #[tokio::main]
/// async fn main() -> lcdscope::Result<()> {
///     let config = MonitorConfig::default();
///     let session = Lcdscope::connect("/dev/ttyACM0", &config).await?;
///
///     let mut updates = session.display_updates(UpdateRate::Max(30));
///     while let Some(snapshot) = updates.next().await {
///         println!("{}", snapshot.to_ascii());
///     }
///     Ok(())
/// }
/// ```
pub struct Lcdscope;

impl Lcdscope {
    /// Open a serial device and start a session on it.
    ///
    /// Errors here mean no session was established; classify them with
    /// [`SessionFailure::classify`] and `established = false`.
    #[cfg(unix)]
    pub async fn connect<P: AsRef<Path>>(device: P, config: &MonitorConfig) -> Result<Session> {
        config.validate()?;
        let transport = open_device(device, &config.serial)
            .await?
            .with_buffer_size(config.read_buffer_size);
        Ok(Session::attach(transport, config))
    }

    /// Replay a captured byte stream.
    pub async fn replay<P: AsRef<Path>>(path: P, config: &MonitorConfig) -> Result<Session> {
        config.validate()?;
        let transport = ReplayTransport::open(path, &config.replay).await?;
        Ok(Session::attach(transport, config))
    }

    /// Start a session over any transport.
    pub fn attach<T: Transport>(transport: T, config: &MonitorConfig) -> Session {
        Session::attach(transport, config)
    }
}
