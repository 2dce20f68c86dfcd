//! Decoder and display-state engine for graphic LCD command streams.
//!
//! A microcontroller drives a 128x64 monochrome graphic LCD and mirrors every
//! display call as a `#`-framed command over a serial link. lcdscope decodes
//! that stream and replays it onto a simulated pixel buffer so a host
//! application can show exactly what the panel shows.
//!
//! # Features
//!
//! - **Streaming decoder**: chunk boundaries never change the decoded commands
//! - **Display engine**: 5x7 font in 6x8 cells, inverse text, raw column data
//! - **Sessions**: async read loop with per-frame events, acknowledgements
//!   and throttled display snapshots
//! - **Replay**: recorded byte streams play back through the same pipeline
//!
//! ## Example (decoding without a runtime)
//!
//! ```rust
//! use lcdscope::{DisplayEngine, FrameDecoder, FrameEncoder, TextMode};
//!
//! let mut stream = FrameEncoder::display_text_at("Hello", 0, 0, TextMode::Normal)?;
//! stream.extend(FrameEncoder::display_set_cursor(Some(2), None)?);
//!
//! let mut decoder = FrameDecoder::new();
//! let mut engine = DisplayEngine::default();
//! for result in decoder.feed(&stream) {
//!     engine.apply(&result?)?;
//! }
//!
//! assert_eq!(engine.commands_received(), 2);
//! assert_eq!((engine.cursor().row, engine.cursor().column), (2, 5));
//! # Ok::<(), lcdscope::LcdError>(())
//! ```
//!
//! ## Example (serial session)
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use lcdscope::{Lcdscope, MonitorConfig, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> lcdscope::Result<()> {
//!     let mut session = Lcdscope::connect("/dev/ttyACM0", &MonitorConfig::default()).await?;
//!
//!     let mut events = session.events();
//!     while let Some(event) = events.next().await {
//!         if let SessionEvent::Debug { command } = event {
//!             println!("device: {}", command.describe());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Protocol and display state
pub mod display;
pub mod protocol;

// Stream-based session architecture
pub mod driver;
pub mod session;
pub mod stream;
pub mod transport;
pub mod transports;

// Core exports
pub use error::*;
pub use types::*;

pub use config::{DisplayConfig, MonitorConfig, ReplayConfig, SerialConfig};
pub use display::{DisplayEngine, DisplayGeometry, FontTable};
pub use protocol::{FrameDecoder, FrameEncoder, decode_frame};

// Main API exports
pub use session::{Lcdscope, Session, SessionEnd, SessionEvent, SessionStatus};
pub use transport::Transport;
pub use transports::{IoTransport, ReplayTransport};
#[cfg(unix)]
pub use transports::{SerialPort, open_device};
