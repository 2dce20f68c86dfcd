//! Error types for the LCD command stream.
//!
//! Errors fall into three families with different reach:
//!
//! - **Framing errors**: a single frame could not be decoded. Local to the
//!   [`FrameDecoder`](crate::protocol::FrameDecoder); the frame is dropped and
//!   decoding resumes with the next sentinel.
//! - **Unsupported commands**: the [`DisplayEngine`](crate::display::DisplayEngine)
//!   received a well-formed command it does not render. The buffer is left untouched.
//! - **Transport errors**: opening, reading from or writing to the link failed.
//!   These are the only errors that end a session.
//!
//! ```rust
//! use lcdscope::{LcdError, TransportOp};
//!
//! let error = LcdError::transport_failed(TransportOp::Read, "device unplugged");
//! assert!(error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::CommandKind;

/// Result type alias for LCD stream operations.
pub type Result<T, E = LcdError> = std::result::Result<T, E>;

/// Main error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LcdError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("{kind} is not supported by the display engine")]
    UnsupportedCommand { kind: CommandKind },

    #[error("Transport {op} failed: {reason}")]
    Transport {
        op: TransportOp,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode command: {details}")]
    Encode { details: String },

    #[error("Session is closed")]
    SessionClosed,
}

/// The transport operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Open,
    Read,
    Write,
    Close,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportOp::Open => "open",
            TransportOp::Read => "read",
            TransportOp::Write => "write",
            TransportOp::Close => "close",
        };
        f.write_str(name)
    }
}

/// Why a frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingReason {
    /// The `(category, opcode)` pair is not part of the protocol.
    UnknownCommand { category: u8, opcode: u8 },
    /// The frame ended before a required field.
    Truncated { needed: usize, got: usize },
    /// A mode byte did not index into its lookup table.
    BadLookup { field: &'static str, value: u8 },
    /// The frame has no header at all.
    EmptyFrame,
    /// An unbounded frame grew past the buffer limit before a sentinel arrived.
    Oversized { limit: usize },
}

impl fmt::Display for FramingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingReason::UnknownCommand { category, opcode } => {
                write!(f, "unknown command (category {}, opcode {})", category, opcode)
            }
            FramingReason::Truncated { needed, got } => {
                write!(f, "frame truncated: needed {} bytes, got {}", needed, got)
            }
            FramingReason::BadLookup { field, value } => {
                write!(f, "{} byte {} is out of range", field, value)
            }
            FramingReason::EmptyFrame => f.write_str("frame has no header"),
            FramingReason::Oversized { limit } => {
                write!(f, "frame exceeded {} bytes without a sentinel", limit)
            }
        }
    }
}

/// A frame that could not be turned into a command.
///
/// Carries the raw frame body (category byte onwards) so it can be shown
/// in a diagnostic view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Frame {frame_id} rejected: {reason} (raw {raw:02x?})")]
pub struct FramingError {
    pub frame_id: u64,
    pub reason: FramingReason,
    pub raw: Vec<u8>,
}

impl FramingError {
    pub fn new(frame_id: u64, reason: FramingReason, raw: &[u8]) -> Self {
        Self { frame_id, reason, raw: raw.to_vec() }
    }
}

/// User-facing classification of a session-ending transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFailure {
    /// The device could not be found when opening.
    NoDeviceFound,
    /// Opening the link failed for another reason.
    CouldNotConnect,
    /// An established session broke.
    LostConnection,
}

impl SessionFailure {
    /// Classify `error` depending on whether a session had been established.
    pub fn classify(error: &LcdError, established: bool) -> Self {
        if established {
            return SessionFailure::LostConnection;
        }
        match error {
            LcdError::File { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                SessionFailure::NoDeviceFound
            }
            LcdError::Transport { source: Some(source), .. }
                if source
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                SessionFailure::NoDeviceFound
            }
            _ => SessionFailure::CouldNotConnect,
        }
    }

    /// Message suitable for a notification.
    pub fn message(self) -> &'static str {
        match self {
            SessionFailure::NoDeviceFound => "No microcontroller found!",
            SessionFailure::CouldNotConnect => {
                "Could not establish a connection with the microcontroller."
            }
            SessionFailure::LostConnection => {
                "There was an error receiving data from the microcontroller."
            }
        }
    }
}

impl LcdError {
    /// Whether this error terminates the current session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LcdError::Transport { .. } | LcdError::File { .. })
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LcdError::Transport { op, .. } => *op != TransportOp::Close,
            LcdError::Framing(_) => true,
            LcdError::UnsupportedCommand { .. } => false,
            LcdError::Config { .. } => false,
            LcdError::Encode { .. } => false,
            LcdError::File { .. } => false,
            LcdError::SessionClosed => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LcdError::Framing(_) => vec![
                "Check that the baud rate matches the firmware",
                "Make sure payloads never contain the '#' sentinel byte",
            ],
            LcdError::UnsupportedCommand { .. } => {
                vec!["Check the firmware for display functions the simulator cannot render"]
            }
            LcdError::Transport { op: TransportOp::Open, .. } => vec![
                "Ensure the microcontroller is plugged in",
                "Check that no other program holds the serial port",
                "Verify permissions on the serial device",
            ],
            LcdError::Transport { .. } => vec![
                "Check the USB cable",
                "Reset the microcontroller and reconnect",
            ],
            LcdError::Config { .. } => vec![
                "Check the configuration file against the documented defaults",
            ],
            LcdError::Encode { .. } => vec![
                "Split the command into frames the protocol can carry",
                "Avoid the '#' byte in payloads",
            ],
            LcdError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
            LcdError::SessionClosed => vec!["Open a new session"],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(op: TransportOp, reason: impl Into<String>) -> Self {
        LcdError::Transport { op, reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors caused by an I/O error.
    pub fn transport_io(op: TransportOp, source: std::io::Error) -> Self {
        LcdError::Transport { op, reason: source.to_string(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for unsupported command errors.
    pub fn unsupported_command(kind: CommandKind) -> Self {
        LcdError::UnsupportedCommand { kind }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        LcdError::Config { details: details.into() }
    }

    /// Helper constructor for encoding errors.
    pub fn encode_error(details: impl Into<String>) -> Self {
        LcdError::Encode { details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        LcdError::File { path, source }
    }
}
