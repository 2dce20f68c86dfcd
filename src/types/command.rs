//! Decoded command values

use std::fmt;
use std::time::SystemTime;

use super::modes::{NumberFormat, Severity, TextMode};

/// One decoded protocol frame.
///
/// Commands are immutable once built. `frame_id` is assigned by the decoder
/// in arrival order and is unique within one decoder lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Monotonic sequence number of the frame this command came from
    pub frame_id: u64,

    /// Wall-clock capture time
    pub created_at: SystemTime,

    /// Variant payload
    pub payload: CommandPayload,
}

/// Closed set of commands the device can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPayload {
    DebugText { text: String, severity: Severity },
    DebugNumber { label: String, value: u32, format: NumberFormat },
    /// Write at the current cursor
    DisplayWriteChar { text: String, mode: TextMode },
    /// Write at an explicit cell
    DisplayWriteTextAt { text: String, row: u8, column: u8, mode: TextMode },
    /// Raw column pixels at the current cursor, one byte per pixel column
    DisplayWriteColumnData { bytes: Vec<u8> },
    /// `None` leaves that axis unchanged
    DisplaySetCursor { row: Option<u8>, column: Option<u8> },
    DisplayClearAll,
    DisplayClearRow { row: u8 },
    /// Multi-column print, positioned raw bytes. Decoded but never rendered
    DisplayWriteMultiColumn { row: u8, column: u8, bytes: Vec<u8> },
    /// Decoded but never rendered
    DisplayGraphicLine { column_count: u8, bytes: Vec<u8> },
}

/// Fieldless tag of a [`CommandPayload`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    DebugText,
    DebugNumber,
    DisplayWriteChar,
    DisplayWriteTextAt,
    DisplayWriteColumnData,
    DisplaySetCursor,
    DisplayClearAll,
    DisplayClearRow,
    DisplayWriteMultiColumn,
    DisplayGraphicLine,
}

impl CommandKind {
    /// Whether commands of this kind target the display.
    pub fn is_display(self) -> bool {
        !matches!(self, CommandKind::DebugText | CommandKind::DebugNumber)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl CommandPayload {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandPayload::DebugText { .. } => CommandKind::DebugText,
            CommandPayload::DebugNumber { .. } => CommandKind::DebugNumber,
            CommandPayload::DisplayWriteChar { .. } => CommandKind::DisplayWriteChar,
            CommandPayload::DisplayWriteTextAt { .. } => CommandKind::DisplayWriteTextAt,
            CommandPayload::DisplayWriteColumnData { .. } => CommandKind::DisplayWriteColumnData,
            CommandPayload::DisplaySetCursor { .. } => CommandKind::DisplaySetCursor,
            CommandPayload::DisplayClearAll => CommandKind::DisplayClearAll,
            CommandPayload::DisplayClearRow { .. } => CommandKind::DisplayClearRow,
            CommandPayload::DisplayWriteMultiColumn { .. } => CommandKind::DisplayWriteMultiColumn,
            CommandPayload::DisplayGraphicLine { .. } => CommandKind::DisplayGraphicLine,
        }
    }
}

impl Command {
    /// Create a command stamped with the current time.
    pub fn new(frame_id: u64, payload: CommandPayload) -> Self {
        Self { frame_id, created_at: SystemTime::now(), payload }
    }

    pub fn kind(&self) -> CommandKind {
        self.payload.kind()
    }

    pub fn is_display(&self) -> bool {
        self.kind().is_display()
    }

    /// One-line human readable summary, as shown in the command log.
    pub fn describe(&self) -> String {
        match &self.payload {
            CommandPayload::DebugText { text, severity } => match severity {
                Severity::Normal => text.clone(),
                Severity::Error => format!("[error] {}", text),
                Severity::Ok => format!("[ok] {}", text),
            },
            CommandPayload::DebugNumber { label, value, format } => {
                format!("{} {}", label, format.format(*value)).trim_start().to_string()
            }
            CommandPayload::DisplayWriteChar { text, mode } => {
                format!("write {:?} ({:?})", text, mode)
            }
            CommandPayload::DisplayWriteTextAt { text, row, column, mode } => {
                format!("write {:?} at {},{} ({:?})", text, row, column, mode)
            }
            CommandPayload::DisplayWriteColumnData { bytes } => {
                format!("column data {:02x?}", bytes)
            }
            CommandPayload::DisplaySetCursor { row, column } => {
                let axis = |v: &Option<u8>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
                format!("cursor {},{}", axis(row), axis(column))
            }
            CommandPayload::DisplayClearAll => "clear display".to_string(),
            CommandPayload::DisplayClearRow { row } => format!("clear row {}", row),
            CommandPayload::DisplayWriteMultiColumn { row, column, bytes } => {
                format!("multi-column at {},{} {:02x?}", row, column, bytes)
            }
            CommandPayload::DisplayGraphicLine { column_count, bytes } => {
                format!("graphic line ({} columns, {} bytes)", column_count, bytes.len())
            }
        }
    }
}
