//! Frame building, the inverse of the decoder
//!
//! Used to simulate a device in tests and benchmarks, and by tools that
//! record or synthesize command streams.

use super::{Category, SENTINEL, debug_op, display_op};
use crate::types::{CommandPayload, NumberFormat, Severity, TextMode};
use crate::{LcdError, Result};

/// Builds `#`-framed byte sequences.
pub struct FrameEncoder;

impl FrameEncoder {
    /// Frame a raw payload.
    ///
    /// The declared length is the payload length. Fails if any byte after
    /// the sentinel would itself read as a sentinel, or if the payload does
    /// not fit the one-byte length field.
    pub fn encode(category: Category, opcode: u8, payload: &[u8]) -> Result<Vec<u8>> {
        let declared = u8::try_from(payload.len()).map_err(|_| {
            LcdError::encode_error(format!("payload of {} bytes exceeds 255", payload.len()))
        })?;

        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.extend([SENTINEL, category as u8, opcode, declared]);
        frame.extend_from_slice(payload);

        if let Some(pos) = frame[1..].iter().position(|&b| b == SENTINEL) {
            return Err(LcdError::encode_error(format!(
                "byte {} of frame (category {:?}, opcode {}) is the sentinel",
                pos + 1,
                category,
                opcode
            )));
        }
        Ok(frame)
    }

    /// Frame any command payload.
    pub fn encode_payload(payload: &CommandPayload) -> Result<Vec<u8>> {
        match payload {
            CommandPayload::DebugText { text, severity } => Self::debug_text(text, *severity),
            CommandPayload::DebugNumber { label, value, format } => {
                Self::debug_number(label, *value, *format)
            }
            CommandPayload::DisplayWriteChar { text, mode } => {
                let mut chars = text.chars();
                match (chars.next(), chars.next(), mode) {
                    (Some(c), None, _) => Self::display_char(c, *mode),
                    (_, _, TextMode::Normal) => Self::display_chars(text),
                    (_, _, TextMode::Inverse) => Err(LcdError::encode_error(
                        "inverse writes at the cursor carry exactly one character",
                    )),
                }
            }
            CommandPayload::DisplayWriteTextAt { text, row, column, mode } => {
                Self::display_text_at(text, *row, *column, *mode)
            }
            CommandPayload::DisplayWriteColumnData { bytes } => match bytes.as_slice() {
                [byte] => Self::display_column(*byte),
                _ => Err(LcdError::encode_error("column data frames carry exactly one byte")),
            },
            CommandPayload::DisplaySetCursor { row, column } => {
                Self::display_set_cursor(*row, *column)
            }
            CommandPayload::DisplayClearAll => Self::display_clear_all(),
            CommandPayload::DisplayClearRow { row } => Self::display_clear_row(*row),
            CommandPayload::DisplayWriteMultiColumn { row, column, bytes } => {
                Self::display_multi_column(*row, *column, bytes)
            }
            CommandPayload::DisplayGraphicLine { column_count, bytes } => {
                let mut payload = vec![*column_count];
                payload.extend_from_slice(bytes);
                Self::encode(Category::Display, display_op::GRAPHIC_LINE, &payload)
            }
        }
    }

    pub fn display_chars(text: &str) -> Result<Vec<u8>> {
        Self::encode(Category::Display, display_op::WRITE_CHARS, &latin1(text)?)
    }

    pub fn display_char(c: char, mode: TextMode) -> Result<Vec<u8>> {
        let opcode = match mode {
            TextMode::Normal => display_op::PRINT_CHAR_NORMAL,
            TextMode::Inverse => display_op::PRINT_CHAR_INVERSE,
        };
        Self::encode(Category::Display, opcode, &latin1(c.encode_utf8(&mut [0; 4]))?)
    }

    pub fn display_text_at(text: &str, row: u8, column: u8, mode: TextMode) -> Result<Vec<u8>> {
        let opcode = match mode {
            TextMode::Normal => display_op::PRINT_TEXT_NORMAL,
            TextMode::Inverse => display_op::PRINT_TEXT_INVERSE,
        };
        let mut payload = vec![row, column];
        payload.extend(latin1(text)?);
        Self::encode(Category::Display, opcode, &payload)
    }

    pub fn display_set_cursor(row: Option<u8>, column: Option<u8>) -> Result<Vec<u8>> {
        match (row, column) {
            (Some(row), Some(column)) => {
                Self::encode(Category::Display, display_op::SET_CURSOR, &[row, column])
            }
            (Some(row), None) => Self::encode(Category::Display, display_op::SET_ROW, &[row]),
            (None, Some(column)) => {
                Self::encode(Category::Display, display_op::SET_COLUMN, &[column])
            }
            (None, None) => Err(LcdError::encode_error("cursor update without row or column")),
        }
    }

    pub fn display_column(byte: u8) -> Result<Vec<u8>> {
        Self::encode(Category::Display, display_op::PRINT_COLUMN, &[byte])
    }

    pub fn display_multi_column(row: u8, column: u8, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut payload = vec![row, column];
        payload.extend_from_slice(bytes);
        Self::encode(Category::Display, display_op::PRINT_MULTI_COLUMN, &payload)
    }

    pub fn display_clear_row(row: u8) -> Result<Vec<u8>> {
        Self::encode(Category::Display, display_op::CLEAR_ROW, &[row])
    }

    /// Declares length 0, so the frame only ends at the next sentinel.
    pub fn display_clear_all() -> Result<Vec<u8>> {
        Self::encode(Category::Display, display_op::CLEAR_ALL, &[])
    }

    pub fn debug_text(text: &str, severity: Severity) -> Result<Vec<u8>> {
        let mut payload = vec![severity.to_wire()];
        payload.extend(latin1(text)?);
        Self::encode(Category::Debug, debug_op::TEXT, &payload)
    }

    /// The label is NUL-terminated on the wire.
    pub fn debug_number(label: &str, value: u32, format: NumberFormat) -> Result<Vec<u8>> {
        let mut payload = vec![format.to_wire()];
        payload.extend(value.to_le_bytes());
        payload.extend(latin1(label)?);
        payload.push(0);
        Self::encode(Category::Debug, debug_op::NUMBER, &payload)
    }
}

fn latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| LcdError::encode_error(format!("{:?} is not a single-byte character", c)))
        })
        .collect()
}
