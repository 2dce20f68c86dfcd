//! Frame body to command translation

use super::{Category, debug_op, display_op};
use crate::error::{FramingError, FramingReason};
use crate::types::{Command, CommandPayload, NumberFormat, Severity, TextMode};

/// Decode one complete frame body into a [`Command`].
///
/// `body` starts at the category byte (the sentinel is not included). Short
/// bodies are decoded as far as their layout allows; a field that is missing
/// rejects the whole frame.
pub fn decode_frame(body: &[u8], frame_id: u64) -> Result<Command, FramingError> {
    decode_payload(body)
        .map(|payload| Command::new(frame_id, payload))
        .map_err(|reason| FramingError::new(frame_id, reason, body))
}

fn decode_payload(body: &[u8]) -> Result<CommandPayload, FramingReason> {
    if body.is_empty() {
        return Err(FramingReason::EmptyFrame);
    }
    let category = body[0];
    let opcode = byte(body, 1)?;
    let unknown = FramingReason::UnknownCommand { category, opcode };

    match Category::from_byte(category).ok_or(unknown)? {
        Category::Display => decode_display(body, opcode).ok_or(unknown)?,
        Category::Debug => decode_debug(body, opcode).ok_or(unknown)?,
    }
}

/// Outer `None` means the opcode is unknown.
fn decode_display(body: &[u8], opcode: u8) -> Option<Result<CommandPayload, FramingReason>> {
    let payload = match opcode {
        display_op::WRITE_CHARS => {
            Ok(CommandPayload::DisplayWriteChar { text: text(body, 3), mode: TextMode::Normal })
        }
        display_op::SET_CURSOR => set_cursor(body),
        display_op::SET_ROW => byte(body, 3)
            .map(|row| CommandPayload::DisplaySetCursor { row: Some(row), column: None }),
        display_op::SET_COLUMN => byte(body, 3)
            .map(|column| CommandPayload::DisplaySetCursor { row: None, column: Some(column) }),
        display_op::PRINT_COLUMN => {
            byte(body, 3).map(|b| CommandPayload::DisplayWriteColumnData { bytes: vec![b] })
        }
        display_op::PRINT_MULTI_COLUMN => multi_column(body),
        display_op::PRINT_TEXT_NORMAL => text_at(body, TextMode::Normal),
        display_op::PRINT_TEXT_INVERSE => text_at(body, TextMode::Inverse),
        display_op::PRINT_CHAR_NORMAL => single_char(body, TextMode::Normal),
        display_op::PRINT_CHAR_INVERSE => single_char(body, TextMode::Inverse),
        display_op::GRAPHIC_LINE => Ok(CommandPayload::DisplayGraphicLine {
            column_count: body.get(3).copied().unwrap_or(0),
            bytes: body.get(4..).unwrap_or_default().to_vec(),
        }),
        display_op::CLEAR_ROW => byte(body, 3).map(|row| CommandPayload::DisplayClearRow { row }),
        display_op::CLEAR_ALL => Ok(CommandPayload::DisplayClearAll),
        _ => return None,
    };
    Some(payload)
}

fn decode_debug(body: &[u8], opcode: u8) -> Option<Result<CommandPayload, FramingReason>> {
    let payload = match opcode {
        debug_op::TEXT => debug_text(body),
        debug_op::NUMBER => debug_number(body),
        _ => return None,
    };
    Some(payload)
}

fn set_cursor(body: &[u8]) -> Result<CommandPayload, FramingReason> {
    Ok(CommandPayload::DisplaySetCursor { row: Some(byte(body, 3)?), column: Some(byte(body, 4)?) })
}

fn debug_text(body: &[u8]) -> Result<CommandPayload, FramingReason> {
    let raw = byte(body, 3)?;
    let severity =
        Severity::from_wire(raw).ok_or(FramingReason::BadLookup { field: "severity", value: raw })?;
    Ok(CommandPayload::DebugText { text: text(body, 4), severity })
}

fn debug_number(body: &[u8]) -> Result<CommandPayload, FramingReason> {
    let raw = byte(body, 3)?;
    let format = NumberFormat::from_wire(raw)
        .ok_or(FramingReason::BadLookup { field: "number format", value: raw })?;
    let value = body
        .get(4..8)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_le_bytes)
        .ok_or(FramingReason::Truncated { needed: 8, got: body.len() })?;
    let label_bytes = body.get(8..).unwrap_or_default();
    let end = label_bytes.iter().position(|&b| b == 0).unwrap_or(label_bytes.len());
    Ok(CommandPayload::DebugNumber { label: latin1(&label_bytes[..end]), value, format })
}

fn text_at(body: &[u8], mode: TextMode) -> Result<CommandPayload, FramingReason> {
    Ok(CommandPayload::DisplayWriteTextAt {
        row: byte(body, 3)?,
        column: byte(body, 4)?,
        text: text(body, 5),
        mode,
    })
}

fn multi_column(body: &[u8]) -> Result<CommandPayload, FramingReason> {
    Ok(CommandPayload::DisplayWriteMultiColumn {
        row: byte(body, 3)?,
        column: byte(body, 4)?,
        bytes: body.get(5..).unwrap_or_default().to_vec(),
    })
}

fn single_char(body: &[u8], mode: TextMode) -> Result<CommandPayload, FramingReason> {
    let b = byte(body, 3)?;
    Ok(CommandPayload::DisplayWriteChar { text: char::from(b).to_string(), mode })
}

fn byte(body: &[u8], index: usize) -> Result<u8, FramingReason> {
    body.get(index).copied().ok_or(FramingReason::Truncated { needed: index + 1, got: body.len() })
}

fn text(body: &[u8], from: usize) -> String {
    latin1(body.get(from..).unwrap_or_default())
}

/// Each byte maps to the code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(body: &[u8]) -> CommandPayload {
        decode_frame(body, 0).expect("frame should decode").payload
    }

    fn reason(body: &[u8]) -> FramingReason {
        decode_frame(body, 0).expect_err("frame should be rejected").reason
    }

    #[test]
    fn display_table() {
        assert_eq!(
            payload(&[76, 1, 2, b'h', b'i']),
            CommandPayload::DisplayWriteChar { text: "hi".into(), mode: TextMode::Normal }
        );
        assert_eq!(
            payload(&[76, 2, 2, 5, 3]),
            CommandPayload::DisplaySetCursor { row: Some(5), column: Some(3) }
        );
        assert_eq!(
            payload(&[76, 3, 1, 5]),
            CommandPayload::DisplaySetCursor { row: Some(5), column: None }
        );
        assert_eq!(
            payload(&[76, 4, 1, 3]),
            CommandPayload::DisplaySetCursor { row: None, column: Some(3) }
        );
        assert_eq!(
            payload(&[76, 5, 1, 0x7f]),
            CommandPayload::DisplayWriteColumnData { bytes: vec![0x7f] }
        );
        assert_eq!(
            payload(&[76, 8, 4, 1, 2, b'O', b'K']),
            CommandPayload::DisplayWriteTextAt {
                text: "OK".into(),
                row: 1,
                column: 2,
                mode: TextMode::Inverse
            }
        );
        assert_eq!(
            payload(&[76, 10, 1, b'x']),
            CommandPayload::DisplayWriteChar { text: "x".into(), mode: TextMode::Inverse }
        );
        assert_eq!(payload(&[76, 13, 1, 4]), CommandPayload::DisplayClearRow { row: 4 });
        assert_eq!(payload(&[76, 14, 0]), CommandPayload::DisplayClearAll);
    }

    #[test]
    fn multi_column_print_keeps_its_own_payload() {
        assert_eq!(
            payload(&[76, 6, 4, 0, 1, 0xff, 0x81]),
            CommandPayload::DisplayWriteMultiColumn { row: 0, column: 1, bytes: vec![0xff, 0x81] }
        );
        assert_eq!(
            payload(&[76, 6, 2, 3, 4]),
            CommandPayload::DisplayWriteMultiColumn { row: 3, column: 4, bytes: vec![] }
        );
        assert_eq!(reason(&[76, 6, 1, 3]), FramingReason::Truncated { needed: 5, got: 4 });
    }

    #[test]
    fn graphic_line_is_always_produced() {
        assert_eq!(
            payload(&[76, 12, 0]),
            CommandPayload::DisplayGraphicLine { column_count: 0, bytes: vec![] }
        );
        assert_eq!(
            payload(&[76, 12, 3, 2, 0xaa, 0x55]),
            CommandPayload::DisplayGraphicLine { column_count: 2, bytes: vec![0xaa, 0x55] }
        );
    }

    #[test]
    fn debug_number_reads_little_endian_and_stops_label_at_nul() {
        assert_eq!(
            payload(&[68, 2, 5, 3, 0x01, 0x01, 0x01, 0x00]),
            CommandPayload::DebugNumber {
                label: String::new(),
                value: 0x010101,
                format: NumberFormat::U32Hex
            }
        );
        assert_eq!(
            payload(&[68, 2, 9, 6, 0x01, 0x01, 0x01, 0x00, b'a', 0, b'z']),
            CommandPayload::DebugNumber {
                label: "a".into(),
                value: 0x010101,
                format: NumberFormat::U8Bin
            }
        );
    }

    #[test]
    fn debug_text_uses_one_based_severity() {
        assert_eq!(
            payload(&[68, 1, 3, 2, b'n', b'o']),
            CommandPayload::DebugText { text: "no".into(), severity: Severity::Error }
        );
        assert_eq!(
            reason(&[68, 1, 2, 0, b'x']),
            FramingReason::BadLookup { field: "severity", value: 0 }
        );
    }

    #[test]
    fn malformed_frames_are_rejected_with_raw_bytes() {
        let err = decode_frame(&[76, 99, 0], 42).unwrap_err();
        assert_eq!(err.frame_id, 42);
        assert_eq!(err.reason, FramingReason::UnknownCommand { category: 76, opcode: 99 });
        assert_eq!(err.raw, vec![76, 99, 0]);

        assert_eq!(reason(&[]), FramingReason::EmptyFrame);
        assert_eq!(reason(&[76]), FramingReason::Truncated { needed: 2, got: 1 });
        assert_eq!(reason(&[76, 2, 2, 5]), FramingReason::Truncated { needed: 5, got: 4 });
        assert_eq!(reason(&[68, 2, 3, 1, 0]), FramingReason::Truncated { needed: 8, got: 5 });
        assert_eq!(
            reason(&[0x41, 1, 0]),
            FramingReason::UnknownCommand { category: 0x41, opcode: 1 }
        );
    }
}
