//! Serial framing protocol spoken by the LCD firmware.
//!
//! Frame format (no escaping, no checksum):
//! - SENTINEL (1 byte): `#` (0x23)
//! - CATEGORY (1 byte): `D` (68) debug, `L` (76) display
//! - OPCODE (1 byte): operation within the category
//! - LENGTH (1 byte): number of payload bytes after the header, 0 = unknown
//! - PAYLOAD (LENGTH bytes)
//!
//! A frame with LENGTH 0 is only terminated by the next sentinel. The sentinel
//! byte cannot appear inside a payload.
//!
//! After every chunk it receives, the host answers with [`ACK_BYTE`].

mod decode;
mod decoder;
mod encode;

pub use decode::decode_frame;
pub use decoder::{DecoderState, DecoderStats, FrameDecoder, MAX_FRAME_LEN};
pub use encode::FrameEncoder;

/// Frame synchronization byte (`#`)
pub const SENTINEL: u8 = 0x23;

/// Byte written back to the device after each received chunk
pub const ACK_BYTE: u8 = 0x07;

/// Number of header bytes in a frame body (category, opcode, length)
pub const HEADER_LEN: usize = 3;

/// Command family selected by the first body byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Category {
    Debug = 68,
    Display = 76,
}

impl Category {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            68 => Some(Category::Debug),
            76 => Some(Category::Display),
            _ => None,
        }
    }
}

/// Display opcodes.
pub mod display_op {
    pub const WRITE_CHARS: u8 = 1;
    pub const SET_CURSOR: u8 = 2;
    pub const SET_ROW: u8 = 3;
    pub const SET_COLUMN: u8 = 4;
    pub const PRINT_COLUMN: u8 = 5;
    pub const PRINT_MULTI_COLUMN: u8 = 6;
    pub const PRINT_TEXT_NORMAL: u8 = 7;
    pub const PRINT_TEXT_INVERSE: u8 = 8;
    pub const PRINT_CHAR_NORMAL: u8 = 9;
    pub const PRINT_CHAR_INVERSE: u8 = 10;
    pub const GRAPHIC_LINE: u8 = 12;
    pub const CLEAR_ROW: u8 = 13;
    pub const CLEAR_ALL: u8 = 14;
}

/// Debug opcodes.
pub mod debug_op {
    pub const TEXT: u8 = 1;
    pub const NUMBER: u8 = 2;
}
