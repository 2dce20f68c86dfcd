//! Mode and format enumerations carried by commands

use serde::{Deserialize, Serialize};

/// Rendering mode for text written to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    #[default]
    Normal,
    /// Every pixel of the written cells is complemented.
    Inverse,
}

/// Severity attached to a debug text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Error,
    Ok,
}

impl Severity {
    /// Lookup order used on the wire (the byte is this index plus one).
    pub const TABLE: [Severity; 3] = [Severity::Normal, Severity::Error, Severity::Ok];

    /// Resolve a 1-based wire value.
    pub fn from_wire(value: u8) -> Option<Self> {
        Self::TABLE.get(usize::from(value).checked_sub(1)?).copied()
    }

    /// Inverse of [`Severity::from_wire`].
    pub fn to_wire(self) -> u8 {
        match self {
            Severity::Normal => 1,
            Severity::Error => 2,
            Severity::Ok => 3,
        }
    }
}

/// How a debug number should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    U8Hex,
    U16Hex,
    U32Hex,
    U8Dec,
    U16Dec,
    U8Bin,
    U16Bin,
    U32Bin,
}

impl NumberFormat {
    /// Lookup order used on the wire (the byte is this index plus one).
    pub const TABLE: [NumberFormat; 8] = [
        NumberFormat::U8Hex,
        NumberFormat::U16Hex,
        NumberFormat::U32Hex,
        NumberFormat::U8Dec,
        NumberFormat::U16Dec,
        NumberFormat::U8Bin,
        NumberFormat::U16Bin,
        NumberFormat::U32Bin,
    ];

    /// Resolve a 1-based wire value.
    pub fn from_wire(value: u8) -> Option<Self> {
        Self::TABLE.get(usize::from(value).checked_sub(1)?).copied()
    }

    /// Inverse of [`NumberFormat::from_wire`].
    pub fn to_wire(self) -> u8 {
        // TABLE has eight entries, the position always fits
        Self::TABLE.iter().position(|f| *f == self).map_or(0, |i| i as u8 + 1)
    }

    /// Width of the value in bits.
    pub fn bits(self) -> u32 {
        match self {
            NumberFormat::U8Hex | NumberFormat::U8Dec | NumberFormat::U8Bin => 8,
            NumberFormat::U16Hex | NumberFormat::U16Dec | NumberFormat::U16Bin => 16,
            NumberFormat::U32Hex | NumberFormat::U32Bin => 32,
        }
    }

    /// Truncate `value` to the width of this format.
    pub fn truncate(self, value: u32) -> u32 {
        match self.bits() {
            32 => value,
            bits => value & ((1u32 << bits) - 1),
        }
    }

    /// Render `value` the way the debug log shows it.
    ///
    /// Hex and binary are zero-padded to the full width of the format.
    pub fn format(self, value: u32) -> String {
        let v = self.truncate(value);
        match self {
            NumberFormat::U8Hex => format!("0x{:02x}", v),
            NumberFormat::U16Hex => format!("0x{:04x}", v),
            NumberFormat::U32Hex => format!("0x{:08x}", v),
            NumberFormat::U8Dec | NumberFormat::U16Dec => v.to_string(),
            NumberFormat::U8Bin => format!("0b{:08b}", v),
            NumberFormat::U16Bin => format!("0b{:016b}", v),
            NumberFormat::U32Bin => format!("0b{:032b}", v),
        }
    }
}
