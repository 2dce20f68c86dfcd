//! Core data model shared by the decoder, the display engine and consumers.
//!
//! ## Architecture
//!
//! - [`Command`] is one decoded frame: a sequence number, a capture time and a
//!   closed [`CommandPayload`] variant. Dispatch sites match exhaustively on the
//!   payload, so adding a variant is a compile error until every consumer handles it.
//! - [`TextMode`], [`Severity`] and [`NumberFormat`] are the small enumerations
//!   selected by mode bytes in the frame.
//! - [`DisplaySnapshot`] is an owned copy of the display state. Renderers and
//!   command history hold snapshots, never the live buffer.
//!
//! ## Usage Example
//!
//! ```rust
//! use lcdscope::types::{Command, CommandPayload, NumberFormat};
//!
//! let command = Command::new(
//!     0,
//!     CommandPayload::DebugNumber {
//!         label: "temp".to_string(),
//!         value: 0x2a,
//!         format: NumberFormat::U8Hex,
//!     },
//! );
//! assert!(!command.is_display());
//! assert_eq!(command.describe(), "temp 0x2a");
//! ```

mod command;
mod modes;
mod snapshot;
mod update_rate;

pub use command::{Command, CommandKind, CommandPayload};
pub use modes::{NumberFormat, Severity, TextMode};
pub use snapshot::{Cursor, DisplaySnapshot};
pub use update_rate::UpdateRate;
