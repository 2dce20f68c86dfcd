//! Display state machine

use std::fmt;
use tracing::{debug, trace, warn};

use super::{CELL_HEIGHT, CELL_WIDTH, DisplayGeometry, FontTable};
use crate::types::{Command, CommandPayload, Cursor, DisplaySnapshot, TextMode};
use crate::{LcdError, Result};

/// Called synchronously after every mutation.
///
/// The listener only gets a shared reference, so it can read the new state
/// but cannot mutate the engine from inside the notification.
pub type ChangeListener = Box<dyn FnMut(&DisplayEngine) + Send>;

/// Owns the pixel buffer and cursor and applies display commands to them.
///
/// Geometry errors never fail: anything drawn outside the bitmap is clipped
/// pixel by pixel. Commands the engine cannot render are reported with
/// [`LcdError::UnsupportedCommand`] and leave the state untouched.
pub struct DisplayEngine {
    geometry: DisplayGeometry,
    font: FontTable,
    pixels: Vec<u8>,
    cursor: Cursor,
    commands_received: u64,
    dirty: bool,
    reset_on_clear: bool,
    listener: Option<ChangeListener>,
}

impl fmt::Debug for DisplayEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayEngine")
            .field("geometry", &self.geometry)
            .field("cursor", &self.cursor)
            .field("commands_received", &self.commands_received)
            .field("dirty", &self.dirty)
            .field("reset_on_clear", &self.reset_on_clear)
            .finish_non_exhaustive()
    }
}

impl Default for DisplayEngine {
    fn default() -> Self {
        Self::new(DisplayGeometry::REFERENCE)
    }
}

impl DisplayEngine {
    /// Create a blank display with the standard font
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self::with_font(geometry, FontTable::standard())
    }

    pub fn with_font(geometry: DisplayGeometry, font: FontTable) -> Self {
        Self {
            geometry,
            font,
            pixels: vec![0; geometry.pixel_count()],
            cursor: Cursor::default(),
            commands_received: 0,
            dirty: true,
            reset_on_clear: false,
            listener: None,
        }
    }

    /// Treat "clear display" as a full [`reset`](Self::reset).
    pub fn set_reset_on_clear(&mut self, enabled: bool) {
        self.reset_on_clear = enabled;
    }

    /// Install the change listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: ChangeListener) {
        self.listener = Some(listener);
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// Live pixel data, row-major, one byte per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn commands_received(&self) -> u64 {
        self.commands_received
    }

    /// Return and clear the pending-redraw flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            width: self.geometry.width,
            height: self.geometry.height,
            pixels: self.pixels.as_slice().into(),
            cursor: self.cursor,
            commands_received: self.commands_received,
        }
    }

    /// Apply one decoded command.
    pub fn apply(&mut self, command: &Command) -> Result<()> {
        trace!("Applying frame {}: {}", command.frame_id, command.describe());

        match &command.payload {
            CommandPayload::DisplayWriteChar { text, mode } => self.write_char(text, *mode),
            CommandPayload::DisplayWriteTextAt { text, row, column, mode } => {
                self.write_char_at(text, u16::from(*row), u16::from(*column), *mode)
            }
            CommandPayload::DisplayWriteColumnData { bytes } => self.write_column_data(bytes),
            CommandPayload::DisplaySetCursor { row, column } => {
                self.set_cursor(row.map(u16::from), column.map(u16::from))
            }
            CommandPayload::DisplayClearAll if self.reset_on_clear => {
                debug!("Clear display received, resetting");
                self.reset()
            }
            CommandPayload::DisplayClearAll => self.clear_all(),
            CommandPayload::DisplayClearRow { row } => self.clear_row(u16::from(*row)),
            CommandPayload::DisplayWriteMultiColumn { .. }
            | CommandPayload::DisplayGraphicLine { .. }
            | CommandPayload::DebugText { .. }
            | CommandPayload::DebugNumber { .. } => {
                warn!("Frame {}: {} not applied to display", command.frame_id, command.kind());
                return Err(LcdError::unsupported_command(command.kind()));
            }
        }
        Ok(())
    }

    /// Render `text` left to right starting at the given cell.
    ///
    /// The cursor ends up just after the last character, even if that is
    /// off-screen.
    pub fn write_char_at(&mut self, text: &str, row: u16, column: u16, mode: TextMode) {
        let mut count = 0u16;
        for ch in text.chars() {
            let code = u8::try_from(u32::from(ch)).ok();
            self.draw_cell(row, column.saturating_add(count), code, mode);
            count = count.saturating_add(1);
        }
        self.cursor = Cursor::new(row, column.saturating_add(count));
        self.finish_mutation();
    }

    /// Render `text` at the cursor.
    pub fn write_char(&mut self, text: &str, mode: TextMode) {
        let Cursor { row, column } = self.cursor;
        self.write_char_at(text, row, column, mode);
    }

    /// Write raw pixel columns into the cursor cell.
    ///
    /// Byte `i` becomes pixel column `i` of the cell, bit 0 at the top. The
    /// cursor does not move.
    pub fn write_column_data(&mut self, bytes: &[u8]) {
        let x0 = usize::from(self.cursor.column) * CELL_WIDTH;
        let y0 = usize::from(self.cursor.row) * CELL_HEIGHT;

        for (i, &column) in bytes.iter().enumerate() {
            let x = x0 + i;
            if x >= self.geometry.width {
                break;
            }
            for bit in 0..CELL_HEIGHT {
                let y = y0 + bit;
                if y >= self.geometry.height {
                    break;
                }
                self.pixels[y * self.geometry.width + x] =
                    if (column >> bit) & 1 == 1 { 255 } else { 0 };
            }
        }
        self.finish_mutation();
    }

    /// Move the cursor; `None` keeps that axis.
    pub fn set_cursor(&mut self, row: Option<u16>, column: Option<u16>) {
        if let Some(row) = row {
            self.cursor.row = row;
        }
        if let Some(column) = column {
            self.cursor.column = column;
        }
        self.finish_mutation();
    }

    /// Blank every pixel. Cursor and counter are kept.
    pub fn clear_all(&mut self) {
        self.pixels.fill(0);
        self.finish_mutation();
    }

    /// Blank the 8 pixel band of one text row.
    pub fn clear_row(&mut self, row: u16) {
        let width = self.geometry.width;
        let top = (usize::from(row) * CELL_HEIGHT).min(self.geometry.height);
        let bottom = (top + CELL_HEIGHT).min(self.geometry.height);
        self.pixels[top * width..bottom * width].fill(0);
        self.finish_mutation();
    }

    /// Blank the display, home the cursor and zero the command counter.
    pub fn reset(&mut self) {
        self.pixels.fill(0);
        self.cursor = Cursor::default();
        self.commands_received = 0;
        self.dirty = true;
        debug!("Display reset");
        self.notify();
    }

    fn draw_cell(&mut self, row: u16, column: u16, code: Option<u8>, mode: TextMode) {
        let x0 = usize::from(column) * CELL_WIDTH;
        let y0 = usize::from(row) * CELL_HEIGHT;

        for dy in 0..CELL_HEIGHT {
            let y = y0 + dy;
            if y >= self.geometry.height {
                break;
            }
            for dx in 0..CELL_WIDTH {
                let x = x0 + dx;
                if x >= self.geometry.width {
                    break;
                }
                let lit = code.is_some_and(|c| self.font.is_set(c, dx, dy));
                let value = match (lit, mode) {
                    (true, TextMode::Normal) | (false, TextMode::Inverse) => 255,
                    (false, TextMode::Normal) | (true, TextMode::Inverse) => 0,
                };
                self.pixels[y * self.geometry.width + x] = value;
            }
        }
    }

    fn finish_mutation(&mut self) {
        self.dirty = true;
        self.commands_received += 1;
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener(self);
            self.listener = Some(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn lit(engine: &DisplayEngine, x: usize, y: usize) -> bool {
        engine.pixels()[y * engine.geometry().width + x] == 255
    }

    fn cell(engine: &DisplayEngine, row: usize, column: usize) -> Vec<u8> {
        let width = engine.geometry().width;
        let mut out = Vec::new();
        for y in row * CELL_HEIGHT..(row + 1) * CELL_HEIGHT {
            let start = y * width + column * CELL_WIDTH;
            out.extend_from_slice(&engine.pixels()[start..start + CELL_WIDTH]);
        }
        out
    }

    #[test]
    fn inverse_is_complement_of_normal_inside_written_cells() {
        let mut normal = DisplayEngine::default();
        normal.write_char_at("AB", 0, 0, TextMode::Normal);

        let mut inverse = DisplayEngine::default();
        inverse.write_char_at("AB", 0, 0, TextMode::Inverse);

        let width = normal.geometry().width;
        for (i, (a, b)) in normal.pixels().iter().zip(inverse.pixels()).enumerate() {
            let (x, y) = (i % width, i / width);
            if x < 2 * CELL_WIDTH && y < CELL_HEIGHT {
                assert_eq!(*a, 255 - *b, "pixel ({}, {})", x, y);
            } else {
                assert_eq!(a, b, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn glyph_leaves_right_and_bottom_margin() {
        let mut engine = DisplayEngine::default();
        engine.write_char_at("\u{7f}", 0, 0, TextMode::Normal);
        assert!(cell(&engine, 0, 0).iter().all(|&p| p == 0), "no glyph renders blank");

        engine.write_char_at("|", 1, 1, TextMode::Normal);
        for y in 8..15 {
            assert!(lit(&engine, 6 + 2, y));
        }
        assert!(!lit(&engine, 6 + 2, 15));
        assert!((8..16).all(|y| !lit(&engine, 6 + 5, y)));
    }

    #[test]
    fn write_advances_cursor_by_text_length() {
        let mut engine = DisplayEngine::default();
        engine.write_char_at("abc", 2, 4, TextMode::Normal);
        assert_eq!(engine.cursor(), Cursor::new(2, 7));

        engine.write_char("de", TextMode::Normal);
        assert_eq!(engine.cursor(), Cursor::new(2, 9));
        assert_eq!(engine.commands_received(), 2);
    }

    #[test]
    fn partial_cursor_updates_compose() {
        let mut engine = DisplayEngine::default();
        engine.set_cursor(Some(5), None);
        engine.set_cursor(None, Some(3));
        assert_eq!(engine.cursor(), Cursor::new(5, 3));
    }

    #[test]
    fn out_of_range_writes_are_clipped() {
        let mut engine = DisplayEngine::default();
        engine.write_char_at("WWWW", 7, 19, TextMode::Inverse);
        assert_eq!(engine.cursor(), Cursor::new(7, 23));
        // Column 21 starts at x = 126, only two pixels of it fit
        assert!(lit(&engine, 127, 63));

        engine.write_char_at("x", 200, 200, TextMode::Normal);
        engine.clear_row(40);
        engine.set_cursor(Some(99), Some(99));
        engine.write_column_data(&[0xff]);
        assert_eq!(engine.commands_received(), 5);
    }

    #[test]
    fn column_data_maps_bits_top_to_bottom_without_moving_cursor() {
        let mut engine = DisplayEngine::default();
        engine.set_cursor(Some(1), Some(2));
        engine.write_column_data(&[0b0000_0101, 0b1000_0000]);

        let (x, y) = (2 * CELL_WIDTH, CELL_HEIGHT);
        assert!(lit(&engine, x, y));
        assert!(!lit(&engine, x, y + 1));
        assert!(lit(&engine, x, y + 2));
        assert!(lit(&engine, x + 1, y + 7));
        assert!(!lit(&engine, x + 1, y));
        assert_eq!(engine.cursor(), Cursor::new(1, 2));
    }

    #[test]
    fn clear_all_keeps_cursor_and_counter_but_reset_does_not() {
        let mut engine = DisplayEngine::default();
        engine.write_char_at("Hi", 3, 3, TextMode::Normal);
        engine.clear_all();
        assert!(engine.pixels().iter().all(|&p| p == 0));
        assert_eq!(engine.cursor(), Cursor::new(3, 5));
        assert_eq!(engine.commands_received(), 2);

        engine.write_char("!", TextMode::Inverse);
        engine.reset();
        assert!(engine.pixels().iter().all(|&p| p == 0));
        assert_eq!(engine.cursor(), Cursor::default());
        assert_eq!(engine.commands_received(), 0);
    }

    #[test]
    fn clear_row_only_touches_its_band() {
        let mut engine = DisplayEngine::default();
        engine.write_char_at("#", 0, 0, TextMode::Inverse);
        engine.write_char_at("#", 1, 0, TextMode::Inverse);
        engine.clear_row(1);
        assert!(cell(&engine, 1, 0).iter().all(|&p| p == 0));
        assert!(cell(&engine, 0, 0).iter().any(|&p| p == 255));
    }

    #[test]
    fn graphic_line_and_multi_column_are_reported_not_applied() {
        let mut engine = DisplayEngine::default();
        engine.write_char("x", TextMode::Normal);
        engine.take_dirty();
        let before = engine.snapshot();

        let unrendered = [
            CommandPayload::DisplayGraphicLine { column_count: 1, bytes: vec![0xff] },
            CommandPayload::DisplayWriteMultiColumn { row: 2, column: 0, bytes: vec![0xff, 0xff] },
        ];
        for payload in unrendered {
            let kind = payload.kind();
            let err = engine.apply(&Command::new(9, payload)).unwrap_err();
            assert!(
                matches!(err, LcdError::UnsupportedCommand { kind: k } if k == kind),
                "{:?}",
                err
            );
        }
        assert_eq!(engine.snapshot(), before);
        assert!(!engine.take_dirty());
    }

    #[test]
    fn reset_on_clear_resets_counter() {
        let mut engine = DisplayEngine::default();
        engine.set_reset_on_clear(true);
        engine.write_char_at("a", 2, 2, TextMode::Normal);
        engine.apply(&Command::new(0, CommandPayload::DisplayClearAll)).unwrap();
        assert_eq!(engine.commands_received(), 0);
        assert_eq!(engine.cursor(), Cursor::default());
    }

    #[test]
    fn listener_sees_state_after_each_mutation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut engine = DisplayEngine::default();
        engine.set_listener(Box::new(move |engine: &DisplayEngine| {
            sink.lock().unwrap().push((engine.cursor(), engine.commands_received()));
        }));

        engine.set_cursor(Some(1), Some(1));
        engine.write_char("ab", TextMode::Normal);
        engine.reset();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Cursor::new(1, 1), 1), (Cursor::new(1, 3), 2), (Cursor::default(), 0)]
        );
    }

    #[test]
    fn snapshots_do_not_alias_live_buffer() {
        let mut engine = DisplayEngine::default();
        let before = engine.snapshot();
        engine.write_char("A", TextMode::Inverse);
        assert!(before.is_blank());
        assert!(!engine.snapshot().is_blank());
    }
}
