//! Owned display snapshots handed to renderers

use std::sync::Arc;

/// Text cursor position in character cells.
///
/// Values are stored as received; anything outside the display is clipped
/// when pixels are written, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Cursor {
    pub row: u16,
    pub column: u16,
}

impl Cursor {
    pub fn new(row: u16, column: u16) -> Self {
        Self { row, column }
    }
}

/// Copy of the display state at one point in time.
///
/// The pixel data is a private copy of the live buffer, so holding a
/// snapshot never observes later mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    /// Width in pixels
    pub width: usize,

    /// Height in pixels
    pub height: usize,

    /// Row-major intensities, 0 = off, 255 = on
    pub pixels: Arc<[u8]>,

    /// Cursor at snapshot time
    pub cursor: Cursor,

    /// Display commands applied since the last reset
    pub commands_received: u64,
}

impl DisplaySnapshot {
    /// Blank snapshot of the given size.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width * height].into(),
            cursor: Cursor::default(),
            commands_received: 0,
        }
    }

    /// Intensity at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Whether every pixel is off.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    /// Render the bitmap as text, `#` for lit pixels and `.` for dark ones.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.pixels.chunks(self.width.max(1)) {
            out.extend(row.iter().map(|&p| if p >= 128 { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_rendering_matches_dimensions() {
        let mut pixels = vec![0u8; 6 * 2];
        pixels[1] = 255;
        let snapshot = DisplaySnapshot {
            width: 6,
            height: 2,
            pixels: pixels.into(),
            cursor: Cursor::default(),
            commands_received: 0,
        };
        assert_eq!(snapshot.to_ascii(), ".#....\n......\n");
        assert_eq!(snapshot.pixel(1, 0), Some(255));
        assert_eq!(snapshot.pixel(6, 0), None);
        assert!(!snapshot.is_blank());
        assert!(DisplaySnapshot::blank(6, 2).is_blank());
    }
}
