//! Display state: pixel buffer, cursor and the engine that mutates them.
//!
//! The display is a monochrome bitmap addressed in 6x8 pixel character
//! cells. Glyphs are 5x7 and sit in the top-left of their cell, leaving a
//! one pixel margin to the right and bottom.

mod engine;
mod font;

pub use engine::{ChangeListener, DisplayEngine};
pub use font::{FONT_5X7, FontTable, GLYPH_HEIGHT, GLYPH_WIDTH};

use serde::{Deserialize, Serialize};

/// Width of a character cell in pixels
pub const CELL_WIDTH: usize = 6;

/// Height of a character cell in pixels
pub const CELL_HEIGHT: usize = 8;

/// Pixel dimensions of the simulated panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub width: usize,
    pub height: usize,
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::REFERENCE
    }
}

impl DisplayGeometry {
    /// 128x64 panel, 21 columns by 8 rows of text
    pub const REFERENCE: DisplayGeometry = DisplayGeometry { width: 128, height: 64 };

    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Whole character columns
    pub fn columns(&self) -> usize {
        self.width / CELL_WIDTH
    }

    /// Whole character rows
    pub fn rows(&self) -> usize {
        self.height / CELL_HEIGHT
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}
