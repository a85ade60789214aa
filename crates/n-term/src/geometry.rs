// SPDX-License-Identifier: MIT
//
// Screen-space coordinates and terminal dimensions.
//
// Both are zero-based in our API. The encoder converts to the terminal's
// 1-based convention at the last moment (see `ansi::cursor_to`).

/// A zero-based cell position: column `x`, row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Column, 0 = leftmost.
    pub x: u16,
    /// Row, 0 = topmost.
    pub y: u16,
}

impl Position {
    /// The top-left cell.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Number of columns.
    pub width: u16,
    /// Number of rows.
    pub height: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Total number of cells (`width × height`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.width as u32 * self.height as u32
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
