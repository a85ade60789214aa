// SPDX-License-Identifier: MIT
//
// Cell: one screen column's worth of content.
//
// A cell holds a grapheme cluster (not a single code point, so "é" built from
// e + combining accent, flags, and ZWJ emoji are all one cell) plus its
// style. Wide graphemes occupy two columns; the second column is the
// `CONTINUATION` marker. An empty symbol alone doesn't make a cell a
// continuation. The renderer never positions the
// cursor on, or writes anything for, a continuation cell: the terminal
// already advanced past it when it drew the wide character.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::style::Style;

/// A single terminal cell.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    symbol: String,
    style: Style,
    continuation: bool,
}

impl Cell {
    /// Trailing column of a wide character.
    pub const CONTINUATION: Self = Self {
        symbol: String::new(),
        style: Style::EMPTY,
        continuation: true,
    };

    #[must_use]
    pub fn new(symbol: impl Into<String>, style: Style) -> Self {
        Self {
            symbol: symbol.into(),
            style,
            continuation: false,
        }
    }

    /// Unstyled cell.
    #[must_use]
    pub fn plain(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Style::EMPTY)
    }

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    #[must_use]
    pub const fn style(&self) -> &Style {
        &self.style
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.continuation
    }

    /// Display width in columns. Continuation cells are zero wide.
    #[must_use]
    pub fn width(&self) -> usize {
        self.symbol.width()
    }

    /// Split `text` into one cell per grapheme cluster, all sharing `style`.
    ///
    /// Each grapheme wider than one column is followed by the matching
    /// number of continuation cells, so the result has one entry per
    /// screen column. Zero-width graphemes (a lone combining mark, a
    /// control character) still get a cell of their own.
    ///
    /// ```
    /// use n_term::cell::Cell;
    /// use n_term::style::Style;
    ///
    /// let row = Cell::from_text("a世", &Style::EMPTY);
    /// assert_eq!(row.len(), 3);
    /// assert!(row[2].is_continuation());
    /// ```
    #[must_use]
    pub fn from_text(text: &str, style: &Style) -> Vec<Self> {
        let mut cells = Vec::with_capacity(text.len());
        for grapheme in text.graphemes(true) {
            cells.push(Self::new(grapheme, style.clone()));
            for _ in 1..grapheme.width() {
                cells.push(Self::CONTINUATION);
            }
        }
        cells
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::plain(" ")
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        write!(f, "Cell({:?}", self.symbol)?;
        if !self.style.is_plain() {
            write!(f, ", {:?}", self.style)?;
        }
        write!(f, ")")
    }
}

// ─── CellUpdate ──────────────────────────────────────────────────────────────

/// One changed cell at a zero-based screen position.
///
/// A diff producer emits these in the order it wants them drawn; the
/// renderer trusts that order and never sorts or merges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

impl CellUpdate {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, cell: Cell) -> Self {
        Self { x, y, cell }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
