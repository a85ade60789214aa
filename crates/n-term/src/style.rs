// SPDX-License-Identifier: MIT
//
// Style: everything about a cell except its text.
//
// A style is a plain value. Two cells share a style iff their styles compare
// equal, and that comparison is what the cell writer uses to decide whether
// a new SGR sequence is needed. The hyperlink rides along in the style so a
// change of link target alone is enough to break a run.

use crate::color::Color;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR (Select Graphic Rendition) parameters.
    /// Combine with bitwise OR:
    ///
    /// ```
    /// use n_term::style::Attr;
    ///
    /// let attrs = Attr::BOLD | Attr::ITALIC;
    /// assert!(attrs.contains(Attr::BOLD));
    /// assert!(!attrs.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2: decreased intensity (faint).
        const DIM           = 1 << 1;
        /// SGR 3: italic.
        const ITALIC        = 1 << 2;
        /// SGR 5: slow blink.
        const SLOW_BLINK    = 1 << 3;
        /// SGR 6: rapid blink. Rarely supported.
        const RAPID_BLINK   = 1 << 4;
        /// SGR 7: swap foreground and background.
        const INVERSE       = 1 << 5;
        /// SGR 8: invisible text.
        const HIDDEN        = 1 << 6;
        /// SGR 9: crossed-out text.
        const STRIKETHROUGH = 1 << 7;
    }
}

impl Attr {
    /// SGR parameter for each flag, in emission order.
    pub(crate) const SGR_CODES: [(Self, u8); 8] = [
        (Self::BOLD, 1),
        (Self::DIM, 2),
        (Self::ITALIC, 3),
        (Self::SLOW_BLINK, 5),
        (Self::RAPID_BLINK, 6),
        (Self::INVERSE, 7),
        (Self::HIDDEN, 8),
        (Self::STRIKETHROUGH, 9),
    ];
}

// ─── Underline Style ─────────────────────────────────────────────────────────

/// Underline style.
///
/// Kept separate from [`Attr`] so there is no "is underlined" bit that can
/// disagree with "which underline". Anything other than `None` underlines.
///
/// `Straight` is sent as plain SGR 4, which every terminal understands. The
/// others use the colon sub-parameter form (`4:N`) that Kitty, `WezTerm`,
/// Ghostty and iTerm2 accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum UnderlineStyle {
    #[default]
    None = 0,
    Straight = 1,
    Double = 2,
    Curly = 3,
    Dotted = 4,
    Dashed = 5,
}

impl UnderlineStyle {
    /// Whether any underline is active.
    #[inline]
    #[must_use]
    pub const fn is_underlined(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ─── Hyperlink ───────────────────────────────────────────────────────────────

/// An OSC 8 hyperlink target.
///
/// The optional `id` lets a terminal treat separated runs (say, a link
/// wrapped across two lines) as one link for hover highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hyperlink {
    pub uri: String,
    pub id: Option<String>,
}

impl Hyperlink {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&str> for Hyperlink {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for Hyperlink {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Visual style of a cell.
///
/// ```
/// use n_term::style::{Attr, Style, UnderlineStyle};
/// use n_term::color::Color;
///
/// let warn = Style::new()
///     .fg(Color::YELLOW)
///     .attrs(Attr::BOLD)
///     .underline(UnderlineStyle::Curly);
/// assert_ne!(warn, Style::EMPTY);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attr,
    pub underline: UnderlineStyle,
    pub hyperlink: Option<Hyperlink>,
}

impl Style {
    /// Default colors, no attributes, no underline, no link.
    pub const EMPTY: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
        attrs: Attr::empty(),
        underline: UnderlineStyle::None,
        hyperlink: None,
    };

    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[inline]
    #[must_use]
    pub fn fg(self, fg: Color) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub fn bg(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub fn attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub fn underline(self, underline: UnderlineStyle) -> Self {
        Self { underline, ..self }
    }

    #[must_use]
    pub fn hyperlink(self, link: impl Into<Hyperlink>) -> Self {
        Self {
            hyperlink: Some(link.into()),
            ..self
        }
    }

    /// Whether this style renders identically to a plain reset.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self == &Self::EMPTY
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
