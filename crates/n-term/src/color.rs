// SPDX-License-Identifier: MIT
//
// Terminal colors as they go over the wire.
//
// A `Color` is exactly what a terminal can be told: "use your default",
// "use palette entry N", or "use this 24-bit RGB value". No color math,
// no alpha. Resolving themes and blending is the caller's business. The
// encoder only needs to know which SGR parameters each variant maps to.

use std::fmt;
use std::io::{self, Write};

/// A color as understood by the terminal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// ANSI 256-color palette index. 0–7 standard, 8–15 bright.
    Ansi256(u8),

    /// Terminal default color (inherits from the user's theme).
    #[default]
    Default,
}

impl Color {
    pub const BLACK: Self = Self::Ansi256(0);
    pub const RED: Self = Self::Ansi256(1);
    pub const GREEN: Self = Self::Ansi256(2);
    pub const YELLOW: Self = Self::Ansi256(3);
    pub const BLUE: Self = Self::Ansi256(4);
    pub const MAGENTA: Self = Self::Ansi256(5);
    pub const CYAN: Self = Self::Ansi256(6);
    pub const WHITE: Self = Self::Ansi256(7);
    pub const GRAY: Self = Self::Ansi256(8);

    /// Parse `#RGB` or `#RRGGBB` (the `#` is optional).
    ///
    /// ```
    /// use n_term::color::Color;
    ///
    /// assert_eq!(Color::hex("#ff8000"), Some(Color::Rgb(255, 128, 0)));
    /// assert_eq!(Color::hex("0f0"), Some(Color::Rgb(0, 255, 0)));
    /// assert_eq!(Color::hex("nope"), None);
    /// ```
    #[must_use]
    pub fn hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let b = s.as_bytes();

        match b.len() {
            3 => {
                let r = parse_hex_digit(b[0])?;
                let g = parse_hex_digit(b[1])?;
                let bl = parse_hex_digit(b[2])?;
                Some(Self::Rgb(r << 4 | r, g << 4 | g, bl << 4 | bl))
            }
            6 => Some(Self::Rgb(
                parse_hex_byte(&b[0..2])?,
                parse_hex_byte(&b[2..4])?,
                parse_hex_byte(&b[4..6])?,
            )),
            _ => None,
        }
    }

    /// Whether this is the terminal default (emits no SGR parameter).
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Append this color's foreground SGR parameters, prefixed with `;`.
    ///
    /// Standard colors use the compact forms (30–37, 90–97), palette
    /// indices 16–255 use `38;5;N`, RGB uses `38;2;R;G;B`. `Default`
    /// writes nothing: a style sequence always starts from a reset.
    pub(crate) fn write_fg_params(self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Self::Default => Ok(()),
            Self::Ansi256(idx) if idx < 8 => write!(w, ";{}", 30 + u16::from(idx)),
            Self::Ansi256(idx) if idx < 16 => write!(w, ";{}", 82 + u16::from(idx)),
            Self::Ansi256(idx) => write!(w, ";38;5;{idx}"),
            Self::Rgb(r, g, b) => write!(w, ";38;2;{r};{g};{b}"),
        }
    }

    /// Background counterpart of [`write_fg_params`](Self::write_fg_params)
    /// (40–47, 100–107, `48;5;N`, `48;2;R;G;B`).
    pub(crate) fn write_bg_params(self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Self::Default => Ok(()),
            Self::Ansi256(idx) if idx < 8 => write!(w, ";{}", 40 + u16::from(idx)),
            Self::Ansi256(idx) if idx < 16 => write!(w, ";{}", 92 + u16::from(idx)),
            Self::Ansi256(idx) => write!(w, ";48;5;{idx}"),
            Self::Rgb(r, g, b) => write!(w, ";48;2;{r};{g};{b}"),
        }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[inline]
const fn parse_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[inline]
fn parse_hex_byte(bytes: &[u8]) -> Option<u8> {
    let hi = parse_hex_digit(bytes[0])?;
    let lo = parse_hex_digit(bytes[1])?;
    Some(hi << 4 | lo)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
