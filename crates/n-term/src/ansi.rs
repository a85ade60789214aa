// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit: that's the `AnsiCellWriter`'s job. This
// module just knows the byte-level encoding of every terminal command a
// backend needs.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal. Count-parameterized commands write nothing for a count
// of zero, since `CSI 0 A` means "move one" on most terminals.
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `OutputBuffer` (backed by a Vec).

use std::io::{self, Write};

use crate::style::{Attr, Hyperlink, Style, UnderlineStyle};

/// SGR 0. Ends every render pass.
pub const RESET: &str = "\x1b[0m";

/// OSC 8 with an empty URI: closes the open hyperlink.
pub const HYPERLINK_END: &str = "\x1b]8;;\x1b\\";

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using CUP.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor to the top-left corner.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

#[inline]
fn csi_count(w: &mut impl Write, n: u16, final_byte: char) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}{final_byte}")
}

/// CUU: move up `n` rows.
#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'A')
}

/// CUD: move down `n` rows.
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'B')
}

/// CUF: move right `n` columns.
#[inline]
pub fn cursor_right(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'C')
}

/// CUB: move left `n` columns.
#[inline]
pub fn cursor_left(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'D')
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2). Does not move the cursor.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// EL 0: erase from the cursor to the end of the line.
#[inline]
pub fn erase_to_end_of_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

/// SU: scroll the page up `n` lines.
#[inline]
pub fn scroll_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'S')
}

/// SD: scroll the page down `n` lines.
#[inline]
pub fn scroll_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'T')
}

/// IL: insert `n` blank lines at the cursor row.
#[inline]
pub fn insert_lines(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'L')
}

/// DL: delete `n` lines starting at the cursor row.
#[inline]
pub fn delete_lines(w: &mut impl Write, n: u16) -> io::Result<()> {
    csi_count(w, n, 'M')
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// Enable mouse reporting: clicks (1000), drags (1002), and both the urxvt
/// (1015) and SGR (1006) coordinate encodings.
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h")?;
    w.write_all(b"\x1b[?1002h")?;
    w.write_all(b"\x1b[?1015h")?;
    w.write_all(b"\x1b[?1006h")
}

/// Disable mouse reporting, in the reverse order of [`enable_mouse`].
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l")?;
    w.write_all(b"\x1b[?1015l")?;
    w.write_all(b"\x1b[?1002l")?;
    w.write_all(b"\x1b[?1000l")
}

// ─── Grapheme Clusters (Mode 2027) ──────────────────────────────────────────

/// DECRQM for mode 2027. The terminal answers with `CSI ?2027;Ps$y`.
#[inline]
pub fn query_grapheme_clusters(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2027$p")
}

/// Ask the terminal to segment by grapheme cluster.
#[inline]
pub fn enable_grapheme_clusters(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2027h")
}

#[inline]
pub fn disable_grapheme_clusters(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2027l")
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(RESET.as_bytes())
}

/// Emit the complete SGR for `style` as one sequence.
///
/// The sequence always opens with the reset parameter, so it never depends
/// on what the terminal had before: `\x1b[0;1;3;4:3;31;48;5;42m` is bold,
/// italic, curly underline, red on palette 42. A plain style is `\x1b[0m`.
/// The hyperlink is not part of SGR; see [`hyperlink_start`].
pub fn style(w: &mut impl Write, style: &Style) -> io::Result<()> {
    w.write_all(b"\x1b[0")?;

    for (flag, code) in Attr::SGR_CODES {
        if style.attrs.contains(flag) {
            write!(w, ";{code}")?;
        }
    }

    match style.underline {
        UnderlineStyle::None => {}
        UnderlineStyle::Straight => w.write_all(b";4")?,
        other => write!(w, ";4:{}", other as u8)?,
    }

    style.fg.write_fg_params(w)?;
    style.bg.write_bg_params(w)?;
    w.write_all(b"m")
}

// ─── Hyperlinks (OSC 8) ─────────────────────────────────────────────────────

/// Open an OSC 8 hyperlink. Text written until [`hyperlink_end`] is the
/// clickable label.
pub fn hyperlink_start(w: &mut impl Write, link: &Hyperlink) -> io::Result<()> {
    match &link.id {
        Some(id) => write!(w, "\x1b]8;id={id};{}\x1b\\", link.uri),
        None => write!(w, "\x1b]8;;{}\x1b\\", link.uri),
    }
}

/// Close the open OSC 8 hyperlink.
#[inline]
pub fn hyperlink_end(w: &mut impl Write) -> io::Result<()> {
    w.write_all(HYPERLINK_END.as_bytes())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use pretty_assertions::assert_eq;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_to_origin() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
    }

    #[test]
    fn cursor_to_is_row_then_column() {
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
        assert_eq!(emit(|w| cursor_to(w, 5, 3)), "\x1b[4;6H");
    }

    #[test]
    fn cursor_to_max_does_not_overflow() {
        assert_eq!(
            emit(|w| cursor_to(w, u16::MAX, u16::MAX)),
            "\x1b[65536;65536H"
        );
    }

    #[test]
    fn relative_moves() {
        assert_eq!(emit(|w| cursor_up(w, 3)), "\x1b[3A");
        assert_eq!(emit(|w| cursor_down(w, 1)), "\x1b[1B");
        assert_eq!(emit(|w| cursor_right(w, 12)), "\x1b[12C");
        assert_eq!(emit(|w| cursor_left(w, 2)), "\x1b[2D");
    }

    #[test]
    fn zero_counts_emit_nothing() {
        assert_eq!(emit(|w| cursor_up(w, 0)), "");
        assert_eq!(emit(|w| cursor_left(w, 0)), "");
        assert_eq!(emit(|w| scroll_up(w, 0)), "");
        assert_eq!(emit(|w| scroll_down(w, 0)), "");
        assert_eq!(emit(|w| insert_lines(w, 0)), "");
        assert_eq!(emit(|w| delete_lines(w, 0)), "");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    // ── Screen ──────────────────────────────────────────────────────────

    #[test]
    fn screen_sequences() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
        assert_eq!(emit(|w| cursor_home(w)), "\x1b[H");
        assert_eq!(emit(|w| erase_to_end_of_line(w)), "\x1b[K");
    }

    #[test]
    fn scroll_and_line_editing() {
        assert_eq!(emit(|w| scroll_up(w, 2)), "\x1b[2S");
        assert_eq!(emit(|w| scroll_down(w, 4)), "\x1b[4T");
        assert_eq!(emit(|w| insert_lines(w, 1)), "\x1b[1L");
        assert_eq!(emit(|w| delete_lines(w, 7)), "\x1b[7M");
    }

    #[test]
    fn alt_screen_sequences() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
    }

    #[test]
    fn mouse_enable_order() {
        assert_eq!(
            emit(|w| enable_mouse(w)),
            "\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h"
        );
    }

    #[test]
    fn mouse_disable_is_reverse_order() {
        assert_eq!(
            emit(|w| disable_mouse(w)),
            "\x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l"
        );
    }

    #[test]
    fn grapheme_cluster_sequences() {
        assert_eq!(emit(|w| query_grapheme_clusters(w)), "\x1b[?2027$p");
        assert_eq!(emit(|w| enable_grapheme_clusters(w)), "\x1b[?2027h");
        assert_eq!(emit(|w| disable_grapheme_clusters(w)), "\x1b[?2027l");
    }

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn reset_sequence() {
        assert_eq!(emit(|w| reset(w)), "\x1b[0m");
    }

    #[test]
    fn plain_style_is_bare_reset() {
        assert_eq!(emit(|w| style(w, &Style::EMPTY)), "\x1b[0m");
    }

    #[test]
    fn style_fg_only() {
        let s = Style::new().fg(Color::RED);
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;31m");
    }

    #[test]
    fn style_bg_rgb() {
        let s = Style::new().bg(Color::Rgb(1, 2, 3));
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;48;2;1;2;3m");
    }

    #[test]
    fn style_attrs_in_sgr_order() {
        let s = Style::new().attrs(Attr::STRIKETHROUGH | Attr::BOLD | Attr::ITALIC);
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;1;3;9m");
    }

    #[test]
    fn style_all_attrs() {
        let s = Style::new().attrs(Attr::all());
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;1;2;3;5;6;7;8;9m");
    }

    #[test]
    fn style_straight_underline_is_plain_sgr_4() {
        let s = Style::new().underline(UnderlineStyle::Straight);
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;4m");
    }

    #[test]
    fn style_extended_underlines() {
        let cases = [
            (UnderlineStyle::Double, "\x1b[0;4:2m"),
            (UnderlineStyle::Curly, "\x1b[0;4:3m"),
            (UnderlineStyle::Dotted, "\x1b[0;4:4m"),
            (UnderlineStyle::Dashed, "\x1b[0;4:5m"),
        ];
        for (underline, expected) in cases {
            let s = Style::new().underline(underline);
            assert_eq!(emit(|w| style(w, &s)), expected, "{underline:?}");
        }
    }

    #[test]
    fn style_full_parameter_order() {
        let s = Style::new()
            .attrs(Attr::BOLD)
            .underline(UnderlineStyle::Curly)
            .fg(Color::Ansi256(9))
            .bg(Color::Ansi256(200));
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;1;4:3;91;48;5;200m");
    }

    #[test]
    fn style_ignores_hyperlink() {
        let s = Style::new().fg(Color::BLUE).hyperlink("https://x");
        assert_eq!(emit(|w| style(w, &s)), "\x1b[0;34m");
    }

    // ── Hyperlinks ──────────────────────────────────────────────────────

    #[test]
    fn hyperlink_without_id() {
        let link = Hyperlink::new("https://example.com");
        assert_eq!(
            emit(|w| hyperlink_start(w, &link)),
            "\x1b]8;;https://example.com\x1b\\"
        );
    }

    #[test]
    fn hyperlink_with_id() {
        let link = Hyperlink::new("https://example.com").with_id("doc-1");
        assert_eq!(
            emit(|w| hyperlink_start(w, &link)),
            "\x1b]8;id=doc-1;https://example.com\x1b\\"
        );
    }

    #[test]
    fn hyperlink_end_sequence() {
        assert_eq!(emit(|w| hyperlink_end(w)), "\x1b]8;;\x1b\\");
    }
}
