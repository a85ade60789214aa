// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell rendering.
//
// Two components work together to keep terminal I/O small:
//
//   OutputBuffer: accumulates ANSI bytes in memory so a whole render pass
//   can be handed to the backend as one `write_raw` call.
//
//   AnsiCellWriter: remembers the last style and hyperlink it emitted in
//   this pass and skips the SGR/OSC 8 sequences when the next cell matches.
//   A run of same-styled cells costs one SGR plus the symbols.
//
// The writer holds no sink. Every call takes the destination, and `finish`
// consumes the writer, so one pass is exactly one writer.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::Cell;
use crate::style::{Hyperlink, Style};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates ANSI output for a single write.
///
/// Default capacity: 16 KB, enough for most frames without reallocation.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: Vec<u8>,
}

pub(crate) const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Move the accumulated bytes out, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Write accumulated output to `w`, flush it, and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to or flushing `w` fails. The buffer is
    /// left intact in that case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        // No-op. Real flushing goes through flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── AnsiCellWriter ──────────────────────────────────────────────────────────

/// Per-pass style tracker that turns cells into ANSI bytes.
///
/// ```
/// use n_term::cell::Cell;
/// use n_term::color::Color;
/// use n_term::output::AnsiCellWriter;
/// use n_term::style::Style;
///
/// let red = Style::new().fg(Color::RED);
/// let mut out = Vec::new();
/// let mut writer = AnsiCellWriter::new();
/// writer.write_cell(&mut out, &Cell::new("o", red.clone())).unwrap();
/// writer.write_cell(&mut out, &Cell::new("k", red)).unwrap();
/// writer.finish(&mut out).unwrap();
///
/// assert_eq!(out, b"\x1b[0;31mok\x1b[0m");
/// ```
#[derive(Debug, Default)]
pub struct AnsiCellWriter {
    last_style: Option<Style>,
    last_hyperlink: Option<Hyperlink>,
}

impl AnsiCellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_style: None,
            last_hyperlink: None,
        }
    }

    /// Write one cell's escape sequences (if its style changed) and symbol.
    ///
    /// Continuation cells write nothing and leave the tracked state alone.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn write_cell(&mut self, out: &mut impl Write, cell: &Cell) -> io::Result<()> {
        if cell.is_continuation() {
            return Ok(());
        }

        let style = cell.style();
        if self.last_style.as_ref() != Some(style) {
            if self.last_hyperlink != style.hyperlink {
                if self.last_hyperlink.is_some() {
                    ansi::hyperlink_end(out)?;
                }
                if let Some(link) = &style.hyperlink {
                    ansi::hyperlink_start(out, link)?;
                }
                self.last_hyperlink.clone_from(&style.hyperlink);
            }
            ansi::style(out, style)?;
            self.last_style = Some(style.clone());
        }

        out.write_all(cell.symbol().as_bytes())
    }

    /// End the pass: close any open hyperlink, then reset.
    ///
    /// The reset is written even if no cell was.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn finish(self, out: &mut impl Write) -> io::Result<()> {
        if self.last_hyperlink.is_some() {
            ansi::hyperlink_end(out)?;
        }
        ansi::reset(out)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::style::Attr;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_new_is_empty() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
    }

    #[test]
    fn output_buffer_clear_keeps_capacity() {
        let mut buf = OutputBuffer::with_capacity(64);
        buf.write_all(b"abc").unwrap();
        let cap = buf.buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), cap);
    }

    #[test]
    fn output_buffer_take_empties() {
        let mut buf = OutputBuffer::new();
        buf.write_all(b"xyz").unwrap();
        assert_eq!(buf.take(), b"xyz");
        assert!(buf.is_empty());
    }

    #[test]
    fn output_buffer_flush_to() {
        let mut buf = OutputBuffer::new();
        buf.write_all(b"\x1b[0m").unwrap();
        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"\x1b[0m");
        assert!(buf.is_empty());
    }

    #[test]
    fn output_buffer_flush_to_empty_is_noop() {
        let mut buf = OutputBuffer::new();
        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert!(sink.is_empty());
    }

    // ── AnsiCellWriter ──────────────────────────────────────────────────

    fn render(cells: &[Cell]) -> String {
        let mut out = Vec::new();
        let mut writer = AnsiCellWriter::new();
        for cell in cells {
            writer.write_cell(&mut out, cell).unwrap();
        }
        writer.finish(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sgr(style: &Style) -> String {
        let mut out = Vec::new();
        ansi::style(&mut out, style).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn osc8(link: &Hyperlink) -> String {
        let mut out = Vec::new();
        ansi::hyperlink_start(&mut out, link).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn single_cell_emits_style_and_symbol() {
        let red = Style::new().fg(Color::RED);
        let out = render(&[Cell::new("A", red.clone())]);
        assert_eq!(out, format!("{}A{}", sgr(&red), ansi::RESET));
    }

    #[test]
    fn same_style_emitted_once() {
        let green = Style::new().fg(Color::GREEN);
        let out = render(&[Cell::new("A", green.clone()), Cell::new("B", green.clone())]);
        assert_eq!(out.matches(&sgr(&green)).count(), 1);
        assert!(out.contains("AB"));
    }

    #[test]
    fn first_plain_cell_still_emits_sgr() {
        let out = render(&[Cell::plain("x")]);
        assert_eq!(out, "\x1b[0mx\x1b[0m");
    }

    #[test]
    fn continuation_cell_is_skipped() {
        let out = render(&[Cell::plain("A"), Cell::CONTINUATION, Cell::plain("B")]);
        assert_eq!(out, "\x1b[0mAB\x1b[0m");
    }

    #[test]
    fn continuation_does_not_disturb_tracked_style() {
        let bold = Style::new().attrs(Attr::BOLD);
        let out = render(&[
            Cell::new("世", bold.clone()),
            Cell::CONTINUATION,
            Cell::new("x", bold.clone()),
        ]);
        assert_eq!(out, format!("{}世x{}", sgr(&bold), ansi::RESET));
    }

    #[test]
    fn finish_with_no_cells_is_reset_only() {
        let mut out = Vec::new();
        AnsiCellWriter::new().finish(&mut out).unwrap();
        assert_eq!(out, ansi::RESET.as_bytes());
    }

    #[test]
    fn hyperlink_cell_emits_osc8_start_and_end() {
        let link = Hyperlink::new("https://example.com");
        let style = Style::new().hyperlink(link.clone());
        let out = render(&[Cell::new("X", style.clone())]);
        assert_eq!(
            out,
            format!(
                "{}{}X{}{}",
                osc8(&link),
                sgr(&style),
                ansi::HYPERLINK_END,
                ansi::RESET
            )
        );
    }

    #[test]
    fn finish_closes_hyperlink_before_reset() {
        let out = render(&[Cell::new("A", Style::new().hyperlink("https://x"))]);
        assert!(out.ends_with(&format!("{}{}", ansi::HYPERLINK_END, ansi::RESET)));
    }

    #[test]
    fn hyperlink_transition_emits_end_then_start() {
        let a = Hyperlink::new("https://a.example");
        let b = Hyperlink::new("https://b.example");
        let out = render(&[
            Cell::new("A", Style::new().hyperlink(a)),
            Cell::new("B", Style::new().hyperlink(b.clone())),
        ]);
        let end = out.find(ansi::HYPERLINK_END).unwrap();
        let start_b = out.find(&osc8(&b)).unwrap();
        assert!(start_b > end);
    }

    #[test]
    fn hyperlink_to_plain_emits_end() {
        let out = render(&[
            Cell::new("A", Style::new().hyperlink("https://x")),
            Cell::new("B", Style::new().fg(Color::RED)),
        ]);
        let end = out.find(ansi::HYPERLINK_END).unwrap();
        assert!(end < out.find('B').unwrap());
        // Closed once mid-pass, not again at finish.
        assert_eq!(out.matches(ansi::HYPERLINK_END).count(), 1);
    }

    #[test]
    fn same_hyperlink_different_color_keeps_link_open() {
        let link = Hyperlink::new("https://x");
        let out = render(&[
            Cell::new("A", Style::new().hyperlink(link.clone())),
            Cell::new("B", Style::new().fg(Color::RED).hyperlink(link.clone())),
        ]);
        assert_eq!(out.matches(&osc8(&link)).count(), 1);
        assert_eq!(out.matches(ansi::HYPERLINK_END).count(), 1);
    }

    #[test]
    fn multiple_style_changes_each_emit() {
        let red = Style::new().fg(Color::RED);
        let blue = Style::new().fg(Color::BLUE);
        let out = render(&[Cell::new("R", red.clone()), Cell::new("B", blue.clone())]);
        assert_eq!(
            out,
            format!("{}R{}B{}", sgr(&red), sgr(&blue), ansi::RESET)
        );
    }

    fn arb_style() -> impl Strategy<Value = Style> {
        (0u8..16, 0u8..16, any::<u8>()).prop_map(|(fg, bg, attrs)| {
            Style::new()
                .fg(Color::Ansi256(fg))
                .bg(Color::Ansi256(bg))
                .attrs(Attr::from_bits_truncate(attrs))
        })
    }

    proptest! {
        // One SGR per run of equal styles, never more.
        #[test]
        fn sgr_count_matches_style_runs(styles in prop::collection::vec(arb_style(), 0..40)) {
            let cells: Vec<Cell> = styles.iter().map(|s| Cell::new("x", s.clone())).collect();
            let out = render(&cells);

            let runs = styles.windows(2).filter(|w| w[0] != w[1]).count()
                + usize::from(!styles.is_empty());
            // Every SGR starts with "\x1b[0"; the trailing reset is one more.
            prop_assert_eq!(out.matches("\x1b[0").count(), runs + 1);
            prop_assert_eq!(out.matches('x').count(), styles.len());
            prop_assert!(out.ends_with(ansi::RESET));
        }
    }
}
