// SPDX-License-Identifier: MIT
//
// The backend contract and the render path shared by every backend.
//
// A backend supplies a handful of raw primitives: push bytes, flush them,
// report the size, switch raw mode, deliver input. Everything else (cursor
// movement, screen modes, scrolling, and the cell renderer) is written here
// once in terms of `write_raw`, so every backend produces the same bytes for
// the same request.
//
// Output is buffered by the backend until `flush`. Operations that change
// terminal modes flush immediately; content and cursor movement don't, so a
// frame can be assembled and pushed out in one go.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::ansi;
use crate::cell::CellUpdate;
use crate::error::Result;
use crate::geometry::{Position, Size};
use crate::mode2027::{self, Mode2027Status};
use crate::output::{self, AnsiCellWriter, OutputBuffer};

/// Invoked from the backend's notification thread when the terminal is
/// resized. Re-query `size()` to get the new dimensions.
pub type ResizeCallback = Box<dyn Fn() + Send + Sync>;

/// Shared home of the resize callback: the backend registers into it, the
/// notification thread fires it. Registering replaces the previous callback.
///
/// The callback runs with the slot unlocked, so it may register a
/// replacement, and `set` never waits for a callback in progress.
#[derive(Clone, Default)]
pub struct ResizeSlot(Arc<Mutex<Option<Arc<dyn Fn() + Send + Sync>>>>);

impl ResizeSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, callback: ResizeCallback) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::from(callback));
    }

    /// Run the current callback, if any.
    pub fn notify(&self) {
        let current = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = current {
            callback();
        }
    }
}

impl std::fmt::Debug for ResizeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = self
            .0
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("ResizeSlot").field("set", &set).finish()
    }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Construction-time knobs shared by all backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// How long `enable_raw_mode` waits for the mode 2027 reply.
    pub mode2027_timeout: Duration,
    /// Initial capacity of the pending output buffer.
    pub output_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode2027_timeout: mode2027::DEFAULT_TIMEOUT,
            output_capacity: output::DEFAULT_CAPACITY,
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub const fn with_mode2027_timeout(mut self, timeout: Duration) -> Self {
        self.mode2027_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Terminal modes a backend has switched on and not yet off.
///
/// `close()` reads these to know what to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub alternate_screen: bool,
    pub mouse_capture: bool,
    pub grapheme_clusters: bool,
    /// Last mode 2027 query result; `None` until raw mode was entered once.
    pub mode2027: Option<Mode2027Status>,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

fn encode(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(16);
    f(&mut buf)?;
    Ok(buf)
}

/// A terminal the application can draw to and read from.
///
/// Implementors provide the primitives; the provided methods encode the
/// standard sequences on top of [`write_raw`](Backend::write_raw).
pub trait Backend: Send {
    // ── Primitives ──────────────────────────────────────────────────────

    /// Append bytes to the pending output. Nothing reaches the terminal
    /// until [`flush`](Backend::flush).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`](crate::Error::Write) if the sink rejects the bytes.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push pending output to the terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`](crate::Error::Write) on I/O failure.
    fn flush(&mut self) -> Result<()>;

    /// Current terminal dimensions.
    ///
    /// # Errors
    ///
    /// [`Error::SizeQuery`](crate::Error::SizeQuery) when the underlying
    /// query fails; [`Error::is_terminal_unavailable`](crate::Error::is_terminal_unavailable)
    /// holds for it. Never guesses a default.
    fn size(&self) -> Result<Size>;

    /// Best-effort cursor position; [`Position::ORIGIN`] when unknown.
    fn cursor_position(&mut self) -> Position;

    fn session(&self) -> &Session;

    fn session_mut(&mut self) -> &mut Session;

    /// Enter raw mode, then negotiate mode 2027.
    ///
    /// # Errors
    ///
    /// Fails if the OS mode switch fails or the query can't be written.
    fn enable_raw_mode(&mut self) -> Result<()>;

    /// Turn mode 2027 off if it was on, then restore the OS mode.
    ///
    /// # Errors
    ///
    /// Fails if the disable sequence can't be written or the OS call fails.
    fn disable_raw_mode(&mut self) -> Result<()>;

    /// Register the resize callback, replacing any previous one.
    fn on_resize(&mut self, callback: ResizeCallback);

    /// Next input code point.
    ///
    /// `None` blocks, `Some(Duration::ZERO)` polls, `Some(d)` waits up to
    /// `d`. `Ok(None)` means the wait ran out.
    ///
    /// # Errors
    ///
    /// Implementations may report a dead input source.
    fn read(&mut self, timeout: Option<Duration>) -> Result<Option<char>>;

    /// Next input code point without consuming it. Never blocks: the
    /// timeout is accepted for symmetry with [`read`](Backend::read) and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Implementations may report a dead input source.
    fn peek(&mut self, timeout: Option<Duration>) -> Result<Option<char>>;

    /// Undo every mode in the session, restore the terminal, and release
    /// the handle. A second call does nothing.
    ///
    /// # Errors
    ///
    /// A release failure, else the first failure during teardown. The
    /// handle is released either way; a teardown failure is logged.
    fn close(&mut self) -> Result<()>;

    // ── Screen ──────────────────────────────────────────────────────────

    /// Erase the screen and home the cursor. Flushes.
    ///
    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn clear(&mut self) -> Result<()> {
        let bytes = encode(|w| {
            ansi::clear_screen(w)?;
            ansi::cursor_home(w)
        })?;
        self.write_raw(&bytes)?;
        self.flush()
    }

    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn show_cursor(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_show(w))?)?;
        self.flush()
    }

    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn hide_cursor(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_hide(w))?)?;
        self.flush()
    }

    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn enter_alternate_screen(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::enter_alt_screen(w))?)?;
        self.flush()?;
        self.session_mut().alternate_screen = true;
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn leave_alternate_screen(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::exit_alt_screen(w))?)?;
        self.flush()?;
        self.session_mut().alternate_screen = false;
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn enable_mouse_capture(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::enable_mouse(w))?)?;
        self.flush()?;
        self.session_mut().mouse_capture = true;
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn disable_mouse_capture(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::disable_mouse(w))?)?;
        self.flush()?;
        self.session_mut().mouse_capture = false;
        Ok(())
    }

    /// Scroll the page up `n` lines. Flushes; `0` does nothing.
    ///
    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn scroll_up(&mut self, n: u16) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.write_raw(&encode(|w| ansi::scroll_up(w, n))?)?;
        self.flush()
    }

    /// Scroll the page down `n` lines. Flushes; `0` does nothing.
    ///
    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn scroll_down(&mut self, n: u16) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.write_raw(&encode(|w| ansi::scroll_down(w, n))?)?;
        self.flush()
    }

    // ── Buffered editing and movement ───────────────────────────────────

    /// # Errors
    ///
    /// Propagates write errors.
    fn insert_lines(&mut self, n: u16) -> Result<()> {
        self.write_raw(&encode(|w| ansi::insert_lines(w, n))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn delete_lines(&mut self, n: u16) -> Result<()> {
        self.write_raw(&encode(|w| ansi::delete_lines(w, n))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn move_cursor_up(&mut self, n: u16) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_up(w, n))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn move_cursor_down(&mut self, n: u16) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_down(w, n))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn move_cursor_right(&mut self, n: u16) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_right(w, n))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn move_cursor_left(&mut self, n: u16) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_left(w, n))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn erase_to_end_of_line(&mut self) -> Result<()> {
        self.write_raw(&encode(|w| ansi::erase_to_end_of_line(w))?)
    }

    /// # Errors
    ///
    /// Propagates write errors.
    fn carriage_return(&mut self) -> Result<()> {
        self.write_raw(b"\r")
    }

    /// Write `text` verbatim at the cursor.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.write_raw(text.as_bytes())
    }
}

// ─── Render ──────────────────────────────────────────────────────────────────

/// Cell rendering, identical for every backend.
///
/// Blanket-implemented for all [`Backend`]s (trait objects included), so a
/// backend cannot substitute its own encoding.
pub trait Render {
    /// Draw `updates` in the given order.
    ///
    /// Each non-continuation cell gets a cursor move to its position, then
    /// its style (when it changed) and symbol. The pass ends with a reset.
    /// Output is left pending; call `flush` to show it.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    fn draw<'a, I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CellUpdate>;

    /// Move the cursor to `pos` and flush.
    ///
    /// # Errors
    ///
    /// Propagates write/flush errors.
    fn set_cursor_position(&mut self, pos: Position) -> Result<()>;
}

/// Rough bytes per drawn cell: the CUP, an occasional SGR, the symbol.
const DRAW_BYTES_PER_CELL: usize = 16;

/// Scratch size for one pass, capped at the default output buffer size.
fn draw_capacity(cells: usize) -> usize {
    cells
        .saturating_mul(DRAW_BYTES_PER_CELL)
        .clamp(DRAW_BYTES_PER_CELL, output::DEFAULT_CAPACITY)
}

impl<B: Backend + ?Sized> Render for B {
    fn draw<'a, I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CellUpdate>,
    {
        let updates = updates.into_iter();
        let mut out = OutputBuffer::with_capacity(draw_capacity(updates.size_hint().0));
        let mut writer = AnsiCellWriter::new();
        for update in updates {
            if update.cell.is_continuation() {
                continue;
            }
            ansi::cursor_to(&mut out, update.x, update.y)?;
            writer.write_cell(&mut out, &update.cell)?;
        }
        writer.finish(&mut out)?;
        self.write_raw(out.as_bytes())
    }

    fn set_cursor_position(&mut self, pos: Position) -> Result<()> {
        self.write_raw(&encode(|w| ansi::cursor_to(w, pos.x, pos.y))?)?;
        self.flush()
    }
}

// ─── Teardown ────────────────────────────────────────────────────────────────

/// The fixed restore sequence every `close()` runs before releasing its
/// handle: reset style, drop mouse capture, leave the alternate screen, show
/// the cursor, leave raw mode, flush.
///
/// Stops at the first failure. The caller releases the handle regardless.
///
/// # Errors
///
/// The first write, flush, or raw-mode error.
pub fn teardown<B: Backend + ?Sized>(backend: &mut B) -> Result<()> {
    backend.write_raw(ansi::RESET.as_bytes())?;
    if backend.session().mouse_capture {
        backend.disable_mouse_capture()?;
    }
    if backend.session().alternate_screen {
        backend.leave_alternate_screen()?;
    }
    backend.show_cursor()?;
    backend.disable_raw_mode()?;
    backend.flush()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
