// SPDX-License-Identifier: MIT
//
// `n_term::Backend` over crossterm.
//
// crossterm owns raw mode, the size query and input parsing; everything the
// backend writes is n-term's own encoding, buffered and sent to stdout in
// one write per flush. Input is read on a background thread and re-encoded
// into the raw code-point stream (see `input`).
//
// crossterm's parser drops DECRPM replies, so Mode 2027 negotiation
// normally ends as `Unknown` and the mode stays off.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::tty::IsTty;
use crossterm::{cursor, terminal};
use n_term::backend::{self, Backend, BackendConfig, ResizeCallback, Session};
use n_term::output::OutputBuffer;
use n_term::reader::ReaderThread;
use n_term::{Error, InputQueue, Position, ResizeSlot, Result, Size, mode2027};

use crate::input;

pub struct CrosstermBackend {
    out: OutputBuffer,
    stdout: io::Stdout,
    session: Session,
    config: BackendConfig,
    input: InputQueue,
    resize: ResizeSlot,
    reader: Option<ReaderThread>,
    raw_mode: bool,
    closed: bool,
}

impl CrosstermBackend {
    /// # Errors
    ///
    /// [`Error::Init`] if stdout is not a terminal or the event thread
    /// can't be started.
    pub fn new() -> Result<Self> {
        Self::with_config(BackendConfig::default())
    }

    /// # Errors
    ///
    /// [`Error::Init`] if stdout is not a terminal, its size can't be read,
    /// or the event thread can't be started.
    pub fn with_config(config: BackendConfig) -> Result<Self> {
        let stdout = io::stdout();
        require_terminal(stdout.is_tty())?;
        terminal::size().map_err(Error::Init)?;

        let input = InputQueue::new();
        let resize = ResizeSlot::new();

        let queue = input.clone();
        let slot = resize.clone();
        let reader = ReaderThread::spawn("n-crossterm-events", move |stop| {
            input::event_loop(&queue, &slot, &stop);
        })
        .map_err(Error::Init)?;

        tracing::debug!("crossterm backend opened");
        Ok(Self {
            out: OutputBuffer::with_capacity(config.output_capacity),
            stdout,
            session: Session::default(),
            config,
            input,
            resize,
            reader: Some(reader),
            raw_mode: false,
            closed: false,
        })
    }

    #[must_use]
    pub const fn is_raw_mode(&self) -> bool {
        self.raw_mode
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

fn require_terminal(is_tty: bool) -> Result<()> {
    if is_tty {
        Ok(())
    } else {
        Err(Error::Init(io::Error::new(
            io::ErrorKind::Unsupported,
            "stdout is not a terminal",
        )))
    }
}

impl Backend for CrosstermBackend {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let result = self.out.flush_to(&mut self.stdout.lock());
        // A failed frame is dropped, not retried.
        self.out.clear();
        result.map_err(Error::Write)
    }

    fn size(&self) -> Result<Size> {
        let (width, height) = terminal::size().map_err(Error::SizeQuery)?;
        Ok(Size::new(width, height))
    }

    /// Falls back to the origin when the terminal doesn't answer.
    fn cursor_position(&mut self) -> Position {
        match cursor::position() {
            Ok((x, y)) => Position::new(x, y),
            Err(e) => {
                tracing::debug!(error = %e, "cursor position query failed");
                Position::ORIGIN
            }
        }
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        if !self.raw_mode {
            terminal::enable_raw_mode().map_err(|source| Error::TerminalUnavailable {
                call: "enable_raw_mode",
                source,
            })?;
            self.raw_mode = true;
            tracing::debug!("raw mode enabled");
        }
        let timeout = self.config.mode2027_timeout;
        mode2027::negotiate(self, timeout)?;
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        mode2027::restore(self)?;
        if self.raw_mode {
            terminal::disable_raw_mode().map_err(|source| Error::TerminalUnavailable {
                call: "disable_raw_mode",
                source,
            })?;
            self.raw_mode = false;
            tracing::debug!("raw mode disabled");
        }
        Ok(())
    }

    fn on_resize(&mut self, callback: ResizeCallback) {
        self.resize.set(callback);
    }

    fn read(&mut self, timeout: Option<Duration>) -> Result<Option<char>> {
        self.input.pop(timeout)
    }

    fn peek(&mut self, _timeout: Option<Duration>) -> Result<Option<char>> {
        Ok(self.input.peek())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let restored = backend::teardown(self);
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        tracing::debug!(ok = restored.is_ok(), "crossterm backend closed");
        restored
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
