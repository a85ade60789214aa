// SPDX-License-Identifier: MIT
//
// In-memory backend.
//
// Behaves like a terminal that accepts everything and answers nothing on its
// own: flushed bytes are collected for inspection, input is whatever the
// test (or embedding host) pushes into the queue, and the size is whatever
// it was told. Used to exercise the shared backend code without a TTY.

use std::io::Write;
use std::time::Duration;

use crate::backend::{self, Backend, BackendConfig, ResizeCallback, Session};
use crate::error::Result;
use crate::geometry::{Position, Size};
use crate::input::InputQueue;
use crate::mode2027;
use crate::output::OutputBuffer;

const DEFAULT_SIZE: Size = Size::new(80, 24);

pub struct HeadlessBackend {
    config: BackendConfig,
    pending: OutputBuffer,
    written: Vec<u8>,
    size: Size,
    cursor: Position,
    input: InputQueue,
    session: Session,
    on_resize: Option<ResizeCallback>,
    raw_mode: bool,
    closed: bool,
}

impl HeadlessBackend {
    /// An 80×24 terminal with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_SIZE, BackendConfig::default())
    }

    #[must_use]
    pub fn with_config(size: Size, config: BackendConfig) -> Self {
        Self {
            pending: OutputBuffer::with_capacity(config.output_capacity),
            config,
            written: Vec::new(),
            size,
            cursor: Position::ORIGIN,
            input: InputQueue::new(),
            session: Session::default(),
            on_resize: None,
            raw_mode: false,
            closed: false,
        }
    }

    /// Everything flushed so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.written
    }

    /// Flushed output as text, for assertions.
    #[must_use]
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    /// Drain the flushed output.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Bytes written but not yet flushed.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        self.pending.as_bytes()
    }

    /// The input queue. Push code points here to simulate typing, or to
    /// pre-seed a terminal reply. Closing it simulates a dead input source.
    #[must_use]
    pub const fn input(&self) -> &InputQueue {
        &self.input
    }

    /// Change the reported size and fire the resize callback.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        if let Some(callback) = &self.on_resize {
            callback();
        }
    }

    /// Set what `cursor_position` reports.
    pub const fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
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

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for HeadlessBackend {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.pending.flush_to(&mut self.written)?;
        Ok(())
    }

    fn size(&self) -> Result<Size> {
        Ok(self.size)
    }

    fn cursor_position(&mut self) -> Position {
        self.cursor
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        self.raw_mode = true;
        let timeout = self.config.mode2027_timeout;
        mode2027::negotiate(self, timeout)?;
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        mode2027::restore(self)?;
        self.raw_mode = false;
        Ok(())
    }

    fn on_resize(&mut self, callback: ResizeCallback) {
        self.on_resize = Some(callback);
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
        let result = backend::teardown(self);
        tracing::debug!(ok = result.is_ok(), "headless backend closed");
        result
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
