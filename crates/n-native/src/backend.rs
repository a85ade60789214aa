// SPDX-License-Identifier: MIT
//
// `n_term::Backend` over a platform terminal.
//
// Output accumulates in an `OutputBuffer` and goes to the terminal in one
// write per flush. Raw mode, size, resize and input are delegated to the
// platform terminal; Mode 2027 negotiation and teardown come from n-term.

use std::io::Write;
use std::time::Duration;

use n_term::backend::{self, Backend, BackendConfig, ResizeCallback, Session};
use n_term::output::OutputBuffer;
use n_term::{Position, Result, Size, mode2027};

use crate::SystemTerminal;
use crate::platform::PlatformTerminal;

pub struct NativeBackend<T: PlatformTerminal = SystemTerminal> {
    terminal: T,
    out: OutputBuffer,
    session: Session,
    config: BackendConfig,
    closed: bool,
}

impl NativeBackend {
    /// Open the controlling terminal with default configuration.
    ///
    /// # Errors
    ///
    /// [`n_term::Error::Init`] if no terminal is available.
    pub fn new() -> Result<Self> {
        Self::with_config(BackendConfig::default())
    }

    /// # Errors
    ///
    /// [`n_term::Error::Init`] if no terminal is available.
    pub fn with_config(config: BackendConfig) -> Result<Self> {
        Ok(Self::from_terminal(SystemTerminal::open()?, config))
    }
}

impl<T: PlatformTerminal> NativeBackend<T> {
    /// Wrap an already opened platform terminal.
    #[must_use]
    pub fn from_terminal(terminal: T, config: BackendConfig) -> Self {
        Self {
            terminal,
            out: OutputBuffer::with_capacity(config.output_capacity),
            session: Session::default(),
            config,
            closed: false,
        }
    }

    #[must_use]
    pub const fn terminal(&self) -> &T {
        &self.terminal
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T: PlatformTerminal> Backend for NativeBackend<T> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.out.is_empty() {
            return Ok(());
        }
        let result = self.terminal.write(self.out.as_bytes());
        self.out.clear();
        result
    }

    fn size(&self) -> Result<Size> {
        self.terminal.size()
    }

    /// Not queried; a DSR round trip would race the input thread.
    fn cursor_position(&mut self) -> Position {
        Position::ORIGIN
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        self.terminal.enable_raw_mode()?;
        let timeout = self.config.mode2027_timeout;
        mode2027::negotiate(self, timeout)?;
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        mode2027::restore(self)?;
        self.terminal.disable_raw_mode()
    }

    fn on_resize(&mut self, callback: ResizeCallback) {
        self.terminal.on_resize(callback);
    }

    fn read(&mut self, timeout: Option<Duration>) -> Result<Option<char>> {
        self.terminal.read(timeout)
    }

    fn peek(&mut self, timeout: Option<Duration>) -> Result<Option<char>> {
        self.terminal.peek(timeout)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let restored = backend::teardown(self);
        if let Err(e) = &restored {
            tracing::warn!(error = %e, "terminal restore failed");
        }
        let released = self.terminal.close();
        if let Err(e) = &released {
            tracing::warn!(error = %e, "terminal release failed");
        }
        tracing::debug!("native backend closed");
        // The release outcome is the one callers must see.
        released.and(restored)
    }
}

impl<T: PlatformTerminal> Drop for NativeBackend<T> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use n_term::backend::Render;
    use n_term::{Cell, CellUpdate, Error, InputQueue};
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared view of what the fake terminal saw.
    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn written(&self) -> String {
            self.entries()
                .iter()
                .filter_map(|e| e.strip_prefix("write:"))
                .collect()
        }
    }

    struct FakeTerminal {
        log: Log,
        input: InputQueue,
        raw: bool,
        closed: bool,
        fail_writes: bool,
        fail_close: bool,
        resize: Option<ResizeCallback>,
    }

    impl FakeTerminal {
        fn new(log: Log) -> Self {
            Self {
                log,
                input: InputQueue::new(),
                raw: false,
                closed: false,
                fail_writes: false,
                fail_close: false,
                resize: None,
            }
        }
    }

    impl PlatformTerminal for FakeTerminal {
        fn enable_raw_mode(&mut self) -> Result<()> {
            self.raw = true;
            self.log.push("raw:on");
            Ok(())
        }

        fn disable_raw_mode(&mut self) -> Result<()> {
            if self.raw {
                self.raw = false;
                self.log.push("raw:off");
            }
            Ok(())
        }

        fn is_raw_mode(&self) -> bool {
            self.raw
        }

        fn size(&self) -> Result<Size> {
            Ok(Size::new(120, 40))
        }

        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            if self.fail_writes || self.closed {
                return Err(Error::Write(io::ErrorKind::BrokenPipe.into()));
            }
            self.log
                .push(format!("write:{}", String::from_utf8_lossy(bytes)));
            Ok(())
        }

        fn input(&self) -> &InputQueue {
            &self.input
        }

        fn on_resize(&mut self, callback: ResizeCallback) {
            self.resize = Some(callback);
        }

        fn close(&mut self) -> Result<()> {
            if !self.closed {
                self.disable_raw_mode()?;
                self.closed = true;
                self.log.push("close");
                if self.fail_close {
                    return Err(Error::TerminalUnavailable {
                        call: "close",
                        source: io::ErrorKind::BrokenPipe.into(),
                    });
                }
            }
            Ok(())
        }
    }

    fn backend() -> (NativeBackend<FakeTerminal>, Log) {
        let log = Log::default();
        let config = BackendConfig::default().with_mode2027_timeout(Duration::from_millis(20));
        (
            NativeBackend::from_terminal(FakeTerminal::new(log.clone()), config),
            log,
        )
    }

    #[test]
    fn flush_writes_once_and_empties_buffer() {
        let (mut b, log) = backend();
        b.write_str("ab").unwrap();
        b.write_str("cd").unwrap();
        assert!(log.entries().is_empty());

        b.flush().unwrap();
        b.flush().unwrap();
        assert_eq!(log.entries(), vec!["write:abcd".to_owned()]);
    }

    #[test]
    fn failed_flush_drops_buffer() {
        let (mut b, _log) = backend();
        b.terminal.fail_writes = true;
        b.write_str("lost").unwrap();
        assert!(matches!(b.flush(), Err(Error::Write(_))));
        b.terminal.fail_writes = false;
        b.flush().unwrap();
    }

    #[test]
    fn size_and_cursor() {
        let (mut b, _log) = backend();
        assert_eq!(b.size().unwrap(), Size::new(120, 40));
        assert_eq!(b.cursor_position(), Position::ORIGIN);
    }

    #[test]
    fn draw_then_flush() {
        let (mut b, log) = backend();
        b.draw(&[CellUpdate::new(0, 0, Cell::plain("x"))]).unwrap();
        assert!(log.entries().is_empty());
        b.flush().unwrap();
        assert_eq!(log.written(), "\x1b[1;1H\x1b[0mx\x1b[0m");
    }

    #[test]
    fn raw_mode_negotiates_grapheme_clusters() {
        let (mut b, log) = backend();
        b.terminal.input.extend("\x1b[?2027;2$y".chars());
        b.enable_raw_mode().unwrap();

        assert!(b.terminal().is_raw_mode());
        assert_eq!(b.session().mode2027, Some(n_term::Mode2027Status::Supported));
        assert!(b.session().grapheme_clusters);
        assert_eq!(log.written(), "\x1b[?2027$p\x1b[?2027h");

        b.disable_raw_mode().unwrap();
        assert!(!b.terminal().is_raw_mode());
        let entries = log.entries();
        let off = entries.iter().position(|e| e == "write:\x1b[?2027l").unwrap();
        let raw_off = entries.iter().position(|e| e == "raw:off").unwrap();
        assert!(off < raw_off);
    }

    #[test]
    fn read_and_peek_use_terminal_queue() {
        let (mut b, _log) = backend();
        b.terminal.input.push('q');
        assert_eq!(b.peek(None).unwrap(), Some('q'));
        assert_eq!(b.read(Some(Duration::ZERO)).unwrap(), Some('q'));
        assert_eq!(b.read(Some(Duration::ZERO)).unwrap(), None);
    }

    #[test]
    fn on_resize_reaches_terminal() {
        let (mut b, _log) = backend();
        b.on_resize(Box::new(|| {}));
        assert!(b.terminal().resize.is_some());
    }

    #[test]
    fn close_restores_then_releases() {
        let (mut b, log) = backend();
        b.enable_raw_mode().unwrap();
        b.enter_alternate_screen().unwrap();
        b.enable_mouse_capture().unwrap();
        let before = log.entries().len();

        b.close().unwrap();
        assert_eq!(
            log.entries()[before..].to_vec(),
            vec![
                "write:\x1b[0m\x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l".to_owned(),
                "write:\x1b[?1049l".to_owned(),
                "write:\x1b[?25h".to_owned(),
                "raw:off".to_owned(),
                "close".to_owned(),
            ]
        );
        assert!(b.is_closed());
        assert!(!b.terminal().is_raw_mode());
    }

    #[test]
    fn close_releases_after_failed_restore() {
        let (mut b, log) = backend();
        b.enter_alternate_screen().unwrap();
        b.terminal.fail_writes = true;

        assert!(matches!(b.close(), Err(Error::Write(_))));
        assert!(log.entries().contains(&"close".to_owned()));
        assert!(b.is_closed());
    }

    #[test]
    fn release_error_wins_over_restore_error() {
        let (mut b, log) = backend();
        b.enter_alternate_screen().unwrap();
        b.terminal.fail_writes = true;
        b.terminal.fail_close = true;

        assert!(matches!(
            b.close(),
            Err(Error::TerminalUnavailable { call: "close", .. })
        ));
        assert_eq!(log.entries().last().map(String::as_str), Some("close"));
    }

    #[test]
    fn release_error_surfaces_after_clean_restore() {
        let (mut b, _log) = backend();
        b.terminal.fail_close = true;
        assert!(matches!(
            b.close(),
            Err(Error::TerminalUnavailable { call: "close", .. })
        ));
        // Already closed: nothing more to report.
        b.close().unwrap();
    }
}
