// SPDX-License-Identifier: MIT
//
// Unix terminal: termios raw mode, TIOCGWINSZ, SIGWINCH.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl and poll have no safe
// wrappers in std. Each unsafe block is one FFI call on a descriptor we own.
#![allow(unsafe_code)]
//
// The terminal is opened through /dev/tty rather than stdin/stdout, so the
// backend keeps working when the application's stdio is redirected.
//
// Input: a reader thread polls the tty in POLL_INTERVAL slices, decodes
// UTF-8 and pushes code points into the input queue.
//
// Resize: a signal-hook `Signals` thread waits for SIGWINCH and fires the
// registered callback. It never runs on the render path.
//
// Panics: while raw mode is on, a panic hook holds a copy of the original
// termios. It writes a restore sequence straight to the tty fd and puts the
// termios back before the default handler prints, so the message lands on
// a usable terminal.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::{Mutex, Once};
use std::thread::{self, JoinHandle};

use n_term::input::Utf8Decoder;
use n_term::reader::{self, ReaderThread, StopFlag};
use n_term::{Error, InputQueue, ResizeCallback, ResizeSlot, Result, Size};
use signal_hook::consts::SIGWINCH;
use signal_hook::iterator::{Handle, Signals};

use crate::platform::PlatformTerminal;

const TTY_PATH: &str = "/dev/tty";

/// A keypress is 1-6 bytes, a paste can be kilobytes.
const READ_BUF_SIZE: usize = 4096;

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Original termios (and the fd it belongs to) while raw mode is active.
static TERMIOS_BACKUP: Mutex<Option<(RawFd, libc::termios)>> = Mutex::new(None);

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Reset style, mouse off, mode 2027 off, cursor on, main screen.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[0m\
    \x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l\
    \x1b[?2027l\
    \x1b[?25h\
    \x1b[?1049l";

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

/// Best effort. `try_lock` because the panic may have happened while the
/// backup lock was held.
fn emergency_restore() {
    let Ok(guard) = TERMIOS_BACKUP.try_lock() else {
        return;
    };
    if let Some((fd, original)) = guard.as_ref() {
        unsafe {
            let _ = libc::write(
                *fd,
                EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                EMERGENCY_RESTORE.len(),
            );
            let _ = libc::tcsetattr(*fd, libc::TCSANOW, original);
        }
    }
}

fn set_backup(value: Option<(RawFd, libc::termios)>) {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        *guard = value;
    }
}

/// cfmakeraw equivalent: no line discipline, no echo, no signals, 8-bit.
fn make_raw(termios: &mut libc::termios) {
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    // read() returns as soon as one byte is available.
    termios.c_cc[libc::VMIN] = 1;
    termios.c_cc[libc::VTIME] = 0;
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "terminal is closed")
}

// ─── Background Threads ─────────────────────────────────────────────────────

fn read_loop(mut tty: File, queue: &InputQueue, stop: &StopFlag) {
    let _closer = queue.close_on_drop();
    let fd = tty.as_raw_fd();
    let timeout_ms = i32::try_from(reader::POLL_INTERVAL.as_millis()).unwrap_or(50);
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut decoder = Utf8Decoder::new();

    while !stop.is_set() {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, timeout_ms)
        };
        // Timeout, or EINTR from SIGWINCH: recheck the flag.
        if ready <= 0 {
            continue;
        }

        match tty.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => decoder.decode(&buf[..n], |ch| queue.push(ch)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::warn!(error = %e, "terminal input read failed");
                break;
            }
        }
    }
}

/// SIGWINCH listener. Closing the handle ends the `forever()` loop.
struct ResizeSignals {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl ResizeSignals {
    fn spawn(slot: ResizeSlot) -> io::Result<Self> {
        let mut signals = Signals::new([SIGWINCH])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("n-native-sigwinch".into())
            .spawn(move || {
                for _ in signals.forever() {
                    slot.notify();
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    fn stop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ResizeSignals {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── UnixTerminal ───────────────────────────────────────────────────────────

/// The controlling terminal, opened via `/dev/tty`.
pub struct UnixTerminal {
    /// `None` once closed.
    tty: Option<File>,
    /// Saved mode while raw mode is active.
    original: Option<libc::termios>,
    input: InputQueue,
    resize: ResizeSlot,
    reader: Option<ReaderThread>,
    signals: Option<ResizeSignals>,
}

impl UnixTerminal {
    /// Open `/dev/tty` and start the input and SIGWINCH threads.
    ///
    /// # Errors
    ///
    /// [`Error::Init`] if there is no controlling terminal or a thread
    /// can't be started.
    pub fn open() -> Result<Self> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open(TTY_PATH)
            .map_err(Error::Init)?;

        let input = InputQueue::new();
        let resize = ResizeSlot::new();

        let reader_tty = tty.try_clone().map_err(Error::Init)?;
        let queue = input.clone();
        let reader = ReaderThread::spawn("n-native-input", move |stop| {
            read_loop(reader_tty, &queue, &stop);
        })
        .map_err(Error::Init)?;
        let signals = ResizeSignals::spawn(resize.clone()).map_err(Error::Init)?;

        tracing::debug!(path = TTY_PATH, "terminal opened");
        Ok(Self {
            tty: Some(tty),
            original: None,
            input,
            resize,
            reader: Some(reader),
            signals: Some(signals),
        })
    }

    fn fd(&self, call: &'static str) -> Result<RawFd> {
        self.tty
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| Error::TerminalUnavailable {
                call,
                source: closed(),
            })
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.tty.is_none()
    }
}

impl PlatformTerminal for UnixTerminal {
    fn enable_raw_mode(&mut self) -> Result<()> {
        if self.original.is_some() {
            return Ok(());
        }
        let fd = self.fd("tcgetattr")?;
        install_panic_hook();

        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(Error::syscall("tcgetattr"));
        }
        let original = termios;
        make_raw(&mut termios);
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) } != 0 {
            return Err(Error::syscall("tcsetattr"));
        }

        self.original = Some(original);
        set_backup(Some((fd, original)));
        tracing::debug!("raw mode enabled");
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        let Some(original) = self.original else {
            return Ok(());
        };
        let fd = self.fd("tcsetattr")?;
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const original) } != 0 {
            return Err(Error::syscall("tcsetattr"));
        }

        self.original = None;
        set_backup(None);
        tracing::debug!("raw mode disabled");
        Ok(())
    }

    fn is_raw_mode(&self) -> bool {
        self.original.is_some()
    }

    fn size(&self) -> Result<Size> {
        let fd = self.fd("ioctl(TIOCGWINSZ)")?;
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) } != 0 {
            return Err(Error::SizeQuery(io::Error::last_os_error()));
        }
        Ok(Size::new(ws.ws_col, ws.ws_row))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let tty = self.tty.as_mut().ok_or_else(closed)?;
        tty.write_all(bytes)?;
        tty.flush()?;
        Ok(())
    }

    fn input(&self) -> &InputQueue {
        &self.input
    }

    fn on_resize(&mut self, callback: ResizeCallback) {
        self.resize.set(callback);
    }

    fn close(&mut self) -> Result<()> {
        if self.tty.is_none() {
            return Ok(());
        }
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        if let Some(mut signals) = self.signals.take() {
            signals.stop();
        }
        let restored = self.disable_raw_mode();
        // A failed restore leaves nothing to retry with once the fd is gone.
        if restored.is_err() {
            self.original = None;
            set_backup(None);
        }
        self.tty = None;
        tracing::debug!("terminal closed");
        restored
    }
}

impl Drop for UnixTerminal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::os::unix::io::FromRawFd;
    use std::time::{Duration, Instant};

    fn pipe() -> (File, File) {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) }
    }

    #[test]
    fn input_eof_fails_blocked_read() {
        let (rx, mut tx) = pipe();
        tx.write_all("h\u{e9}".as_bytes()).unwrap();
        drop(tx);

        let queue = InputQueue::new();
        let producer = queue.clone();
        let mut reader = ReaderThread::spawn("test-input", move |stop| {
            read_loop(rx, &producer, &stop);
        })
        .unwrap();

        assert_eq!(queue.pop(None).unwrap(), Some('h'));
        assert_eq!(queue.pop(None).unwrap(), Some('\u{e9}'));
        assert!(matches!(
            queue.pop(None),
            Err(Error::TerminalUnavailable { call: "read", .. })
        ));
        reader.stop();
    }

    #[test]
    fn make_raw_clears_line_discipline() {
        let mut t: libc::termios = unsafe { std::mem::zeroed() };
        t.c_iflag = libc::ICRNL | libc::IXON | libc::BRKINT;
        t.c_oflag = libc::OPOST;
        t.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN;
        t.c_cflag = libc::PARENB;

        make_raw(&mut t);

        assert_eq!(t.c_iflag & (libc::ICRNL | libc::IXON | libc::BRKINT), 0);
        assert_eq!(t.c_oflag & libc::OPOST, 0);
        assert_eq!(
            t.c_lflag & (libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN),
            0
        );
        assert_eq!(t.c_cflag & libc::PARENB, 0);
        assert_eq!(t.c_cflag & libc::CS8, libc::CS8);
        assert_eq!(t.c_cc[libc::VMIN], 1);
        assert_eq!(t.c_cc[libc::VTIME], 0);
    }

    #[test]
    fn emergency_restore_leaves_alternate_screen_last() {
        assert!(EMERGENCY_RESTORE.ends_with(b"\x1b[?1049l"));
        assert!(EMERGENCY_RESTORE.starts_with(b"\x1b[0m"));
    }

    #[test]
    fn sigwinch_fires_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let slot = ResizeSlot::new();
        let counter = Arc::clone(&hits);
        slot.set(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut signals = ResizeSignals::spawn(slot).unwrap();
        signal_hook::low_level::raise(SIGWINCH).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        signals.stop();
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn open_without_tty_is_init_error() {
        // CI usually has no controlling terminal; with one, exercise close.
        match UnixTerminal::open() {
            Err(Error::Init(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(mut term) => {
                assert!(!term.is_raw_mode());
                term.close().unwrap();
                assert!(term.is_closed());
                term.close().unwrap();
                assert!(matches!(term.write(b"x"), Err(Error::Write(_))));
                assert!(matches!(
                    term.size(),
                    Err(Error::TerminalUnavailable { .. })
                ));
            }
        }
    }
}
