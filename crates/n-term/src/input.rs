// SPDX-License-Identifier: MIT
//
// Input queue and byte decoders.
//
// Terminal input arrives on a notification thread (a reader blocked in
// poll(), a console event loop, a crossterm event thread) and is consumed on
// the application's thread through `Backend::read` / `Backend::peek`. The
// queue in between is a plain deque behind a mutex plus a condvar: `peek`
// needs to look at the head without taking it, which rules out mpsc.
//
// Timeouts:
//
//   None              block until a code point arrives
//   Some(ZERO)        poll, return immediately
//   Some(d)           wait at most d
//
// `Ok(None)` is the timeout sentinel. It can't collide with any code point
// because a code point is always `Ok(Some(char))`. A closed queue that has
// been drained is an error.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

// ─── InputQueue ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct State {
    chars: VecDeque<char>,
    /// The producer is gone; nothing more will arrive.
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    ready: Condvar,
}

/// Unbounded, thread-safe FIFO of decoded code points.
///
/// Cloning gives another handle to the same queue: the producer thread keeps
/// one, the backend keeps another. When the producer stops for good it
/// closes the queue; readers drain what is left and then get an error
/// instead of waiting forever.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    shared: Arc<Shared>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic on the producer side must not take input down with it.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one code point and wake a waiting reader.
    pub fn push(&self, ch: char) {
        self.lock().chars.push_back(ch);
        self.shared.ready.notify_one();
    }

    /// Append several code points under one lock.
    pub fn extend(&self, chars: impl IntoIterator<Item = char>) {
        let mut state = self.lock();
        let before = state.chars.len();
        state.chars.extend(chars);
        if state.chars.len() > before {
            drop(state);
            self.shared.ready.notify_all();
        }
    }

    /// Mark the input source as gone and wake every waiting reader.
    pub fn close(&self) {
        self.lock().closed = true;
        self.shared.ready.notify_all();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// A guard that closes the queue when dropped, panics included. The
    /// producer thread holds it for as long as it runs.
    pub fn close_on_drop(&self) -> CloseOnDrop {
        CloseOnDrop(self.clone())
    }

    /// Remove and return the head, waiting according to `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout elapses with the queue still
    /// empty. Spurious wake-ups just loop until the deadline.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalUnavailable`] once the queue is closed and empty.
    pub fn pop(&self, timeout: Option<Duration>) -> Result<Option<char>> {
        // An unrepresentable deadline is as good as none.
        let deadline = timeout.and_then(|d| Instant::now().checked_add(d));
        let poll_only = timeout == Some(Duration::ZERO);

        let mut state = self.lock();
        loop {
            if let Some(ch) = state.chars.pop_front() {
                return Ok(Some(ch));
            }
            if state.closed {
                return Err(source_closed());
            }
            if poll_only {
                return Ok(None);
            }
            state = match deadline {
                None => self
                    .shared
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    self.shared
                        .ready
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// The head without removing it. Never blocks.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.lock().chars.front().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().chars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().chars.is_empty()
    }

    /// Drop everything queued.
    pub fn clear(&self) {
        self.lock().chars.clear();
    }
}

fn source_closed() -> Error {
    Error::TerminalUnavailable {
        call: "read",
        source: io::Error::new(io::ErrorKind::UnexpectedEof, "input source closed"),
    }
}

/// Closes its [`InputQueue`] on drop. See [`InputQueue::close_on_drop`].
#[derive(Debug)]
pub struct CloseOnDrop(InputQueue);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

// ─── Utf8Decoder ─────────────────────────────────────────────────────────────

/// Incremental UTF-8 decoder for raw terminal bytes.
///
/// A multi-byte sequence may be split across two `read()` calls, so
/// incomplete trailing bytes are held until the next chunk. Malformed input
/// decodes to U+FFFD, one per bad sequence, and decoding resumes at the next
/// byte.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: [u8; 4],
    len: usize,
    need: usize,
}

impl Utf8Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: [0; 4],
            len: 0,
            need: 0,
        }
    }

    /// Decode `bytes`, handing every completed code point to `emit`.
    pub fn decode(&mut self, bytes: &[u8], mut emit: impl FnMut(char)) {
        for &b in bytes {
            if self.need != 0 {
                if b & 0xC0 == 0x80 {
                    self.pending[self.len] = b;
                    self.len += 1;
                    if self.len == self.need {
                        let ch = std::str::from_utf8(&self.pending[..self.len])
                            .ok()
                            .and_then(|s| s.chars().next())
                            .unwrap_or(char::REPLACEMENT_CHARACTER);
                        emit(ch);
                        self.need = 0;
                        self.len = 0;
                    }
                    continue;
                }
                // Truncated sequence: report it, then treat `b` as a fresh lead.
                emit(char::REPLACEMENT_CHARACTER);
                self.need = 0;
                self.len = 0;
            }

            match sequence_len(b) {
                1 => emit(char::from(b)),
                0 => emit(char::REPLACEMENT_CHARACTER),
                n => {
                    self.pending[0] = b;
                    self.len = 1;
                    self.need = n;
                }
            }
        }
    }

    /// Whether a partial sequence is buffered.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.need != 0
    }
}

/// Expected sequence length from a lead byte; 0 for an invalid lead.
const fn sequence_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

// ─── Utf16Decoder ────────────────────────────────────────────────────────────

/// Pairs UTF-16 surrogates delivered one unit at a time (Windows key events).
#[derive(Debug, Default)]
pub struct Utf16Decoder {
    high: Option<u16>,
}

impl Utf16Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { high: None }
    }

    /// Feed one UTF-16 code unit. Returns the completed code point, if any.
    ///
    /// An unpaired surrogate decodes to U+FFFD.
    pub fn push(&mut self, unit: u16) -> Option<char> {
        match (self.high.take(), unit) {
            (None, 0xD800..=0xDBFF) => {
                self.high = Some(unit);
                None
            }
            (Some(high), 0xDC00..=0xDFFF) => {
                let cp = 0x1_0000
                    + ((u32::from(high) - 0xD800) << 10)
                    + (u32::from(unit) - 0xDC00);
                Some(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            (Some(_), 0xD800..=0xDBFF) => {
                self.high = Some(unit);
                Some(char::REPLACEMENT_CHARACTER)
            }
            (Some(_), _) => {
                // Lone high surrogate followed by a regular unit: the unit
                // itself is still good, but only one value can be returned.
                self.high = None;
                Some(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            (None, unit) => {
                Some(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    // ── InputQueue ──────────────────────────────────────────────────────

    #[test]
    fn fifo_order() {
        let q = InputQueue::new();
        q.extend("abc".chars());
        assert_eq!(q.pop(Some(Duration::ZERO)).unwrap(), Some('a'));
        assert_eq!(q.pop(Some(Duration::ZERO)).unwrap(), Some('b'));
        assert_eq!(q.pop(Some(Duration::ZERO)).unwrap(), Some('c'));
        assert_eq!(q.pop(Some(Duration::ZERO)).unwrap(), None);
    }

    #[test]
    fn poll_on_empty_returns_immediately() {
        let q = InputQueue::new();
        let start = Instant::now();
        assert_eq!(q.pop(Some(Duration::ZERO)).unwrap(), None);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn timed_pop_waits_then_times_out() {
        let q = InputQueue::new();
        let start = Instant::now();
        assert_eq!(q.pop(Some(Duration::from_millis(30))).unwrap(), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn blocking_pop_wakes_on_push() {
        let q = InputQueue::new();
        let producer = q.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push('z');
        });
        assert_eq!(q.pop(None).unwrap(), Some('z'));
        handle.join().unwrap();
    }

    #[test]
    fn timed_pop_wakes_before_deadline() {
        let q = InputQueue::new();
        let producer = q.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push('q');
        });
        assert_eq!(q.pop(Some(Duration::from_secs(5))).unwrap(), Some('q'));
        handle.join().unwrap();
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let q = InputQueue::new();
        q.push('x');
        assert_eq!(q.pop(Some(Duration::MAX)).unwrap(), Some('x'));
    }

    #[test]
    fn peek_does_not_consume() {
        let q = InputQueue::new();
        assert_eq!(q.peek(), None);
        q.push('p');
        assert_eq!(q.peek(), Some('p'));
        assert_eq!(q.peek(), Some('p'));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop(Some(Duration::ZERO)).unwrap(), Some('p'));
        assert!(q.is_empty());
    }

    #[test]
    fn closed_queue_drains_then_fails() {
        let q = InputQueue::new();
        q.push('a');
        q.close();
        assert!(q.is_closed());
        assert_eq!(q.pop(None).unwrap(), Some('a'));
        assert!(matches!(
            q.pop(None),
            Err(Error::TerminalUnavailable { call: "read", .. })
        ));
        assert!(q.pop(Some(Duration::ZERO)).is_err());
    }

    #[test]
    fn close_wakes_blocked_reader() {
        let q = InputQueue::new();
        let producer = q.clone();
        let handle = thread::spawn(move || {
            let _closer = producer.close_on_drop();
            thread::sleep(Duration::from_millis(20));
        });
        assert!(q.pop(None).is_err());
        handle.join().unwrap();
    }

    #[test]
    fn clear_empties() {
        let q = InputQueue::new();
        q.extend("hello".chars());
        q.clear();
        assert!(q.is_empty());
    }

    // ── Utf8Decoder ─────────────────────────────────────────────────────

    fn decode_all(chunks: &[&[u8]]) -> String {
        let mut dec = Utf8Decoder::new();
        let mut out = String::new();
        for chunk in chunks {
            dec.decode(chunk, |c| out.push(c));
        }
        out
    }

    #[test]
    fn ascii_passthrough() {
        assert_eq!(decode_all(&[b"\x1b[A hi"]), "\x1b[A hi");
    }

    #[test]
    fn multibyte_in_one_chunk() {
        assert_eq!(decode_all(&["é世🎉".as_bytes()]), "é世🎉");
    }

    #[test]
    fn multibyte_split_across_chunks() {
        let bytes = "世".as_bytes();
        let mut dec = Utf8Decoder::new();
        let mut out = String::new();
        dec.decode(&bytes[..1], |c| out.push(c));
        assert!(dec.has_pending());
        assert_eq!(out, "");
        dec.decode(&bytes[1..], |c| out.push(c));
        assert!(!dec.has_pending());
        assert_eq!(out, "世");
    }

    #[test]
    fn invalid_lead_byte_is_replaced() {
        assert_eq!(decode_all(&[b"a\xffb"]), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_sequence_then_ascii() {
        assert_eq!(decode_all(&[b"\xe4\xb8x"]), "\u{FFFD}x");
    }

    #[test]
    fn surrogate_encoding_is_replaced() {
        // CESU-style encoded surrogate, not valid UTF-8.
        assert_eq!(decode_all(&[b"\xed\xa0\x80"]), "\u{FFFD}");
    }

    // ── Utf16Decoder ────────────────────────────────────────────────────

    #[test]
    fn bmp_unit_decodes_directly() {
        let mut dec = Utf16Decoder::new();
        assert_eq!(dec.push(u16::from(b'a')), Some('a'));
        assert_eq!(dec.push(0x4E16), Some('世'));
    }

    #[test]
    fn surrogate_pair_decodes() {
        let mut units = [0u16; 2];
        '🎉'.encode_utf16(&mut units);
        let mut dec = Utf16Decoder::new();
        assert_eq!(dec.push(units[0]), None);
        assert_eq!(dec.push(units[1]), Some('🎉'));
    }

    #[test]
    fn lone_low_surrogate_is_replaced() {
        let mut dec = Utf16Decoder::new();
        assert_eq!(dec.push(0xDC00), Some(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn high_followed_by_high_reports_first() {
        let mut dec = Utf16Decoder::new();
        assert_eq!(dec.push(0xD83C), None);
        assert_eq!(dec.push(0xD83C), Some(char::REPLACEMENT_CHARACTER));
        assert_eq!(dec.push(0xDF89), Some('🎉'));
    }
}
