// SPDX-License-Identifier: MIT
//
// What a platform terminal has to provide.

use std::time::Duration;

use n_term::{InputQueue, ResizeCallback, Result, Size};

/// OS-level terminal control: raw mode, size, resize notification, input.
///
/// Input is decoded to code points on a background thread and queued; the
/// provided `read`/`peek` serve from that queue.
pub trait PlatformTerminal: Send {
    /// Switch the terminal to raw mode, saving the current mode first.
    /// Calling it while already raw does nothing.
    ///
    /// # Errors
    ///
    /// [`n_term::Error::TerminalUnavailable`] if the OS call fails.
    fn enable_raw_mode(&mut self) -> Result<()>;

    /// Restore the saved mode. Does nothing if raw mode isn't active.
    ///
    /// # Errors
    ///
    /// [`n_term::Error::TerminalUnavailable`] if the OS call fails.
    fn disable_raw_mode(&mut self) -> Result<()>;

    fn is_raw_mode(&self) -> bool;

    /// # Errors
    ///
    /// [`n_term::Error::SizeQuery`] if the OS size query fails,
    /// [`n_term::Error::TerminalUnavailable`] after `close`. Both are
    /// terminal-unavailable errors.
    fn size(&self) -> Result<Size>;

    /// Write all of `bytes` to the terminal and flush.
    ///
    /// # Errors
    ///
    /// [`n_term::Error::Write`] on I/O failure or after `close`.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Queue fed by the input thread.
    fn input(&self) -> &InputQueue;

    /// Register the resize callback, replacing any previous one.
    fn on_resize(&mut self, callback: ResizeCallback);

    /// Stop background threads, leave raw mode, and release the handle.
    /// Later calls do nothing.
    ///
    /// # Errors
    ///
    /// The raw-mode restore error, if any. Threads are stopped and the
    /// handle released regardless.
    fn close(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// [`n_term::Error::TerminalUnavailable`] once the input thread has
    /// exited and everything it queued has been read.
    fn read(&mut self, timeout: Option<Duration>) -> Result<Option<char>> {
        self.input().pop(timeout)
    }

    /// Never blocks; `timeout` is ignored.
    ///
    /// # Errors
    ///
    /// Never fails for the queue-backed default.
    fn peek(&mut self, _timeout: Option<Duration>) -> Result<Option<char>> {
        Ok(self.input().peek())
    }
}
