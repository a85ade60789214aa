// SPDX-License-Identifier: MIT
//
// Background notification thread with cooperative shutdown.
//
// Backends read terminal input on a dedicated thread so `Backend::read` can
// wait with a timeout on the input queue instead of blocking in the OS. The
// thread body is supplied by the backend; this type owns the stop flag and
// the join handle.
//
// A body that feeds an `InputQueue` holds `InputQueue::close_on_drop` for
// its whole run, so readers waiting on the queue are woken with an error
// once it exits, however it exits.
//
// Shutdown: the body is expected to wait for input in slices of at most
// `POLL_INTERVAL` (poll(), WaitForSingleObject, crossterm's poll) and check
// the flag between slices, so `stop()` returns within one slice.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on how long a reader body waits before rechecking the flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared stop signal handed to the thread body.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// A named background thread that runs until stopped.
///
/// ```
/// use n_term::reader::ReaderThread;
///
/// let mut reader = ReaderThread::spawn("demo-reader", |stop| {
///     while !stop.is_set() {
///         std::thread::sleep(n_term::reader::POLL_INTERVAL);
///     }
/// })?;
/// reader.stop();
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct ReaderThread {
    /// `None` after `stop()` joins it.
    handle: Option<JoinHandle<()>>,
    stop: StopFlag,
}

impl ReaderThread {
    /// Spawn `body` on a thread named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot spawn a thread.
    pub fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce(StopFlag) + Send + 'static,
    {
        let stop = StopFlag::default();
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || body(flag))?;
        tracing::trace!(thread = name, "reader thread started");

        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Signal the thread to stop and wait for it to exit.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        self.stop.set();
        if let Some(handle) = self.handle.take() {
            let name = handle.thread().name().unwrap_or("reader").to_owned();
            if handle.join().is_err() {
                tracing::warn!(thread = %name, "reader thread panicked");
            } else {
                tracing::trace!(thread = %name, "reader thread stopped");
            }
        }
    }

    /// Whether the thread has been stopped (or has exited on its own).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for ReaderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
