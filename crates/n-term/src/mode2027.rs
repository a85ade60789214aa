// SPDX-License-Identifier: MIT
//
// Mode 2027: grapheme cluster segmentation.
//
// Terminals that implement mode 2027 measure width per grapheme cluster
// rather than per code point, which is what `Cell` assumes. We ask with
// DECRQM while entering raw mode and switch it on only when the terminal
// says it knows the mode:
//
//   →  CSI ? 2027 $ p
//   ←  CSI ? 2027 ; Ps $ y        Ps: 1 set, 2 reset, 3 permanently set
//                                     0 unknown mode, 4 permanently reset
//
// A terminal that has never heard of DECRQM says nothing at all, so the
// wait is bounded. Whatever arrives on input during the wait is consumed;
// key presses that race the reply are lost.

use std::time::{Duration, Instant};

use crate::ansi;
use crate::backend::Backend;
use crate::error::Result;

/// How long to wait for the DECRPM reply by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

const REPLY_PREFIX: &str = "\x1b[?2027;";
const REPLY_SUFFIX: &str = "$y";

/// Longest reply we accept before giving up on the current attempt.
const MAX_REPLY_LEN: usize = 32;

/// Outcome of the mode 2027 query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode2027Status {
    /// The terminal knows the mode (Ps 1, 2 or 3).
    Supported,
    /// The terminal answered but doesn't support the mode.
    Unsupported,
    /// No answer before the timeout.
    Unknown,
}

impl Mode2027Status {
    #[inline]
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Supported)
    }

    /// Map a DECRPM `Ps` value.
    #[must_use]
    pub const fn from_report_value(ps: u32) -> Self {
        match ps {
            1..=3 => Self::Supported,
            _ => Self::Unsupported,
        }
    }
}

/// Find a complete `CSI ?2027;Ps$y` in `input` and map its `Ps`.
///
/// Returns `None` if no complete reply is present yet. Anything before the
/// reply (stray key presses, other reports) is ignored.
#[must_use]
pub fn parse_report(input: &str) -> Option<Mode2027Status> {
    let start = input.find(REPLY_PREFIX)? + REPLY_PREFIX.len();
    let rest = &input[start..];
    let end = rest.find(REPLY_SUFFIX)?;
    let ps = rest[..end].parse::<u32>().ok();
    // A reply with a garbled value is still a reply.
    Some(ps.map_or(Mode2027Status::Unsupported, Mode2027Status::from_report_value))
}

/// Send the query and wait up to `timeout` for the answer.
///
/// # Errors
///
/// Returns write/flush errors from the backend. A missing or late reply, or
/// an input source that has gone away, is not an error: it yields
/// [`Mode2027Status::Unknown`].
pub fn query<B: Backend + ?Sized>(backend: &mut B, timeout: Duration) -> Result<Mode2027Status> {
    let mut buf = Vec::with_capacity(10);
    ansi::query_grapheme_clusters(&mut buf)?;
    backend.write_raw(&buf)?;
    backend.flush()?;

    let deadline = Instant::now().checked_add(timeout);
    let mut reply = String::new();
    loop {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining == Some(Duration::ZERO) {
            return Ok(Mode2027Status::Unknown);
        }
        let ch = match backend.read(remaining) {
            Ok(Some(ch)) => ch,
            Ok(None) => return Ok(Mode2027Status::Unknown),
            // No input source means no reply.
            Err(e) => {
                tracing::debug!(error = %e, "mode 2027 reply unreadable");
                return Ok(Mode2027Status::Unknown);
            }
        };

        // Only keep what could be part of the reply.
        if ch == '\x1b' {
            reply.clear();
        }
        if reply.is_empty() && ch != '\x1b' {
            continue;
        }
        reply.push(ch);

        if let Some(status) = parse_report(&reply) {
            return Ok(status);
        }
        if reply.len() > MAX_REPLY_LEN {
            reply.clear();
        }
    }
}

/// Query and, if supported, enable mode 2027. Records the outcome in the
/// backend's session.
///
/// Called as the last step of `enable_raw_mode`.
///
/// # Errors
///
/// Returns write/flush errors from the backend.
pub fn negotiate<B: Backend + ?Sized>(backend: &mut B, timeout: Duration) -> Result<Mode2027Status> {
    let status = query(backend, timeout)?;
    tracing::debug!(?status, "mode 2027 query answered");

    if status.is_supported() {
        let mut buf = Vec::with_capacity(8);
        ansi::enable_grapheme_clusters(&mut buf)?;
        backend.write_raw(&buf)?;
        backend.flush()?;
        backend.session_mut().grapheme_clusters = true;
    }
    backend.session_mut().mode2027 = Some(status);
    Ok(status)
}

/// Turn mode 2027 back off if [`negotiate`] turned it on.
///
/// Called first thing in `disable_raw_mode`, before the OS mode changes.
///
/// # Errors
///
/// Returns write/flush errors from the backend. The session flag is cleared
/// only once the disable sequence has been flushed.
pub fn restore<B: Backend + ?Sized>(backend: &mut B) -> Result<()> {
    if !backend.session().grapheme_clusters {
        return Ok(());
    }
    let mut buf = Vec::with_capacity(8);
    ansi::disable_grapheme_clusters(&mut buf)?;
    backend.write_raw(&buf)?;
    backend.flush()?;
    backend.session_mut().grapheme_clusters = false;
    tracing::debug!("mode 2027 disabled");
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
