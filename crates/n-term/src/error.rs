// SPDX-License-Identifier: MIT
//
// Error type shared by every backend crate.

use std::fmt;
use std::io;

use crate::registry::ProviderInfo;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The terminal handle could not be acquired.
    #[error("failed to initialize terminal: {0}")]
    Init(#[source] io::Error),

    /// The OS size query failed. This is the size-specific form of
    /// `TerminalUnavailable`; see [`Error::is_terminal_unavailable`].
    #[error("terminal unavailable: size query failed: {0}")]
    SizeQuery(#[source] io::Error),

    /// A terminal control call failed (e.g. `tcgetattr`, `SetConsoleMode`).
    #[error("terminal unavailable: {call} failed: {source}")]
    TerminalUnavailable {
        call: &'static str,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing output failed.
    #[error("terminal write failed: {0}")]
    Write(#[from] io::Error),

    #[error("no terminal backend is registered")]
    NoProvider,

    #[error("terminal backend '{requested}' not found; available backends:\n{available}")]
    ProviderNotFound {
        requested: String,
        available: ProviderList,
    },

    #[error(
        "multiple terminal backends are registered; select one with N_TTY_BACKEND:\n{available}"
    )]
    AmbiguousProvider { available: ProviderList },

    #[error("failed to create terminal backend {name} ({id}): {source}")]
    ProviderInstantiation {
        name: &'static str,
        id: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// `TerminalUnavailable` for `call`, carrying the current OS error.
    #[must_use]
    pub fn syscall(call: &'static str) -> Self {
        Self::TerminalUnavailable {
            call,
            source: io::Error::last_os_error(),
        }
    }

    /// Whether the terminal itself failed a call, size queries included.
    #[must_use]
    pub const fn is_terminal_unavailable(&self) -> bool {
        matches!(self, Self::TerminalUnavailable { .. } | Self::SizeQuery(_))
    }
}

/// Candidate backends, rendered one `name (id)` per line in error messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderList(pub Vec<ProviderInfo>);

impl fmt::Display for ProviderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "  (none)");
        }
        for (i, info) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {info}")?;
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list() -> ProviderList {
        ProviderList(vec![
            ProviderInfo {
                name: "native",
                id: "n_native::NativeBackend",
            },
            ProviderInfo {
                name: "crossterm",
                id: "n_crossterm::CrosstermBackend",
            },
        ])
    }

    #[test]
    fn provider_list_display() {
        assert_eq!(
            list().to_string(),
            "  - native (n_native::NativeBackend)\n  - crossterm (n_crossterm::CrosstermBackend)"
        );
    }

    #[test]
    fn size_failure_is_terminal_unavailable() {
        let err = Error::SizeQuery(io::ErrorKind::NotConnected.into());
        assert!(err.is_terminal_unavailable());
        assert!(err.to_string().starts_with("terminal unavailable: size query failed"));
        assert!(Error::syscall("tcgetattr").is_terminal_unavailable());
        assert!(!Error::Write(io::ErrorKind::BrokenPipe.into()).is_terminal_unavailable());
        assert!(!Error::NoProvider.is_terminal_unavailable());
    }

    #[test]
    fn empty_provider_list_display() {
        assert_eq!(ProviderList::default().to_string(), "  (none)");
    }

    #[test]
    fn not_found_message_lists_every_candidate() {
        let err = Error::ProviderNotFound {
            requested: "kitty".into(),
            available: list(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'kitty'"));
        assert!(msg.contains("native (n_native::NativeBackend)"));
        assert!(msg.contains("crossterm (n_crossterm::CrosstermBackend)"));
    }

    #[test]
    fn io_errors_convert_to_write() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, Error::Write(_)));
    }

    #[test]
    fn instantiation_keeps_cause() {
        let err = Error::ProviderInstantiation {
            name: "native",
            id: "n_native::NativeBackend",
            source: Box::new(Error::Init(io::Error::new(io::ErrorKind::NotFound, "no tty"))),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("no tty"));
    }
}
