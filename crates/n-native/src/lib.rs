// SPDX-License-Identifier: MIT
//
// n-native: terminal backend that talks to the OS directly.
//
// termios, ioctl and SIGWINCH on Unix; the console API on Windows. Exactly
// one `PlatformTerminal` implementation is compiled per target and exposed
// as `SystemTerminal`. `NativeBackend` layers the shared `n_term::Backend`
// contract on top of it.

#[cfg(not(any(unix, windows)))]
compile_error!("n-native supports Unix and Windows targets only");

mod backend;
mod platform;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use backend::NativeBackend;
pub use platform::PlatformTerminal;
#[cfg(unix)]
pub use unix::UnixTerminal;
#[cfg(windows)]
pub use windows::WindowsTerminal;

use n_term::{Backend, BackendConfig, BackendProvider, Result};

/// The platform terminal for this build target.
#[cfg(unix)]
pub type SystemTerminal = UnixTerminal;

/// The platform terminal for this build target.
#[cfg(windows)]
pub type SystemTerminal = WindowsTerminal;

/// Registration entry for the backend registry.
pub const PROVIDER: BackendProvider =
    BackendProvider::new("native", "n_native::NativeBackend", create);

fn create(config: &BackendConfig) -> Result<Box<dyn Backend>> {
    Ok(Box::new(NativeBackend::with_config(config.clone())?))
}

/// Whether this build targets macOS. Resolved at compile time.
#[inline]
#[must_use]
pub const fn is_macos() -> bool {
    cfg!(target_os = "macos")
}
