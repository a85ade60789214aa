// SPDX-License-Identifier: MIT
//
// n-tty: terminal backends with runtime selection.
//
//   n-term      → cell model, ANSI encoding, backend contract, registry
//   n-native    → termios / console API backend        (feature `native`)
//   n-crossterm → crossterm backend                    (feature `crossterm`)
//
// The registry holds exactly the providers compiled in. `create()` picks
// one by, in order:
//
//   1. the process override (`set_backend_override`)
//   2. the `N_TTY_BACKEND` environment variable
//   3. the only registered provider, if there is just one
//
// A selection containing `::` is matched against provider ids
// (`n_native::NativeBackend`), anything else against names (`native`),
// ignoring case.

use std::sync::{Mutex, OnceLock};

pub use n_term;
pub use n_term::{
    Backend, BackendConfig, BackendProvider, Error, ProviderInfo, ProviderRegistry, Render,
    Result,
};

/// Environment variable naming the backend to use.
pub const BACKEND_ENV: &str = "N_TTY_BACKEND";

static BACKEND_OVERRIDE: Mutex<Option<String>> = Mutex::new(None);

/// Force a backend for this process, taking precedence over
/// [`BACKEND_ENV`].
pub fn set_backend_override(selector: impl Into<String>) {
    let selector = selector.into();
    tracing::debug!(selector = %selector, "backend override set");
    if let Ok(mut guard) = BACKEND_OVERRIDE.lock() {
        *guard = Some(selector);
    }
}

pub fn clear_backend_override() {
    if let Ok(mut guard) = BACKEND_OVERRIDE.lock() {
        *guard = None;
    }
}

/// The active selection: override first, then the environment. Blank
/// values count as unset.
#[must_use]
pub fn backend_selector() -> Option<String> {
    let overridden = BACKEND_OVERRIDE.lock().ok().and_then(|guard| guard.clone());
    resolve_selector(overridden, std::env::var(BACKEND_ENV).ok())
}

fn resolve_selector(overridden: Option<String>, env: Option<String>) -> Option<String> {
    let present = |s: &String| !s.trim().is_empty();
    overridden.filter(present).or_else(|| env.filter(present))
}

/// Providers compiled into this build, built once.
pub fn registry() -> &'static ProviderRegistry {
    static REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        #[allow(unused_mut)]
        let mut registry = ProviderRegistry::new();
        #[cfg(feature = "native")]
        registry.register(n_native::PROVIDER);
        #[cfg(feature = "crossterm")]
        registry.register(n_crossterm::PROVIDER);
        registry
    })
}

/// Create the selected backend with default configuration.
///
/// # Errors
///
/// [`Error::NoProvider`], [`Error::ProviderNotFound`] or
/// [`Error::AmbiguousProvider`] when selection fails;
/// [`Error::ProviderInstantiation`] when the backend can't be opened.
pub fn create() -> Result<Box<dyn Backend>> {
    create_with(&BackendConfig::default())
}

/// [`create`] with explicit configuration.
///
/// # Errors
///
/// See [`create`].
pub fn create_with(config: &BackendConfig) -> Result<Box<dyn Backend>> {
    let selector = backend_selector();
    registry().create(selector.as_deref(), config)
}
