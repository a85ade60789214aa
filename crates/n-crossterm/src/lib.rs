// SPDX-License-Identifier: MIT
//
// n-crossterm: terminal backend built on crossterm.
//
// The alternative to n-native when crossterm's platform coverage is
// preferred. Rendering and escape sequences are still n-term's; crossterm
// provides raw mode, the size query and the input event stream.

mod backend;
pub mod input;

pub use backend::CrosstermBackend;

use n_term::{Backend, BackendConfig, BackendProvider, Result};

/// Registration entry for the backend registry.
pub const PROVIDER: BackendProvider =
    BackendProvider::new("crossterm", "n_crossterm::CrosstermBackend", create);

fn create(config: &BackendConfig) -> Result<Box<dyn Backend>> {
    Ok(Box::new(CrosstermBackend::with_config(config.clone())?))
}
