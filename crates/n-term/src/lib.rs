// SPDX-License-Identifier: MIT
//
// n-term: terminal backend core for n-tty.
//
// Everything that is the same no matter how bytes reach the terminal lives
// here: the cell and style model, the ANSI encoder, the stateful cell writer,
// the `Backend` contract with its shared render path, the input queue fed by
// notification threads, Mode 2027 negotiation, and the provider registry.
//
// Concrete backends (native syscalls, crossterm) live in sibling crates and
// only supply the raw primitives: write bytes, flush, query size, toggle raw
// mode, deliver input. Coordinate translation and style diffing are written
// once, here, and tested once.

pub mod ansi;
pub mod backend;
pub mod cell;
pub mod color;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod input;
pub mod mode2027;
pub mod output;
pub mod reader;
pub mod registry;
pub mod style;

pub use backend::{Backend, BackendConfig, Render, ResizeCallback, ResizeSlot, Session};
pub use cell::{Cell, CellUpdate};
pub use color::Color;
pub use error::{Error, Result};
pub use geometry::{Position, Size};
pub use headless::HeadlessBackend;
pub use input::{CloseOnDrop, InputQueue};
pub use mode2027::Mode2027Status;
pub use registry::{BackendProvider, ProviderInfo, ProviderRegistry};
pub use style::{Attr, Hyperlink, Style, UnderlineStyle};
