//! # edgeshift-core
//!
//! Display-independent building blocks for edgeshift, a tool that lets the
//! pointer and keyboard of one X display drive one or more other displays
//! by walking off a screen edge.
//!
//! - **`domain`** – the destination screen chain and its per-screen
//!   coordinate tables, the ledger of input held down on destinations, the
//!   inverse pointer-button map and the immutable run [`Configuration`].
//! - **`keymap`** – keysym values and the name table used to parse
//!   `-sticky` and `-buttonmap` arguments.
//!
//! The crate never opens a display; everything here is exercised directly
//! by unit tests and benchmarks.

pub mod domain;
pub mod keymap;

pub use domain::buttons::{ButtonInverseMap, ButtonMask, MAX_BUTTONS};
pub use domain::chain::{Anchors, ChainLayout, ScreenChain};
pub use domain::config::{ConfigError, Configuration, WindowGeometry};
pub use domain::coord_table::{Cell, CoordinateTable, TableError};
pub use domain::geometry::{Axis, Edge, ScreenGeometry};
pub use domain::ledger::{HeldInput, StuckInputLedger};
pub use keymap::Keysym;
