//! Application layer: the use cases that sit between the display adapters
//! and the display-independent domain in `edgeshift-core`.

pub mod connection;
pub mod forward_input;
pub mod motion;
pub mod session;
