//! Infrastructure layer.
//!
//! Contains the adapters that talk to the outside world: X display
//! connections, the async event loop and the configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `edgeshift_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`display`** – the Xlib/XTest implementations of the `SourceControl`
//!   and `Destination` ports, plus recording doubles for tests.
//! - **`event_loop`** – waits on every display socket and Ctrl-C and feeds
//!   translated events to the session.
//! - **`storage`** – the TOML configuration file.

pub mod display;
pub mod event_loop;
pub mod storage;
