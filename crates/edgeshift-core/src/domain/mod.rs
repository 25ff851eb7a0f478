//! Pure domain logic: geometry, lookup tables, held-input bookkeeping and the
//! run configuration.  Nothing in here talks to a display server.

pub mod buttons;
pub mod chain;
pub mod config;
pub mod coord_table;
pub mod geometry;
pub mod ledger;
