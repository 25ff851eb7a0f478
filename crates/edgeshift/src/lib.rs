//! edgeshift library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does edgeshift do? (for beginners)
//!
//! edgeshift lets the pointer and keyboard of one X display (the *source*)
//! drive one or more other X displays (the *destinations*).  A thin trigger
//! window sits at one edge of the source screen.  When the pointer enters
//! it, edgeshift grabs the source pointer and keyboard and starts replaying
//! everything through the XTest extension on the destination.  Walking
//! back off the far side of the destination chain releases the grabs and
//! drops the pointer back onto the source.
//!
//! Without an edge the trigger is an ordinary window: clicking it connects
//! and keys typed into it are forwarded.
//!
//! # Layers
//!
//! - **`application`** – the connection state machine, the motion
//!   processor, the input forwarder and the [`Session`] that dispatches
//!   decoded events to them.  Nothing here knows about Xlib.
//! - **`infrastructure`** – the X11 adapters, recording doubles for tests,
//!   the async event loop and the TOML configuration file.
//!
//! [`Session`]: application::session::Session

use std::process::ExitCode;

use thiserror::Error;

use edgeshift_core::{ConfigError, TableError};

use crate::infrastructure::display::DisplayError;
use crate::infrastructure::storage::config::FileConfigError;

/// Application layer: connection handling and input forwarding.
pub mod application;

/// Infrastructure layer: display adapters, event loop and storage.
pub mod infrastructure;

/// A fatal startup error.
///
/// Each variant maps to the process exit status reported by
/// [`AppError::exit_code`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ConfigFile(#[from] FileConfigError),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error("cannot lay out destination screens: {0}")]
    Layout(#[from] TableError),

    #[error("{0}")]
    Usage(String),
}

impl AppError {
    /// Exit status for this error.
    ///
    /// | status | cause                                               |
    /// |--------|-----------------------------------------------------|
    /// | 1      | source and destination are the same display         |
    /// | 2      | the source display cannot be opened                 |
    /// | 3      | a destination cannot be opened, lacks XTest, or has |
    /// |        | screens that cannot be laid out                     |
    /// | 4      | usage or configuration error                        |
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(ConfigError::SameDisplay(_)) => 1,
            AppError::Display(DisplayError::SourceUnavailable(_)) => 2,
            AppError::Display(_) | AppError::Layout(_) => 3,
            AppError::Config(_) | AppError::ConfigFile(_) | AppError::Usage(_) => 4,
        }
    }
}

impl From<&AppError> for ExitCode {
    fn from(error: &AppError) -> Self {
        ExitCode::from(error.exit_code())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_display_exits_with_one() {
        let error = AppError::from(ConfigError::SameDisplay(":0".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_display_errors_split_between_source_and_destination() {
        assert_eq!(
            AppError::from(DisplayError::SourceUnavailable(":0".into())).exit_code(),
            2
        );
        assert_eq!(
            AppError::from(DisplayError::DestinationUnavailable(":1".into())).exit_code(),
            3
        );
        assert_eq!(
            AppError::from(DisplayError::MissingXTest(":1".into())).exit_code(),
            3
        );
    }

    #[test]
    fn test_unusable_destination_layout_exits_with_three() {
        let error = AppError::from(TableError::ZeroDestinationExtent { screen: 0 });
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_configuration_errors_exit_with_four() {
        assert_eq!(AppError::from(ConfigError::ZeroTriggerWidth).exit_code(), 4);
        assert_eq!(AppError::Usage("bad flag".into()).exit_code(), 4);
    }
}
