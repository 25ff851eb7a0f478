//! Display adapters.
//!
//! The X11 implementation is selected at compile time via
//! `#[cfg(target_os = "linux")]`.  Recording doubles for tests live in
//! [`mock`].

pub mod mock;

#[cfg(target_os = "linux")]
pub mod x11;

use std::time::Duration;

use thiserror::Error;
use tokio::time;
use tracing::{info, warn};

/// Errors raised while opening or preparing a display.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("cannot open source display {0}")]
    SourceUnavailable(String),

    #[error("cannot open destination display {0}")]
    DestinationUnavailable(String),

    #[error("display {0} does not support the XTest extension")]
    MissingXTest(String),

    #[error("no display name given and DISPLAY is not set")]
    NoDisplayName,
}

/// Resolves an optional display name, falling back to `$DISPLAY`.
///
/// # Errors
///
/// Returns [`DisplayError::NoDisplayName`] when neither is available.
pub fn resolve_display_name(name: Option<&str>) -> Result<String, DisplayError> {
    match name {
        Some(name) => Ok(name.to_string()),
        None => std::env::var("DISPLAY").map_err(|_| DisplayError::NoDisplayName),
    }
}

/// Calls `open` until it succeeds.
///
/// Without `wait` the first failure is returned.  With `wait` every failure
/// is logged and the call repeated after `interval`.
pub async fn open_with_retry<T, F>(
    name: &str,
    wait: bool,
    interval: Duration,
    mut open: F,
) -> Result<T, DisplayError>
where
    F: FnMut(&str) -> Result<T, DisplayError>,
{
    loop {
        match open(name) {
            Ok(display) => {
                info!("opened display {name}");
                return Ok(display);
            }
            Err(e) if wait => {
                warn!("{e}; retrying in {interval:?}");
                time::sleep(interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
