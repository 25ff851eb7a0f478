//! The connection state machine.
//!
//! ```text
//!              edge entry / release with no other buttons
//!   DISCONNECTED ----------------------------------------> CONNECTED
//!     |   ^                                                  |    |
//!     |   | last button up                  press with other |    | walk off
//!     |   +------------------- CONN_RELEASE <---- buttons ---+    | the chain
//!     | press on the trigger window                               |
//!     v                                                           |
//!   AWAIT_RELEASE --- last button up --> CONNECTED                v
//!                                                           DISCONNECTED
//! ```
//!
//! The machine owns the mutable session state (mode, current destination
//! screen, last source coordinate, ledger of held input).  Side effects on
//! the source display go through the [`SourceControl`] port.

use std::rc::Rc;

use edgeshift_core::{Configuration, ScreenChain, StuckInputLedger};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::forward_input::InputForwarder;

/// Connection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Disconnected,
    /// A button went down on the trigger window; connect once every button
    /// is released.
    AwaitRelease,
    Connected,
    /// Window mode: a multi-button chord requested a disconnect; disconnect
    /// once every button is released.
    ConnRelease,
}

impl Mode {
    /// Modes in which the source input is grabbed and forwarded.
    pub fn is_connected(self) -> bool {
        matches!(self, Mode::Connected | Mode::ConnRelease)
    }
}

/// What the caller must do after a button release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseFollowUp {
    None,
    Connect,
    Disconnect,
}

/// Error type for source display operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("pointer grab refused (status {0})")]
    PointerGrab(i32),
    #[error("keyboard grab refused (status {0})")]
    KeyboardGrab(i32),
}

/// Side effects the engine performs on the source display.
#[cfg_attr(test, mockall::automock)]
pub trait SourceControl {
    /// Grabs pointer and keyboard and starts reporting pointer motion.
    fn grab_input(&self) -> Result<(), SourceError>;

    /// Undoes [`grab_input`](Self::grab_input).  Safe to call when nothing
    /// is grabbed.
    fn release_input(&self);

    /// Warps the source pointer to absolute root coordinates.
    fn warp_pointer(&self, x: i32, y: i32);

    /// Maps the full-screen capture window, when one is configured.
    fn show_capture_window(&self);

    fn hide_capture_window(&self);

    /// Raises the trigger window above its siblings.
    fn raise_trigger(&self);

    /// Takes PRIMARY selection ownership back for the source.
    fn claim_selection(&self);
}

/// Mutable session state plus the transitions between modes.
pub struct ConnectionStateMachine {
    config: Rc<Configuration>,
    chain: ScreenChain,
    mode: Mode,
    to_screen: usize,
    last_from: i32,
    ledger: StuckInputLedger,
    holds_selection: bool,
}

impl ConnectionStateMachine {
    pub fn new(config: Rc<Configuration>, chain: ScreenChain) -> Self {
        let to_screen = chain.entry_screen();
        let holds_selection = config.selection;
        Self {
            config,
            chain,
            mode: Mode::Disconnected,
            to_screen,
            last_from: 0,
            ledger: StuckInputLedger::new(),
            holds_selection,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn chain(&self) -> &ScreenChain {
        &self.chain
    }

    /// Destination screen currently receiving input.
    pub fn to_screen(&self) -> usize {
        self.to_screen
    }

    /// Last accepted source coordinate along the transition axis.
    pub fn last_from(&self) -> i32 {
        self.last_from
    }

    pub fn ledger(&self) -> &StuckInputLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut StuckInputLedger {
        &mut self.ledger
    }

    pub fn holds_selection(&self) -> bool {
        self.holds_selection
    }

    /// Records whether the source still owns the PRIMARY selection.
    pub fn set_holds_selection(&mut self, holds: bool) {
        self.holds_selection = holds;
    }

    pub(crate) fn set_to_screen(&mut self, screen: usize) {
        debug_assert!(screen < self.chain.screen_count());
        self.to_screen = screen;
    }

    pub(crate) fn set_last_from(&mut self, along: i32) {
        self.last_from = along;
    }

    /// Enters [`Mode::Connected`]: wakes the destinations, maps the capture
    /// window and grabs the source input.
    ///
    /// When the grab is refused everything done so far is undone, the mode
    /// stays [`Mode::Disconnected`] and `false` is returned.
    pub fn connect(&mut self, source: &dyn SourceControl, forwarder: &InputForwarder) -> bool {
        forwarder.wake_all();
        source.show_capture_window();
        match source.grab_input() {
            Ok(()) => {
                self.mode = Mode::Connected;
                info!(screen = self.to_screen, "connected");
                true
            }
            Err(e) => {
                warn!("connect aborted: {e}");
                source.release_input();
                source.hide_capture_window();
                self.mode = Mode::Disconnected;
                false
            }
        }
    }

    /// Enters [`Mode::Disconnected`]: hides the capture window, releases the
    /// grabs, reclaims the selection and, with auto-up, releases every input
    /// still held on the destinations.
    pub fn disconnect(&mut self, source: &dyn SourceControl, forwarder: &InputForwarder) {
        self.mode = Mode::Disconnected;
        source.hide_capture_window();
        source.release_input();
        if self.config.selection && self.holds_selection {
            source.claim_selection();
        }
        if self.config.auto_up {
            let released = forwarder.release_all(&mut self.ledger);
            if released > 0 {
                debug!(released, "released held input");
            }
        }
        info!("disconnected");
    }

    /// Applies a button press on the source.
    ///
    /// `others_held` tells whether any other button was already down.
    /// Returns `true` when the press must be forwarded.
    pub fn on_press(&mut self, others_held: bool) -> bool {
        match self.mode {
            Mode::Disconnected => {
                debug!("button down: connect on release");
                self.mode = Mode::AwaitRelease;
                false
            }
            Mode::AwaitRelease => false,
            Mode::Connected => {
                if !self.config.edge_mode() && others_held {
                    debug!("button chord: disconnect on release");
                    self.mode = Mode::ConnRelease;
                }
                true
            }
            Mode::ConnRelease => true,
        }
    }

    /// Applies a button release on the source.
    ///
    /// Returns whether the release must be forwarded and which transition
    /// the caller has to perform afterwards.
    pub fn on_release(&self, others_held: bool) -> (bool, ReleaseFollowUp) {
        let forward = self.mode.is_connected();
        let follow_up = match self.mode {
            _ if others_held => ReleaseFollowUp::None,
            Mode::AwaitRelease => ReleaseFollowUp::Connect,
            Mode::ConnRelease => ReleaseFollowUp::Disconnect,
            Mode::Disconnected | Mode::Connected => ReleaseFollowUp::None,
        };
        (forward, follow_up)
    }

    /// Ungrabs unconditionally and, with auto-up, releases held input.
    /// Called once before exit.
    pub fn shutdown(&mut self, source: &dyn SourceControl, forwarder: &InputForwarder) {
        source.hide_capture_window();
        source.release_input();
        if self.config.auto_up {
            forwarder.release_all(&mut self.ledger);
        }
        self.mode = Mode::Disconnected;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
