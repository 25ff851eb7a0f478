//! The session: dispatches translated display events to the state machine,
//! the motion processor and the input forwarder.
//!
//! Display adapters translate raw X events into [`SourceEvent`] and
//! [`DestinationEvent`] values; everything below this point is free of X
//! types and runs unchanged against the recording doubles in tests.

use std::collections::BTreeSet;
use std::rc::Rc;

use edgeshift_core::{ButtonMask, Configuration, ScreenChain, StuckInputLedger};
use tracing::{debug, trace};

use super::connection::{ConnectionStateMachine, Mode, ReleaseFollowUp, SourceControl};
use super::forward_input::{Destination, InputForwarder, KeyInput};
use super::motion::{process_motion, MotionOutcome, MotionSample};

/// An event reported by the source display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Motion {
        x: i32,
        y: i32,
        same_screen: bool,
        buttons: ButtonMask,
    },
    /// The pointer entered the trigger window.  `normal` is `false` for
    /// crossings caused by grabs.
    Enter { x: i32, y: i32, normal: bool },
    ButtonPress {
        button: u32,
        x: i32,
        y: i32,
        /// Buttons held just before this press.
        buttons: ButtonMask,
    },
    ButtonRelease {
        button: u32,
        x: i32,
        y: i32,
        /// Buttons held just before this release, including `button`.
        buttons: ButtonMask,
    },
    Key(KeyInput),
    /// The trigger window is at least partly covered.
    Obscured,
    /// Another client took the PRIMARY selection.
    SelectionLost,
    /// The window manager asked the trigger window to close.
    CloseRequested,
}

/// An event reported by the primary destination display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationEvent {
    /// The pointer button mapping changed; carries the new mapping.
    PointerMappingChanged(Vec<u8>),
}

/// Whether the event loop keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One running edgeshift session.
pub struct Session {
    machine: ConnectionStateMachine,
    forwarder: InputForwarder,
    source: Rc<dyn SourceControl>,
    /// Buttons whose press typed a key sequence; their releases are dropped.
    typed_buttons: BTreeSet<u32>,
}

impl Session {
    /// Creates a disconnected session.
    ///
    /// `pointer_mapping` is the primary destination's current pointer
    /// mapping, used to seed the inverse button map.
    pub fn new(
        config: Rc<Configuration>,
        chain: ScreenChain,
        source: Rc<dyn SourceControl>,
        destinations: Vec<Rc<dyn Destination>>,
        pointer_mapping: &[u8],
    ) -> Self {
        let mut forwarder = InputForwarder::new(Rc::clone(&config), destinations);
        forwarder.refresh_pointer_mapping(pointer_mapping);
        Self {
            machine: ConnectionStateMachine::new(config, chain),
            forwarder,
            source,
            typed_buttons: BTreeSet::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn to_screen(&self) -> usize {
        self.machine.to_screen()
    }

    pub fn ledger(&self) -> &StuckInputLedger {
        self.machine.ledger()
    }

    pub fn machine(&self) -> &ConnectionStateMachine {
        &self.machine
    }

    pub fn forwarder(&self) -> &InputForwarder {
        &self.forwarder
    }

    pub fn handle_source_event(&mut self, event: SourceEvent) -> Flow {
        trace!(?event, "source event");
        match event {
            SourceEvent::Motion {
                x,
                y,
                same_screen,
                buttons,
            } => {
                if self.machine.mode().is_connected() {
                    self.on_motion(x, y, same_screen, buttons);
                }
            }
            SourceEvent::Enter { x, y, normal } => self.on_enter(x, y, normal),
            SourceEvent::ButtonPress {
                button, buttons, ..
            } => self.on_button_press(button, buttons),
            SourceEvent::ButtonRelease {
                button,
                x,
                y,
                buttons,
            } => self.on_button_release(button, x, y, buttons),
            SourceEvent::Key(input) => self.forwarder.key(&input, self.machine.ledger_mut()),
            SourceEvent::Obscured => {
                if self.machine.config().resurface {
                    self.source.raise_trigger();
                }
            }
            SourceEvent::SelectionLost => {
                debug!("PRIMARY selection lost");
                self.machine.set_holds_selection(false);
            }
            SourceEvent::CloseRequested => {
                debug!("close requested");
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    pub fn handle_destination_event(&mut self, event: DestinationEvent) {
        match event {
            DestinationEvent::PointerMappingChanged(mapping) => {
                self.forwarder.refresh_pointer_mapping(&mapping);
            }
        }
    }

    /// Releases the grabs and, with auto-up, everything still held on the
    /// destinations.
    pub fn shutdown(&mut self) {
        self.machine.shutdown(self.source.as_ref(), &self.forwarder);
    }

    fn on_motion(
        &mut self,
        x: i32,
        y: i32,
        same_screen: bool,
        buttons: ButtonMask,
    ) -> MotionOutcome {
        let axis = self.machine.chain().axis();
        let sample = MotionSample::from_point(axis, x, y, same_screen, buttons);
        process_motion(&mut self.machine, &sample, self.source.as_ref(), &self.forwarder)
    }

    fn on_enter(&mut self, x: i32, y: i32, normal: bool) {
        if !normal || self.machine.mode() != Mode::Disconnected {
            return;
        }
        if !self.machine.config().edge_mode() {
            return;
        }
        if !self.machine.connect(self.source.as_ref(), &self.forwarder) {
            return;
        }

        let axis = self.machine.chain().axis();
        let (_, across) = axis.split(x, y);
        let connect = self.machine.chain().anchors().connect;
        let (wx, wy) = axis.join(connect, across);
        self.source.warp_pointer(wx, wy);
        self.machine.set_last_from(connect);
        self.on_motion(wx, wy, true, ButtonMask::NONE);
    }

    fn on_button_press(&mut self, button: u32, buttons: ButtonMask) {
        let others = buttons.without(button);
        if !self.machine.on_press(!others.is_empty()) {
            return;
        }
        if self.machine.mode() == Mode::Connected && self.forwarder.button_keys(button) {
            self.typed_buttons.insert(button);
            return;
        }
        self.forwarder.button(button, true, self.machine.ledger_mut());
    }

    fn on_button_release(&mut self, button: u32, x: i32, y: i32, buttons: ButtonMask) {
        let others = buttons.without(button);
        let (forward, follow_up) = self.machine.on_release(!others.is_empty());
        let typed = self.typed_buttons.remove(&button);
        if forward && !typed {
            self.forwarder.button(button, false, self.machine.ledger_mut());
        }

        match follow_up {
            ReleaseFollowUp::None => {}
            ReleaseFollowUp::Connect => {
                if self.machine.connect(self.source.as_ref(), &self.forwarder) {
                    let (along, _) = self.machine.chain().axis().split(x, y);
                    self.machine.set_last_from(along);
                    self.on_motion(x, y, true, ButtonMask::NONE);
                }
            }
            ReleaseFollowUp::Disconnect => {
                self.machine.disconnect(self.source.as_ref(), &self.forwarder);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
