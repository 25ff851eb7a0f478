//! Motion processing: turns a source pointer sample into a destination
//! position, walking the screen chain and disconnecting at its ends.

use edgeshift_core::{Axis, ButtonMask, Cell};
use tracing::{debug, trace};

use super::connection::{ConnectionStateMachine, SourceControl};
use super::forward_input::InputForwarder;

/// One pointer sample from the source, split along the transition axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSample {
    pub along: i32,
    pub across: i32,
    /// `false` when the pointer left the source screen.
    pub same_screen: bool,
    /// Buttons held on the source when the sample was taken.
    pub buttons: ButtonMask,
}

impl MotionSample {
    pub fn from_point(axis: Axis, x: i32, y: i32, same_screen: bool, buttons: ButtonMask) -> Self {
        let (along, across) = axis.split(x, y);
        Self {
            along,
            across,
            same_screen,
            buttons,
        }
    }
}

/// What happened to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Implausible jump, discarded.
    Dropped,
    /// The destination pointer was moved to `along`/`across` on `screen`.
    Forwarded { screen: usize, along: i32, across: i32 },
}

/// Processes one motion sample.
///
/// A sentinel cell moves to the neighbouring destination screen, or past
/// the end of the chain disconnects (unless button-block holds it).  In
/// both cases the source pointer is warped to the matching anchor so the
/// user can keep moving.  The destination always receives a motion.
pub fn process_motion(
    machine: &mut ConnectionStateMachine,
    sample: &MotionSample,
    source: &dyn SourceControl,
    forwarder: &InputForwarder,
) -> MotionOutcome {
    let mut screen = machine.to_screen();
    let mut from = sample.along;

    let cell = if sample.same_screen {
        let delta = (machine.last_from() - from).abs();
        if delta > machine.chain().unreasonable_delta() {
            trace!(from, last = machine.last_from(), "dropping implausible sample");
            return MotionOutcome::Dropped;
        }
        machine.chain().lookup(screen, from)
    } else if machine.last_from() < from {
        Cell::Decr
    } else {
        Cell::Incr
    };

    let to = match cell {
        Cell::Coord(to) => to,
        Cell::Incr | Cell::Decr => {
            let anchors = machine.chain().anchors();
            let last_screen = machine.chain().screen_count() - 1;
            let neighbour = match cell {
                Cell::Incr if screen < last_screen => Some((screen + 1, anchors.incoming_incr)),
                Cell::Decr if screen > 0 => Some((screen - 1, anchors.incoming_decr)),
                _ => None,
            };

            let mut aborted = false;
            let to = match neighbour {
                Some((next, landing)) => {
                    debug!(from = screen, to = next, "changing destination screen");
                    machine.set_to_screen(next);
                    screen = next;
                    from = landing;
                    machine.chain().resolve(screen, from)
                }
                None => {
                    let blocked = machine.config().button_block
                        && (!sample.buttons.is_empty() || machine.ledger().holds_button());
                    if blocked {
                        trace!("disconnect blocked by held button");
                        aborted = true;
                    } else {
                        machine.disconnect(source, forwarder);
                        from = anchors.disconnect;
                    }
                    machine.chain().resolve(screen, anchors.connect)
                }
            };

            if !aborted {
                let (x, y) = machine.chain().axis().join(from, sample.across);
                source.warp_pointer(x, y);
            }
            to
        }
    };

    machine.set_last_from(from);
    let across = machine.chain().map_across(screen, sample.across);
    let (x, y) = machine.chain().axis().join(to, across);
    forwarder.motion(screen, x, y);

    MotionOutcome::Forwarded {
        screen,
        along: to,
        across,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
