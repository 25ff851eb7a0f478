//! Input forwarding: re-emits pointer, button and key input on every
//! destination display.
//!
//! The primary destination and all shadows receive identical events.  Each
//! destination resolves keysyms to its own keycodes, so a key missing from one
//! keyboard map does not stop the others from receiving it.

use std::rc::Rc;

use edgeshift_core::{ButtonInverseMap, Configuration, HeldInput, Keysym, StuckInputLedger};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Error type for destination injection.
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("{display}: {reason}")]
    Platform { display: String, reason: String },
}

/// A display that accepts synthesized input.
///
/// Implemented by the XTest adapter in the infrastructure layer and by the
/// recording double used in tests.
pub trait Destination {
    /// Display name, for logs.
    fn name(&self) -> &str;

    /// Moves the pointer to `(x, y)` on `screen`.
    fn fake_motion(&self, screen: usize, x: i32, y: i32) -> Result<(), InjectError>;

    fn fake_button(&self, button: u32, pressed: bool) -> Result<(), InjectError>;

    fn fake_key(&self, keycode: u8, pressed: bool) -> Result<(), InjectError>;

    /// Keycode that produces `keysym` on this display, if any.
    fn keycode_for(&self, keysym: Keysym) -> Option<u8>;

    /// Keysym produced by `keycode` at the unshifted or shifted level.
    fn keysym_at(&self, keycode: u8, shifted: bool) -> Keysym;

    /// Turns the monitor back on if power management blanked it.
    fn wake(&self) -> Result<(), InjectError>;

    /// Pushes buffered requests to the server.
    fn flush(&self);
}

/// A key event as seen on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub keysym: Keysym,
    pub pressed: bool,
    /// Shift was down on the source when the event happened.
    pub shift: bool,
    /// Caps Lock was active on the source when the event happened.
    pub lock: bool,
}

/// Shift adjustment wrapped around one forwarded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftBracket {
    None,
    /// Press Shift before the key, release it after.
    Hold,
    /// Release Shift before the key, press it again after.
    Lift,
}

/// The input forwarding use case.
pub struct InputForwarder {
    config: Rc<Configuration>,
    destinations: Vec<Rc<dyn Destination>>,
    buttons: ButtonInverseMap,
}

impl InputForwarder {
    /// Creates a forwarder for `destinations`; the first one is the primary.
    pub fn new(config: Rc<Configuration>, destinations: Vec<Rc<dyn Destination>>) -> Self {
        Self {
            config,
            destinations,
            buttons: ButtonInverseMap::identity(),
        }
    }

    pub fn destinations(&self) -> &[Rc<dyn Destination>] {
        &self.destinations
    }

    pub fn button_map(&self) -> &ButtonInverseMap {
        &self.buttons
    }

    /// Rebuilds the inverse button map from the primary destination's
    /// pointer mapping.
    pub fn refresh_pointer_mapping(&mut self, physical: &[u8]) {
        self.buttons.rebuild(physical, self.config.pointer_map);
        debug!(mapping = ?physical, "pointer mapping refreshed");
    }

    /// Best-effort monitor wake on every destination.
    pub fn wake_all(&self) {
        for dest in &self.destinations {
            if let Err(e) = dest.wake() {
                debug!("wake failed: {e}");
            }
        }
    }

    /// Moves the pointer on every destination.
    pub fn motion(&self, screen: usize, x: i32, y: i32) {
        if self.config.dpms_wake {
            self.wake_all();
        }
        for dest in &self.destinations {
            if let Err(e) = dest.fake_motion(screen, x, y) {
                warn!("motion not delivered: {e}");
            }
            dest.flush();
        }
    }

    /// Forwards a press or release of logical `button`.
    ///
    /// Returns `false` when the button is outside the forwarded range.
    pub fn button(&self, button: u32, pressed: bool, ledger: &mut StuckInputLedger) -> bool {
        let Some(physical) = self.buttons.physical(button) else {
            trace!(button, "button outside forwarded range");
            return false;
        };
        for dest in &self.destinations {
            if let Err(e) = dest.fake_button(physical, pressed) {
                warn!("button {physical} not delivered: {e}");
            }
            dest.flush();
        }
        if pressed {
            ledger.record(HeldInput::Button(physical));
        } else {
            ledger.clear(HeldInput::Button(physical));
        }
        true
    }

    /// Types the key sequence configured for `button`, if there is one.
    ///
    /// Returns `true` when a sequence was sent in place of the click.
    pub fn button_keys(&self, button: u32) -> bool {
        let Some(keys) = self.config.keys_for_button(button) else {
            return false;
        };
        for dest in &self.destinations {
            for &keysym in keys {
                let Some(keycode) = dest.keycode_for(keysym) else {
                    debug!("{}: no keycode for {keysym}", dest.name());
                    continue;
                };
                self.send_key(dest.as_ref(), keycode, true);
                self.send_key(dest.as_ref(), keycode, false);
            }
            dest.flush();
        }
        true
    }

    /// Forwards one key event.
    pub fn key(&self, input: &KeyInput, ledger: &mut StuckInputLedger) {
        let keysym = input.keysym;
        let hack = self.config.capslock_hack;
        if hack && (keysym == Keysym::CAPS_LOCK || (input.lock && keysym.is_shift())) {
            trace!(%keysym, "suppressed by capslock hack");
            return;
        }

        let sticky = self.config.is_sticky(keysym);
        for dest in &self.destinations {
            let Some(keycode) = dest.keycode_for(keysym) else {
                debug!("{}: no keycode for {keysym}", dest.name());
                continue;
            };
            let bracket = if hack && input.lock {
                if input.shift ^ keysym.is_alpha() {
                    ShiftBracket::Hold
                } else {
                    ShiftBracket::None
                }
            } else if hack {
                shift_correction(dest.as_ref(), keycode, keysym, input.shift)
            } else {
                ShiftBracket::None
            };

            let shift = match bracket {
                ShiftBracket::None => None,
                _ => dest.keycode_for(Keysym::SHIFT_L),
            };
            if let Some(shift) = shift {
                self.send_key(dest.as_ref(), shift, bracket == ShiftBracket::Hold);
            }
            if sticky {
                self.send_key(dest.as_ref(), keycode, true);
                self.send_key(dest.as_ref(), keycode, false);
            } else {
                self.send_key(dest.as_ref(), keycode, input.pressed);
            }
            if let Some(shift) = shift {
                self.send_key(dest.as_ref(), shift, bracket == ShiftBracket::Lift);
            }
            dest.flush();
        }

        if sticky {
            return;
        }
        if input.pressed {
            ledger.record(HeldInput::Key(keysym));
        } else {
            ledger.clear(HeldInput::Key(keysym));
        }
    }

    /// Releases every ledger entry on every destination and empties the
    /// ledger.  Each destination is flushed after each entry.
    ///
    /// Returns the number of entries released.
    pub fn release_all(&self, ledger: &mut StuckInputLedger) -> usize {
        let held = ledger.take_all();
        for input in &held {
            for dest in &self.destinations {
                let result = match *input {
                    HeldInput::Button(button) => dest.fake_button(button, false),
                    HeldInput::Key(keysym) => match dest.keycode_for(keysym) {
                        Some(keycode) => dest.fake_key(keycode, false),
                        None => Ok(()),
                    },
                };
                if let Err(e) = result {
                    warn!("release of {input:?} not delivered: {e}");
                }
                dest.flush();
            }
        }
        held.len()
    }

    fn send_key(&self, dest: &dyn Destination, keycode: u8, pressed: bool) {
        if let Err(e) = dest.fake_key(keycode, pressed) {
            warn!("key {keycode} not delivered: {e}");
        }
    }
}

/// Decides whether Shift must be flipped for `keycode` to produce `keysym`
/// on `dest` given the source's shift state.
fn shift_correction(
    dest: &dyn Destination,
    keycode: u8,
    keysym: Keysym,
    shift: bool,
) -> ShiftBracket {
    if keysym.is_shift() || keysym.is_keypad() {
        return ShiftBracket::None;
    }
    let plain = dest.keysym_at(keycode, false);
    let shifted = dest.keysym_at(keycode, true);
    if shifted == Keysym::NO_SYMBOL || plain == shifted {
        return ShiftBracket::None;
    }
    match (shift, plain == keysym, shifted == keysym) {
        (false, false, true) => ShiftBracket::Hold,
        (true, true, false) => ShiftBracket::Lift,
        _ => ShiftBracket::None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::display::mock::{Injected, RecordingDestination};

    const KEY_A: Keysym = Keysym(0x61);
    const KEY_UPPER_A: Keysym = Keysym(0x41);
    const KEY_1: Keysym = Keysym(0x31);
    const KEY_EXCLAM: Keysym = Keysym(0x21);
    const NUM_LOCK: Keysym = Keysym(0xff7f);

    fn forwarder_with(
        config: Configuration,
        count: usize,
    ) -> (InputForwarder, Vec<Rc<RecordingDestination>>) {
        let recorders: Vec<Rc<RecordingDestination>> = (0..count)
            .map(|i| Rc::new(RecordingDestination::new(&format!("dest{i}"))))
            .collect();
        let destinations = recorders
            .iter()
            .map(|r| Rc::clone(r) as Rc<dyn Destination>)
            .collect();
        (InputForwarder::new(Rc::new(config), destinations), recorders)
    }

    fn press(keysym: Keysym) -> KeyInput {
        KeyInput {
            keysym,
            pressed: true,
            shift: false,
            lock: false,
        }
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_key_press_reaches_every_destination_and_is_recorded() {
        // Arrange
        let (forwarder, dests) = forwarder_with(Configuration::default(), 2);
        let mut ledger = StuckInputLedger::new();
        let keycode = dests[0].keycode_of(KEY_A);

        // Act
        forwarder.key(&press(KEY_A), &mut ledger);

        // Assert
        for dest in &dests {
            assert_eq!(dest.injected(), vec![Injected::Key(keycode, true)]);
            assert_eq!(dest.flush_count(), 1);
        }
        assert!(ledger.contains(HeldInput::Key(KEY_A)));
    }

    #[test]
    fn test_key_release_clears_ledger() {
        let (forwarder, _dests) = forwarder_with(Configuration::default(), 1);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(&press(KEY_A), &mut ledger);
        forwarder.key(
            &KeyInput {
                pressed: false,
                ..press(KEY_A)
            },
            &mut ledger,
        );

        assert!(ledger.is_empty());
    }

    #[test]
    fn test_sticky_key_sends_press_and_release_and_is_not_tracked() {
        // Arrange
        let config = Configuration {
            sticky: vec![NUM_LOCK],
            ..Configuration::default()
        };
        let (forwarder, dests) = forwarder_with(config, 1);
        let mut ledger = StuckInputLedger::new();
        let keycode = dests[0].keycode_of(NUM_LOCK);

        // Act: a release event on a sticky key still produces a full tap
        forwarder.key(
            &KeyInput {
                pressed: false,
                ..press(NUM_LOCK)
            },
            &mut ledger,
        );

        // Assert
        assert_eq!(
            dests[0].injected(),
            vec![Injected::Key(keycode, true), Injected::Key(keycode, false)]
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_missing_keycode_skips_only_that_destination() {
        let (forwarder, dests) = forwarder_with(Configuration::default(), 2);
        dests[0].forget_keysym(KEY_A);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(&press(KEY_A), &mut ledger);

        assert!(dests[0].injected().is_empty());
        assert_eq!(dests[1].injected().len(), 1);
    }

    #[test]
    fn test_injection_failure_does_not_stop_other_destinations() {
        let (forwarder, dests) = forwarder_with(Configuration::default(), 2);
        dests[0].set_should_fail(true);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(&press(KEY_A), &mut ledger);

        assert_eq!(dests[1].injected().len(), 1);
        assert!(ledger.contains(HeldInput::Key(KEY_A)));
    }

    // ── CapsLock hack ─────────────────────────────────────────────────────────

    fn capslock_config() -> Configuration {
        Configuration {
            capslock_hack: true,
            ..Configuration::default()
        }
    }

    #[test]
    fn test_capslock_hack_suppresses_shift_while_locked() {
        let (forwarder, dests) = forwarder_with(capslock_config(), 1);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(
            &KeyInput {
                lock: true,
                ..press(Keysym::SHIFT_L)
            },
            &mut ledger,
        );

        assert!(dests[0].injected().is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_capslock_hack_never_forwards_caps_lock() {
        let (forwarder, dests) = forwarder_with(capslock_config(), 1);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(&press(Keysym::CAPS_LOCK), &mut ledger);

        assert!(dests[0].injected().is_empty());
    }

    #[test]
    fn test_capslock_hack_brackets_unshifted_letter_with_shift() {
        // Arrange
        let (forwarder, dests) = forwarder_with(capslock_config(), 1);
        let mut ledger = StuckInputLedger::new();
        let shift = dests[0].keycode_of(Keysym::SHIFT_L);
        let key = dests[0].keycode_of(KEY_UPPER_A);

        // Act
        forwarder.key(
            &KeyInput {
                lock: true,
                ..press(KEY_UPPER_A)
            },
            &mut ledger,
        );

        // Assert
        assert_eq!(
            dests[0].injected(),
            vec![
                Injected::Key(shift, true),
                Injected::Key(key, true),
                Injected::Key(shift, false),
            ]
        );
    }

    #[test]
    fn test_capslock_hack_leaves_shifted_letter_unbracketed() {
        let (forwarder, dests) = forwarder_with(capslock_config(), 1);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(
            &KeyInput {
                lock: true,
                shift: true,
                ..press(KEY_A)
            },
            &mut ledger,
        );

        assert_eq!(dests[0].injected().len(), 1);
    }

    // ── Shift correction ──────────────────────────────────────────────────────

    #[test]
    fn test_shift_correction_holds_shift_for_symbol_on_shifted_level() {
        // Arrange: '!' lives on the shifted level of the '1' key
        let (forwarder, dests) = forwarder_with(capslock_config(), 1);
        dests[0].set_levels(KEY_EXCLAM, KEY_1, KEY_EXCLAM);
        let shift = dests[0].keycode_of(Keysym::SHIFT_L);
        let key = dests[0].keycode_of(KEY_EXCLAM);
        let mut ledger = StuckInputLedger::new();

        // Act
        forwarder.key(&press(KEY_EXCLAM), &mut ledger);

        // Assert
        assert_eq!(
            dests[0].injected(),
            vec![
                Injected::Key(shift, true),
                Injected::Key(key, true),
                Injected::Key(shift, false),
            ]
        );
    }

    #[test]
    fn test_shift_correction_lifts_shift_for_symbol_on_plain_level() {
        let (forwarder, dests) = forwarder_with(capslock_config(), 1);
        dests[0].set_levels(KEY_1, KEY_1, KEY_EXCLAM);
        let shift = dests[0].keycode_of(Keysym::SHIFT_L);
        let key = dests[0].keycode_of(KEY_1);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(
            &KeyInput {
                shift: true,
                ..press(KEY_1)
            },
            &mut ledger,
        );

        assert_eq!(
            dests[0].injected(),
            vec![
                Injected::Key(shift, false),
                Injected::Key(key, true),
                Injected::Key(shift, true),
            ]
        );
    }

    #[test]
    fn test_shift_correction_is_off_without_capslock_hack() {
        let (forwarder, dests) = forwarder_with(Configuration::default(), 1);
        dests[0].set_levels(KEY_EXCLAM, KEY_1, KEY_EXCLAM);
        let mut ledger = StuckInputLedger::new();

        forwarder.key(&press(KEY_EXCLAM), &mut ledger);

        assert_eq!(dests[0].injected().len(), 1);
    }

    // ── Buttons ───────────────────────────────────────────────────────────────

    #[test]
    fn test_button_is_remapped_through_inverse_map() {
        // Arrange
        let (mut forwarder, dests) = forwarder_with(Configuration::default(), 1);
        forwarder.refresh_pointer_mapping(&[3, 2, 1]);
        let mut ledger = StuckInputLedger::new();

        // Act
        let forwarded = forwarder.button(1, true, &mut ledger);

        // Assert
        assert!(forwarded);
        assert_eq!(dests[0].injected(), vec![Injected::Button(3, true)]);
        assert!(ledger.contains(HeldInput::Button(3)));
    }

    #[test]
    fn test_pointer_map_disabled_keeps_identity() {
        let config = Configuration {
            pointer_map: false,
            ..Configuration::default()
        };
        let (mut forwarder, dests) = forwarder_with(config, 1);
        forwarder.refresh_pointer_mapping(&[3, 2, 1]);
        let mut ledger = StuckInputLedger::new();

        forwarder.button(1, true, &mut ledger);

        assert_eq!(dests[0].injected(), vec![Injected::Button(1, true)]);
    }

    #[test]
    fn test_out_of_range_button_is_not_forwarded() {
        let (forwarder, dests) = forwarder_with(Configuration::default(), 1);
        let mut ledger = StuckInputLedger::new();

        assert!(!forwarder.button(12, true, &mut ledger));
        assert!(dests[0].injected().is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_button_keys_types_configured_sequence() {
        // Arrange
        let mut config = Configuration::default();
        config.button_keys.insert(8, vec![KEY_A, KEY_1]);
        let (forwarder, dests) = forwarder_with(config, 1);
        let a = dests[0].keycode_of(KEY_A);
        let one = dests[0].keycode_of(KEY_1);

        // Act
        let handled = forwarder.button_keys(8);

        // Assert
        assert!(handled);
        assert_eq!(
            dests[0].injected(),
            vec![
                Injected::Key(a, true),
                Injected::Key(a, false),
                Injected::Key(one, true),
                Injected::Key(one, false),
            ]
        );
        assert!(!forwarder.button_keys(1));
    }

    // ── Motion ────────────────────────────────────────────────────────────────

    #[test]
    fn test_motion_reaches_every_destination() {
        let (forwarder, dests) = forwarder_with(Configuration::default(), 3);

        forwarder.motion(1, 40, 50);

        for dest in &dests {
            assert_eq!(dest.injected(), vec![Injected::Motion(1, 40, 50)]);
            assert_eq!(dest.wake_count(), 0);
        }
    }

    #[test]
    fn test_motion_wakes_destinations_when_enabled() {
        let config = Configuration {
            dpms_wake: true,
            ..Configuration::default()
        };
        let (forwarder, dests) = forwarder_with(config, 2);

        forwarder.motion(0, 1, 1);

        assert!(dests.iter().all(|d| d.wake_count() == 1));
    }

    // ── Release all ───────────────────────────────────────────────────────────

    #[test]
    fn test_release_all_on_empty_ledger_emits_nothing() {
        let (forwarder, dests) = forwarder_with(Configuration::default(), 2);
        let mut ledger = StuckInputLedger::new();

        assert_eq!(forwarder.release_all(&mut ledger), 0);
        assert!(dests.iter().all(|d| d.injected().is_empty()));
        assert!(dests.iter().all(|d| d.flush_count() == 0));
    }

    #[test]
    fn test_release_all_emits_one_release_per_entry_per_destination() {
        // Arrange
        let (forwarder, dests) = forwarder_with(Configuration::default(), 2);
        let mut ledger = StuckInputLedger::new();
        ledger.record(HeldInput::Key(KEY_A));
        ledger.record(HeldInput::Button(1));

        // Act
        let released = forwarder.release_all(&mut ledger);

        // Assert
        assert_eq!(released, 2);
        assert!(ledger.is_empty());
        for dest in &dests {
            let a = dest.keycode_of(KEY_A);
            assert_eq!(
                dest.injected(),
                vec![Injected::Key(a, false), Injected::Button(1, false)]
            );
            assert_eq!(dest.flush_count(), 2);
        }
    }
}
