//! X11 keysyms: the symbolic key identifiers forwarded to destinations.
//!
//! Keys travel between displays as keysyms, not keycodes, because keycodes
//! are private to each server.  Each destination translates the keysym back
//! to one of its own keycodes before injecting it.

mod names;

use std::fmt;

use names::{F1, KEYSYM_NAMES};

/// An X11 keysym value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keysym(pub u32);

impl Keysym {
    pub const NO_SYMBOL: Keysym = Keysym(0);
    pub const SHIFT_L: Keysym = Keysym(0xffe1);
    pub const SHIFT_R: Keysym = Keysym(0xffe2);
    pub const CAPS_LOCK: Keysym = Keysym(0xffe5);

    /// Resolves a keysym name the way `XStringToKeysym` does for the names
    /// users pass on the command line: table names (`Num_Lock`), function
    /// keys (`F1`..`F35`), single Latin-1 characters (`a`), `U+20AC`
    /// Unicode names and raw hex (`0xff7f`).
    pub fn from_name(name: &str) -> Option<Keysym> {
        if let Some(&(_, value)) = KEYSYM_NAMES.iter().find(|(known, _)| *known == name) {
            return Some(Keysym(value));
        }

        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            let code = ch as u32;
            return match code {
                0x20..=0x7e | 0xa0..=0xff => Some(Keysym(code)),
                _ => Some(Keysym(0x0100_0000 + code)),
            };
        }

        if let Some(number) = name.strip_prefix('F') {
            if let Ok(n @ 1..=35) = number.parse::<u32>() {
                return Some(Keysym(F1 + n - 1));
            }
        }

        if let Some(hex) = name.strip_prefix("U+").or_else(|| name.strip_prefix('U')) {
            if let Ok(code) = u32::from_str_radix(hex, 16) {
                return match code {
                    0x20..=0x7e | 0xa0..=0xff => Some(Keysym(code)),
                    0x100..=0x10_ffff => Some(Keysym(0x0100_0000 + code)),
                    _ => None,
                };
            }
        }

        if let Some(hex) = name.strip_prefix("0x") {
            if let Ok(value) = u32::from_str_radix(hex, 16) {
                return (value != 0).then_some(Keysym(value));
            }
        }

        None
    }

    /// Returns the table name of this keysym, if it has one.
    pub fn name(self) -> Option<&'static str> {
        KEYSYM_NAMES
            .iter()
            .find(|(_, value)| *value == self.0)
            .map(|(name, _)| *name)
    }

    /// ASCII letters, upper or lower case.
    pub fn is_alpha(self) -> bool {
        matches!(self.0, 0x41..=0x5a | 0x61..=0x7a)
    }

    pub fn is_shift(self) -> bool {
        self == Self::SHIFT_L || self == Self::SHIFT_R
    }

    /// Keypad keysyms, whose shifted level depends on Num Lock.
    pub fn is_keypad(self) -> bool {
        matches!(self.0, 0xff80..=0xffbd)
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => match char::from_u32(self.0) {
                Some(ch) if (0x21..=0x7e).contains(&self.0) => write!(f, "{ch}"),
                _ => write!(f, "0x{:x}", self.0),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
