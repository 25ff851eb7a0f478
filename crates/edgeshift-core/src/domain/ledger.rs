//! Ledger of input this process holds down on the destination displays.
//!
//! Every forwarded press is recorded here and every forwarded release clears
//! it again.  When the pointer leaves the destination, whatever is still in
//! the ledger gets a synthetic release so nothing stays stuck.

use crate::keymap::Keysym;

/// One held input: a key (by keysym) or a destination button number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeldInput {
    Key(Keysym),
    Button(u32),
}

/// Set of [`HeldInput`]s, each present at most once.
///
/// Entries keep insertion order so releases replay in a stable order, which
/// makes logs and tests deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StuckInputLedger {
    held: Vec<HeldInput>,
}

impl StuckInputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `input`.  Returns `false` if it was already present.
    pub fn record(&mut self, input: HeldInput) -> bool {
        if self.held.contains(&input) {
            return false;
        }
        self.held.push(input);
        true
    }

    /// Removes `input`.  Returns `false` if it was not present.
    pub fn clear(&mut self, input: HeldInput) -> bool {
        match self.held.iter().position(|held| *held == input) {
            Some(index) => {
                self.held.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, input: HeldInput) -> bool {
        self.held.contains(&input)
    }

    /// Returns `true` if any button is held.
    pub fn holds_button(&self) -> bool {
        self.held
            .iter()
            .any(|held| matches!(held, HeldInput::Button(_)))
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeldInput> {
        self.held.iter()
    }

    /// Removes and returns every entry, leaving the ledger empty.
    pub fn take_all(&mut self) -> Vec<HeldInput> {
        std::mem::take(&mut self.held)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
