//! Pointer buttons: held-button masks and the inverse pointer mapping.

/// Highest button number that is forwarded to destinations.
pub const MAX_BUTTONS: usize = 9;

/// Number of buttons the core X protocol reports in event state masks.
const MASKED_BUTTONS: u32 = 5;

/// Set of held buttons 1..=5, as reported in an event's modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonMask(u8);

impl ButtonMask {
    pub const NONE: ButtonMask = ButtonMask(0);

    /// Builds a mask from bit flags (bit 0 = button 1).
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x1f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns a copy with `button` added.  Buttons above 5 are not masked.
    pub fn with(self, button: u32) -> Self {
        match Self::bit(button) {
            Some(bit) => Self(self.0 | bit),
            None => self,
        }
    }

    /// Returns a copy with `button` removed.
    pub fn without(self, button: u32) -> Self {
        match Self::bit(button) {
            Some(bit) => Self(self.0 & !bit),
            None => self,
        }
    }

    pub fn contains(self, button: u32) -> bool {
        Self::bit(button).is_some_and(|bit| self.0 & bit != 0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn bit(button: u32) -> Option<u8> {
        (1..=MASKED_BUTTONS)
            .contains(&button)
            .then(|| 1u8 << (button - 1))
    }
}

/// Maps logical button numbers to the destination's physical buttons.
///
/// Destinations with a remapped pointer (left-handed mice and the like)
/// would otherwise swap forwarded clicks a second time.  The map is the
/// inverse of the destination's physical-to-logical pointer mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonInverseMap {
    inverse: [u32; MAX_BUTTONS + 1],
}

impl Default for ButtonInverseMap {
    fn default() -> Self {
        Self::identity()
    }
}

impl ButtonInverseMap {
    /// Maps every button to itself.
    pub fn identity() -> Self {
        let mut inverse = [0; MAX_BUTTONS + 1];
        for (button, slot) in inverse.iter_mut().enumerate() {
            *slot = button as u32;
        }
        Self { inverse }
    }

    /// Rebuilds the map from a destination pointer mapping.
    ///
    /// `physical[i]` is the logical button produced by physical button
    /// `i + 1`.  Only the first [`MAX_BUTTONS`] entries are read; entries
    /// naming a logical button outside `1..=MAX_BUTTONS` are ignored.  With
    /// `remap` disabled the map stays the identity.
    pub fn rebuild(&mut self, physical: &[u8], remap: bool) {
        *self = Self::identity();
        if !remap {
            return;
        }
        for (slot, &logical) in physical.iter().take(MAX_BUTTONS).enumerate() {
            let logical = usize::from(logical);
            if (1..=MAX_BUTTONS).contains(&logical) {
                self.inverse[logical] = slot as u32 + 1;
            }
        }
    }

    /// Returns the physical button for `logical`, or `None` if `logical` is
    /// outside `1..=MAX_BUTTONS`.
    pub fn physical(&self, logical: u32) -> Option<u32> {
        if logical == 0 {
            return None;
        }
        self.inverse.get(logical as usize).copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── ButtonMask ────────────────────────────────────────────────────────────

    #[test]
    fn test_mask_with_and_without() {
        let mask = ButtonMask::NONE.with(1).with(3);
        assert!(mask.contains(1));
        assert!(mask.contains(3));
        assert!(!mask.contains(2));
        assert!(mask.without(1).without(3).is_empty());
    }

    #[test]
    fn test_mask_ignores_buttons_above_five() {
        let mask = ButtonMask::NONE.with(6);
        assert!(mask.is_empty());
        assert!(!mask.contains(6));
        assert!(!mask.contains(0));
    }

    #[test]
    fn test_mask_from_bits_discards_high_bits() {
        assert_eq!(ButtonMask::from_bits(0xff).bits(), 0x1f);
    }

    // ── ButtonInverseMap ──────────────────────────────────────────────────────

    #[test]
    fn test_identity_map() {
        let map = ButtonInverseMap::identity();
        for button in 1..=MAX_BUTTONS as u32 {
            assert_eq!(map.physical(button), Some(button));
        }
        assert_eq!(map.physical(0), None);
        assert_eq!(map.physical(MAX_BUTTONS as u32 + 1), None);
    }

    #[test]
    fn test_left_handed_mapping_is_inverted() {
        // Arrange
        let mut map = ButtonInverseMap::identity();

        // Act
        map.rebuild(&[3, 2, 1, 4, 5], true);

        // Assert
        assert_eq!(map.physical(1), Some(3));
        assert_eq!(map.physical(3), Some(1));
        assert_eq!(map.physical(2), Some(2));
    }

    #[test]
    fn test_rebuild_with_remap_disabled_stays_identity() {
        let mut map = ButtonInverseMap::identity();
        map.rebuild(&[3, 2, 1], false);
        assert_eq!(map, ButtonInverseMap::identity());
    }

    #[test]
    fn test_out_of_range_entries_keep_identity_default() {
        let mut map = ButtonInverseMap::identity();
        map.rebuild(&[0, 42, 1], true);
        assert_eq!(map.physical(1), Some(3));
        assert_eq!(map.physical(2), Some(2));
    }

    #[test]
    fn test_rebuild_reads_at_most_max_buttons_entries() {
        let mut map = ButtonInverseMap::identity();
        let mut physical: Vec<u8> = (1..=MAX_BUTTONS as u8).collect();
        physical.push(1);
        map.rebuild(&physical, true);
        assert_eq!(map.physical(1), Some(1));
    }

    #[test]
    fn test_rebuild_resets_previous_mapping() {
        let mut map = ButtonInverseMap::identity();
        map.rebuild(&[3, 2, 1], true);
        map.rebuild(&[1, 2, 3], true);
        assert_eq!(map.physical(1), Some(1));
        assert_eq!(map.physical(3), Some(3));
    }
}
