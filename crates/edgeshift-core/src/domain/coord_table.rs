//! Per-screen lookup tables mapping source coordinates to destination
//! coordinates.
//!
//! A table has one cell per source pixel along the transition axis.  Interior
//! cells hold `floor(i * dest_extent / source_extent)`.  Boundary cells that
//! lead somewhere else (a neighbouring destination screen, or back to the
//! source) hold a sentinel instead of a coordinate.

use thiserror::Error;

/// One cell of a [`CoordinateTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// A destination coordinate.
    Coord(i32),
    /// Crossing further in the direction the chain continues.
    Incr,
    /// Crossing back toward the start of the chain (or the source).
    Decr,
}

impl Cell {
    /// Returns `true` for [`Cell::Incr`] and [`Cell::Decr`].
    pub fn is_sentinel(self) -> bool {
        !matches!(self, Cell::Coord(_))
    }
}

/// Errors raised while building tables or a screen chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("no destination screens to map onto")]
    NoScreens,

    #[error("destination screen {screen} has a zero extent")]
    ZeroDestinationExtent { screen: usize },

    #[error("source extent {extent} is too small (needs more than {required} pixels)")]
    SourceTooSmall { extent: u32, required: u32 },

    #[error("boundary padding must be at least one cell")]
    ZeroPadding,

    #[error("boundary padding {padding} reaches the warp anchors (at most the trigger width {trigger_width})")]
    PaddingCoversAnchors { padding: u32, trigger_width: u32 },
}

/// Lookup table for a single destination screen along one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateTable {
    cells: Vec<Cell>,
    dest_extent: u32,
}

impl CoordinateTable {
    /// Builds a plain linear-scaling table with no sentinels.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ZeroDestinationExtent`] (reported as screen 0)
    /// when `dest_extent` is zero and [`TableError::SourceTooSmall`] when
    /// `source_extent` is zero.
    pub fn scaled(source_extent: u32, dest_extent: u32) -> Result<Self, TableError> {
        if dest_extent == 0 {
            return Err(TableError::ZeroDestinationExtent { screen: 0 });
        }
        if source_extent == 0 {
            return Err(TableError::SourceTooSmall {
                extent: 0,
                required: 0,
            });
        }
        let cells = (0..source_extent)
            .map(|i| Cell::Coord(scale(i, source_extent, dest_extent)))
            .collect();
        Ok(Self { cells, dest_extent })
    }

    /// Number of cells (the source extent).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Destination extent this table scales onto.
    pub fn dest_extent(&self) -> u32 {
        self.dest_extent
    }

    /// Looks up the cell for a source coordinate.  Out-of-range coordinates
    /// are clamped to the first or last cell.
    pub fn get(&self, coord: i32) -> Cell {
        self.cells[self.clamp_index(coord)]
    }

    /// Returns the scaled destination coordinate for `coord`, ignoring any
    /// sentinel stored in that cell.
    pub fn scaled_value(&self, coord: i32) -> i32 {
        let index = self.clamp_index(coord) as u32;
        scale(index, self.cells.len() as u32, self.dest_extent)
    }

    /// Marks cell 0 as [`Cell::Decr`].
    pub(crate) fn mark_low(&mut self) {
        if let Some(first) = self.cells.first_mut() {
            *first = Cell::Decr;
        }
    }

    /// Marks the last `padding` cells as [`Cell::Incr`].
    pub(crate) fn mark_high(&mut self, padding: u32) {
        let len = self.cells.len();
        let start = len.saturating_sub(padding as usize);
        for cell in &mut self.cells[start..] {
            *cell = Cell::Incr;
        }
    }

    fn clamp_index(&self, coord: i32) -> usize {
        let last = self.cells.len().saturating_sub(1);
        (coord.max(0) as usize).min(last)
    }
}

fn scale(index: u32, source_extent: u32, dest_extent: u32) -> i32 {
    (u64::from(index) * u64::from(dest_extent) / u64::from(source_extent)) as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_table_interior_matches_floor_formula() {
        // Arrange
        let table = CoordinateTable::scaled(1000, 1200).expect("valid extents");

        // Act / Assert
        for i in 0..1000 {
            assert_eq!(table.get(i), Cell::Coord(i * 1200 / 1000), "cell {i}");
        }
    }

    #[test]
    fn test_scaled_table_downscale_truncates() {
        let table = CoordinateTable::scaled(1000, 800).expect("valid extents");
        assert_eq!(table.get(999), Cell::Coord(799));
        assert_eq!(table.get(1), Cell::Coord(0));
        assert_eq!(table.get(3), Cell::Coord(2));
    }

    #[test]
    fn test_zero_destination_extent_is_rejected() {
        assert_eq!(
            CoordinateTable::scaled(1000, 0),
            Err(TableError::ZeroDestinationExtent { screen: 0 })
        );
    }

    #[test]
    fn test_lookup_clamps_out_of_range_coordinates() {
        let table = CoordinateTable::scaled(10, 20).expect("valid extents");
        assert_eq!(table.get(-5), Cell::Coord(0));
        assert_eq!(table.get(50), Cell::Coord(18));
    }

    #[test]
    fn test_marks_place_sentinels_at_boundaries() {
        // Arrange
        let mut table = CoordinateTable::scaled(10, 20).expect("valid extents");

        // Act
        table.mark_low();
        table.mark_high(2);

        // Assert
        assert_eq!(table.get(0), Cell::Decr);
        assert_eq!(table.get(1), Cell::Coord(2));
        assert_eq!(table.get(7), Cell::Coord(14));
        assert_eq!(table.get(8), Cell::Incr);
        assert_eq!(table.get(9), Cell::Incr);
    }

    #[test]
    fn test_scaled_value_ignores_sentinels() {
        let mut table = CoordinateTable::scaled(10, 20).expect("valid extents");
        table.mark_high(1);
        assert_eq!(table.get(9), Cell::Incr);
        assert_eq!(table.scaled_value(9), 18);
    }

    #[test]
    fn test_cell_is_sentinel() {
        assert!(Cell::Incr.is_sentinel());
        assert!(Cell::Decr.is_sentinel());
        assert!(!Cell::Coord(0).is_sentinel());
    }
}
