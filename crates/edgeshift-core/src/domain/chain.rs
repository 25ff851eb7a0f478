//! The linear chain of destination screens attached to one source edge.
//!
//! [`ScreenChain`] owns a transition-axis [`CoordinateTable`] and an
//! orthogonal-axis table for every destination screen, plus the fixed source
//! coordinates ("anchors") the pointer is warped to when it connects,
//! disconnects or walks from one destination screen to the next.
//!
//! ```text
//!   edge = East, two destination screens
//!
//!   source                    screen 0           screen 1
//!   +-----------+|trig|  -->  |D ......... I I| -> |D ........... |
//!                              ^ cell 0 = DECR     ^ last screen: no INCR
//! ```

use tracing::debug;

use super::coord_table::{Cell, CoordinateTable, TableError};
use super::geometry::{Axis, Edge, ScreenGeometry};

/// Default width of the trigger strip, in pixels.
pub const DEFAULT_TRIGGER_WIDTH: u32 = 2;

/// Default number of high-end cells marked [`Cell::Incr`].
///
/// Two cells are marked because on some hardware the pointer never reaches
/// the true last pixel.
pub const DEFAULT_BOUNDARY_PADDING: u32 = 2;

/// Shape parameters for building a [`ScreenChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLayout {
    /// Edge the chain hangs off; `None` selects window mode.
    pub edge: Option<Edge>,
    pub trigger_width: u32,
    pub boundary_padding: u32,
    /// Added to every mapped orthogonal coordinate, then clamped.
    pub across_offset: i32,
}

impl Default for ChainLayout {
    fn default() -> Self {
        Self {
            edge: None,
            trigger_width: DEFAULT_TRIGGER_WIDTH,
            boundary_padding: DEFAULT_BOUNDARY_PADDING,
            across_offset: 0,
        }
    }
}

/// Source coordinates (along the transition axis) used for warping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchors {
    /// First pixel of the trigger strip.
    pub trigger_origin: i32,
    /// Where the source pointer is parked right after connecting.
    pub connect: i32,
    /// Where the source pointer is placed after disconnecting.
    pub disconnect: i32,
    /// Landing coordinate after advancing to the next destination screen.
    pub incoming_incr: i32,
    /// Landing coordinate after retreating to the previous destination screen.
    pub incoming_decr: i32,
}

/// Destination screens in chain order with their lookup tables.
#[derive(Debug, Clone)]
pub struct ScreenChain {
    axis: Axis,
    source: ScreenGeometry,
    screens: Vec<ScreenGeometry>,
    along: Vec<CoordinateTable>,
    across: Vec<CoordinateTable>,
    anchors: Anchors,
    entry_screen: usize,
    across_offset: i32,
}

impl ScreenChain {
    /// Builds the chain for `screens` as seen from `source`.
    ///
    /// # Errors
    ///
    /// - [`TableError::NoScreens`] when `screens` is empty.
    /// - [`TableError::ZeroPadding`] when `layout.boundary_padding` is zero.
    /// - [`TableError::PaddingCoversAnchors`] when the padding is wider than
    ///   the trigger strip, which would turn the warp anchors into sentinels.
    /// - [`TableError::ZeroDestinationExtent`] when a destination screen has
    ///   a zero width or height.
    /// - [`TableError::SourceTooSmall`] when the source cannot hold the
    ///   trigger strip, the anchors and the padded boundary.
    pub fn build(
        source: ScreenGeometry,
        screens: &[ScreenGeometry],
        layout: &ChainLayout,
    ) -> Result<Self, TableError> {
        if screens.is_empty() {
            return Err(TableError::NoScreens);
        }
        if layout.boundary_padding == 0 {
            return Err(TableError::ZeroPadding);
        }
        // The high anchor sits at `extent - trigger_width - 1`; INCR cells
        // start at `extent - boundary_padding`.
        if layout.boundary_padding > layout.trigger_width {
            return Err(TableError::PaddingCoversAnchors {
                padding: layout.boundary_padding,
                trigger_width: layout.trigger_width,
            });
        }

        let axis = layout.edge.map_or(Axis::Horizontal, Edge::axis);
        let extent = source.extent(axis);
        let required = (layout.boundary_padding + 1).max(2 * layout.trigger_width + 2);
        if extent <= required {
            return Err(TableError::SourceTooSmall { extent, required });
        }
        let across_extent = source.extent(axis.orthogonal());
        if across_extent == 0 {
            return Err(TableError::SourceTooSmall {
                extent: 0,
                required: 1,
            });
        }

        let count = screens.len();
        let high_side = layout.edge.is_some_and(Edge::is_high_side);
        let low_side = layout.edge.is_some_and(|edge| !edge.is_high_side());

        let mut along = Vec::with_capacity(count);
        let mut across = Vec::with_capacity(count);
        for (index, screen) in screens.iter().enumerate() {
            let zero = |_| TableError::ZeroDestinationExtent { screen: index };
            let mut table =
                CoordinateTable::scaled(extent, screen.extent(axis)).map_err(zero)?;
            if index != 0 || high_side {
                table.mark_low();
            }
            if index + 1 < count || low_side {
                table.mark_high(layout.boundary_padding);
            }
            along.push(table);
            across.push(
                CoordinateTable::scaled(across_extent, screen.extent(axis.orthogonal()))
                    .map_err(zero)?,
            );
        }

        let extent = extent as i32;
        let width = layout.trigger_width as i32;
        let anchors = if low_side {
            Anchors {
                trigger_origin: 0,
                connect: extent - width - 1,
                disconnect: width,
                incoming_incr: width,
                incoming_decr: extent - width - 1,
            }
        } else {
            Anchors {
                trigger_origin: extent - width,
                connect: 1,
                disconnect: extent - width - 1,
                incoming_incr: width,
                incoming_decr: extent - width - 1,
            }
        };

        debug!(
            ?axis,
            extent,
            screens = count,
            trigger_origin = anchors.trigger_origin,
            "screen chain built"
        );
        Ok(Self {
            axis,
            source,
            screens: screens.to_vec(),
            along,
            across,
            anchors,
            entry_screen: if low_side { count - 1 } else { 0 },
            across_offset: layout.across_offset,
        })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn source(&self) -> ScreenGeometry {
        self.source
    }

    /// Source extent along the transition axis.
    pub fn source_extent(&self) -> u32 {
        self.source.extent(self.axis)
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn screens(&self) -> &[ScreenGeometry] {
        &self.screens
    }

    pub fn anchors(&self) -> Anchors {
        self.anchors
    }

    /// Screen the pointer enters first when connecting.
    pub fn entry_screen(&self) -> usize {
        self.entry_screen
    }

    /// Largest plausible distance between two consecutive samples.
    pub fn unreasonable_delta(&self) -> i32 {
        (self.source_extent() / 2) as i32
    }

    /// Looks up the transition-axis cell for `along` on `screen`.
    pub fn lookup(&self, screen: usize, along: i32) -> Cell {
        self.along[self.clamp_screen(screen)].get(along)
    }

    /// Maps `along` to a destination coordinate on `screen`, treating
    /// sentinel cells as ordinary scaled cells.
    pub fn resolve(&self, screen: usize, along: i32) -> i32 {
        match self.lookup(screen, along) {
            Cell::Coord(value) => value,
            Cell::Incr | Cell::Decr => self.along[self.clamp_screen(screen)].scaled_value(along),
        }
    }

    /// Maps an orthogonal source coordinate onto `screen`, applying the
    /// configured offset.
    pub fn map_across(&self, screen: usize, across: i32) -> i32 {
        let table = &self.across[self.clamp_screen(screen)];
        let last = table.dest_extent() as i32 - 1;
        (table.scaled_value(across) + self.across_offset).clamp(0, last)
    }

    fn clamp_screen(&self, screen: usize) -> usize {
        screen.min(self.screens.len() - 1)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ScreenGeometry {
        ScreenGeometry::new(1000, 600)
    }

    fn two_screens() -> Vec<ScreenGeometry> {
        vec![ScreenGeometry::new(800, 600), ScreenGeometry::new(1200, 900)]
    }

    fn layout(edge: Option<Edge>) -> ChainLayout {
        ChainLayout {
            edge,
            ..ChainLayout::default()
        }
    }

    // ── Sentinel placement ────────────────────────────────────────────────────

    #[test]
    fn test_east_chain_marks_decr_on_every_screen_and_incr_between_screens() {
        // Arrange / Act
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::East))).expect("build");

        // Assert
        assert_eq!(chain.lookup(0, 0), Cell::Decr);
        assert_eq!(chain.lookup(1, 0), Cell::Decr);
        assert_eq!(chain.lookup(0, 999), Cell::Incr);
        assert_eq!(chain.lookup(0, 998), Cell::Incr);
        assert_eq!(chain.lookup(0, 997), Cell::Coord(997 * 800 / 1000));
        assert_eq!(chain.lookup(1, 999), Cell::Coord(999 * 1200 / 1000));
    }

    #[test]
    fn test_west_chain_marks_incr_on_every_screen_and_decr_between_screens() {
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::West))).expect("build");

        assert_eq!(chain.lookup(0, 0), Cell::Coord(0));
        assert_eq!(chain.lookup(1, 0), Cell::Decr);
        assert_eq!(chain.lookup(0, 999), Cell::Incr);
        assert_eq!(chain.lookup(1, 999), Cell::Incr);
        assert_eq!(chain.lookup(1, 998), Cell::Incr);
    }

    #[test]
    fn test_window_mode_marks_only_inter_screen_boundaries() {
        let chain = ScreenChain::build(source(), &two_screens(), &layout(None)).expect("build");

        assert_eq!(chain.lookup(0, 0), Cell::Coord(0));
        assert_eq!(chain.lookup(0, 999), Cell::Incr);
        assert_eq!(chain.lookup(1, 0), Cell::Decr);
        assert_eq!(chain.lookup(1, 999), Cell::Coord(1198));
    }

    #[test]
    fn test_single_padding_marks_only_last_cell() {
        let layout = ChainLayout {
            edge: Some(Edge::West),
            boundary_padding: 1,
            ..ChainLayout::default()
        };
        let chain = ScreenChain::build(source(), &two_screens(), &layout).expect("build");

        assert_eq!(chain.lookup(0, 999), Cell::Incr);
        assert_eq!(chain.lookup(0, 998), Cell::Coord(998 * 800 / 1000));
    }

    #[test]
    fn test_north_chain_uses_vertical_axis() {
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::North))).expect("build");

        assert_eq!(chain.axis(), Axis::Vertical);
        assert_eq!(chain.source_extent(), 600);
        assert_eq!(chain.lookup(0, 599), Cell::Incr);
        assert_eq!(chain.lookup(1, 300), Cell::Coord(300 * 900 / 600));
        assert_eq!(chain.map_across(1, 500), 500 * 1200 / 1000);
    }

    // ── Anchors ───────────────────────────────────────────────────────────────

    #[test]
    fn test_high_side_anchors() {
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::East))).expect("build");

        let anchors = chain.anchors();
        assert_eq!(anchors.trigger_origin, 998);
        assert_eq!(anchors.connect, 1);
        assert_eq!(anchors.disconnect, 997);
        assert_eq!(anchors.incoming_incr, 2);
        assert_eq!(anchors.incoming_decr, 997);
        assert_eq!(chain.entry_screen(), 0);
    }

    #[test]
    fn test_low_side_anchors_enter_from_last_screen() {
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::West))).expect("build");

        let anchors = chain.anchors();
        assert_eq!(anchors.trigger_origin, 0);
        assert_eq!(anchors.connect, 997);
        assert_eq!(anchors.disconnect, 2);
        assert_eq!(chain.entry_screen(), 1);
    }

    #[test]
    fn test_incoming_coordinate_on_next_screen_matches_scaled_trigger_width() {
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::East))).expect("build");

        let incoming = chain.anchors().incoming_incr;
        assert_eq!(chain.lookup(1, incoming), Cell::Coord(2 * 1200 / 1000));
    }

    #[test]
    fn test_unreasonable_delta_is_half_source_extent() {
        let chain = ScreenChain::build(source(), &two_screens(), &layout(None)).expect("build");
        assert_eq!(chain.unreasonable_delta(), 500);
    }

    // ── Orthogonal mapping ────────────────────────────────────────────────────

    #[test]
    fn test_across_offset_is_applied_and_clamped() {
        let layout = ChainLayout {
            edge: Some(Edge::East),
            across_offset: 50,
            ..ChainLayout::default()
        };
        let chain = ScreenChain::build(source(), &two_screens(), &layout).expect("build");

        assert_eq!(chain.map_across(0, 100), 150);
        assert_eq!(chain.map_across(0, 599), 599);
        assert_eq!(chain.map_across(1, 0), 50);
    }

    #[test]
    fn test_resolve_returns_scaled_value_for_sentinel_cells() {
        let chain =
            ScreenChain::build(source(), &two_screens(), &layout(Some(Edge::East))).expect("build");
        assert_eq!(chain.resolve(0, 999), 999 * 800 / 1000);
        assert_eq!(chain.resolve(0, 500), 400);
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_chain_is_rejected() {
        assert_eq!(
            ScreenChain::build(source(), &[], &layout(None)).err(),
            Some(TableError::NoScreens)
        );
    }

    #[test]
    fn test_zero_extent_destination_is_rejected_with_its_index() {
        let screens = [ScreenGeometry::new(800, 600), ScreenGeometry::new(0, 600)];
        assert_eq!(
            ScreenChain::build(source(), &screens, &layout(Some(Edge::East))).err(),
            Some(TableError::ZeroDestinationExtent { screen: 1 })
        );
    }

    #[test]
    fn test_tiny_source_is_rejected() {
        let tiny = ScreenGeometry::new(6, 600);
        assert_eq!(
            ScreenChain::build(tiny, &two_screens(), &layout(Some(Edge::East))).err(),
            Some(TableError::SourceTooSmall {
                extent: 6,
                required: 6
            })
        );
    }

    #[test]
    fn test_zero_padding_is_rejected() {
        let layout = ChainLayout {
            boundary_padding: 0,
            ..ChainLayout::default()
        };
        assert_eq!(
            ScreenChain::build(source(), &two_screens(), &layout).err(),
            Some(TableError::ZeroPadding)
        );
    }

    #[test]
    fn test_padding_wider_than_trigger_is_rejected() {
        let layout = ChainLayout {
            edge: Some(Edge::West),
            boundary_padding: 5,
            ..ChainLayout::default()
        };
        assert_eq!(
            ScreenChain::build(source(), &two_screens(), &layout).err(),
            Some(TableError::PaddingCoversAnchors {
                padding: 5,
                trigger_width: 2
            })
        );
    }
}
