//! Screen geometry and the directional edge that joins the source screen to
//! the destination chain.
//!
//! The engine works on one axis at a time.  A sample `(x, y)` is split into an
//! *along* component (the transition axis, where edges are crossed) and an
//! *across* component (the orthogonal axis, which is only scaled).  East and
//! West edges cross along the horizontal axis; North and South along the
//! vertical one.

use serde::{Deserialize, Serialize};

/// The axis on which screen transitions happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Splits an absolute point into `(along, across)` components.
    pub fn split(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Axis::Horizontal => (x, y),
            Axis::Vertical => (y, x),
        }
    }

    /// Joins `(along, across)` components back into an absolute `(x, y)` point.
    pub fn join(self, along: i32, across: i32) -> (i32, i32) {
        match self {
            Axis::Horizontal => (along, across),
            Axis::Vertical => (across, along),
        }
    }

    /// Returns the orthogonal axis.
    pub fn orthogonal(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Which side of the source screen the destination chain is attached to.
///
/// `East` means the destination lies to the east of the source: the trigger
/// strip sits on the source's right edge and the pointer enters the first
/// destination screen from its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    North,
    South,
    East,
    West,
}

impl Edge {
    /// Returns the axis crossed by this edge.
    pub fn axis(self) -> Axis {
        match self {
            Edge::East | Edge::West => Axis::Horizontal,
            Edge::North | Edge::South => Axis::Vertical,
        }
    }

    /// Returns `true` when the trigger sits on the source's high-coordinate
    /// side (right or bottom).
    pub fn is_high_side(self) -> bool {
        matches!(self, Edge::East | Edge::South)
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Edge::North => "north",
            Edge::South => "south",
            Edge::East => "east",
            Edge::West => "west",
        };
        f.write_str(name)
    }
}

/// Pixel dimensions of one screen.  Read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
}

impl ScreenGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the extent of the screen along `axis`.
    pub fn extent(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
