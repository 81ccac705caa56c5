// Core types shared across the engine.
//
// Defines grid geometry (`GridCell`, `GridRect`), the draw/collision band
// (`Layer`), and the string identifiers used throughout (`PlacementId`,
// `LocationKey`). All types derive `Serialize`/`Deserialize` because they
// appear in the persisted layout snapshot; identifiers serialize as bare
// strings/integers so the snapshot stays `{ "id": "plc_3", "layer": 3 }`.
//
// `PlacementIdGenerator` hands out placement ids. Ids are `"{prefix}_{n}"` with
// a monotonically increasing `n`, and the generator skips any id the live
// store already holds, so ids stay unique even after loading a layout written
// by an older build that used a different numbering scheme.
//
// See also: `location.rs` for the containers that use these types,
// `validate.rs` for the rectangle tests, `snapshot.rs` for the wire shape.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// A cell on a location's tile grid. `x` grows east, `y` grows south; the
/// origin is the top-left tile.
///
/// Coordinates are signed because drag candidates can legitimately fall off
/// the grid (they are then rejected as `OutOfBounds`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two cells, saturating at `u32::MAX`.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        u32::try_from(dx + dy).unwrap_or(u32::MAX)
    }

    /// This cell shifted by `(dx, dy)`. Saturates at the `i32` range, which is
    /// far outside any grid.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned, half-open rectangle of cells:
/// `[x, x + width) × [y, y + height)`.
///
/// Used both for placement footprints and for a location's static blocked
/// areas. Serialized as `{ "x", "y", "width", "height" }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl GridRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored (top-left) at `anchor`.
    pub const fn at(anchor: GridCell, width: u32, height: u32) -> Self {
        Self::new(anchor.x, anchor.y, width, height)
    }

    pub fn anchor(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }

    /// Exclusive right edge. Computed in i64 so huge widths cannot overflow.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `cell` lies inside the rectangle.
    pub fn contains(&self, cell: GridCell) -> bool {
        let (cx, cy) = (cell.x as i64, cell.y as i64);
        cx >= self.x as i64 && cx < self.right() && cy >= self.y as i64 && cy < self.bottom()
    }

    /// Symmetric rectangle intersection. Two rectangles that only touch along
    /// an edge do not intersect; empty rectangles intersect nothing.
    pub fn intersects(&self, other: &GridRect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }

    /// Whether the rectangle lies entirely inside a `width × height` grid
    /// anchored at the origin.
    pub fn within_grid(&self, grid_width: u32, grid_height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= grid_width as i64
            && self.bottom() <= grid_height as i64
    }

    /// Every cell of the rectangle, row by row.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        let (x0, y0) = (self.x, self.y);
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridCell::new(x0 + dx, y0 + dy)))
    }
}

impl fmt::Display for GridRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// A discrete band used for both draw order and collision. Placements on
/// different layers never collide with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer(pub u8);

impl Layer {
    pub const TERRAIN: Layer = Layer(0);
    pub const WALLS: Layer = Layer(1);
    pub const PATHS: Layer = Layer(2);
    pub const OBJECTS: Layer = Layer(3);
    pub const OVERLAY: Layer = Layer(4);
}

impl Default for Layer {
    fn default() -> Self {
        Self::OBJECTS
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Layer::TERRAIN => write!(f, "terrain"),
            Layer::WALLS => write!(f, "walls"),
            Layer::PATHS => write!(f, "paths"),
            Layer::OBJECTS => write!(f, "objects"),
            Layer::OVERLAY => write!(f, "overlay"),
            Layer(n) => write!(f, "layer {n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// String identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(/// Unique identifier of a placement across the whole layout.
PlacementId);
string_id!(/// Identity of a location. Templates use their data key (`"farm"`,
/// `"barn"`); interior instances use a derived key (see `nav::instance_key`).
LocationKey);

// ---------------------------------------------------------------------------
// Placement id generation
// ---------------------------------------------------------------------------

/// Monotonic generator for placement ids of the form `"{prefix}_{n}"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementIdGenerator {
    prefix: String,
    next: u64,
}

impl PlacementIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Produce the next id for which `taken` returns false.
    pub fn next_id(&mut self, taken: impl Fn(&PlacementId) -> bool) -> PlacementId {
        loop {
            let candidate = PlacementId(format!("{}_{}", self.prefix, self.next));
            self.next += 1;
            if !taken(&candidate) {
                return candidate;
            }
        }
    }

    /// Advance past an existing id so future ids never reuse its number.
    /// Ids with another prefix or a non-numeric suffix are ignored.
    pub fn observe(&mut self, id: &PlacementId) {
        let Some(rest) = id.as_str().strip_prefix(&self.prefix) else {
            return;
        };
        let Some(digits) = rest.strip_prefix('_') else {
            return;
        };
        if let Ok(n) = digits.parse::<u64>() {
            self.next = self.next.max(n.saturating_add(1));
        }
    }

    /// The number the next generated id will try first.
    pub fn peek_next(&self) -> u64 {
        self.next
    }
}
