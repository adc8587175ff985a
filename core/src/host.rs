//! Boundary between the terrain engine and the game that hosts it.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use glam::Vec2;

use crate::{hex::HexLayout, GridCoord, GridDimensions};

/// Capability attached to every result returned by a host spatial query.
///
/// Hosts resolve what a collider represents once, when it registers with
/// their spatial index, so the engine never has to inspect colliders itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlapTag {
    /// Another dust cell's collider.
    Dust,
    /// A vehicle body that must not be entombed by regrowing terrain.
    Vehicle,
    /// A collectable whose pickup pocket must stay open.
    Collectable,
    /// Anything else sharing the query layer.
    Other,
}

/// Axis-aligned rectangle expressed in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRect {
    min: Vec2,
    max: Vec2,
}

impl WorldRect {
    /// Rectangle centred on `center` extending `half_extent` along each axis.
    #[must_use]
    pub fn from_center(center: Vec2, half_extent: Vec2) -> Self {
        let half_extent = half_extent.abs();
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Lower corner of the rectangle.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper corner of the rectangle.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Reports whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Services the terrain engine consumes from the game that owns the grid.
///
/// Every query must tolerate coordinates outside the grid; the engine only
/// stores in-bounds cells but probes neighbours freely.
pub trait TerrainHost {
    /// Current grid dimensions; zero while the host has not sized the grid yet.
    fn dimensions(&self) -> GridDimensions;

    /// Whether the host allows terrain to occupy the cell at all.
    fn is_cell_free(&self, cell: GridCoord) -> bool;

    /// World-space centre of a grid cell.
    fn cell_to_world(&self, cell: GridCoord) -> Vec2;

    /// Grid cell containing a world-space position.
    fn world_to_cell(&self, position: Vec2) -> GridCoord;

    /// Half extents of the bounding box used to probe a single cell.
    fn cell_extent(&self) -> Vec2;

    /// Rhythmic step counter; advances independently of wall-clock time.
    fn current_step(&self) -> u64;

    /// Duration of one musical loop, the unit for default regrow delays.
    fn loop_duration(&self) -> Duration;

    /// Whether another system has claimed the cell and blocks terrain there.
    fn is_claimed(&self, cell: GridCoord) -> bool;

    /// Whether the cell is currently visible; used to keep mazes on screen.
    fn is_on_screen(&self, _cell: GridCoord) -> bool {
        true
    }

    /// Appends the tag of every collider overlapping `bounds` to `out`.
    fn overlaps(&self, bounds: WorldRect, out: &mut Vec<OverlapTag>);
}

/// Self-contained host backed by plain collections.
///
/// Used by the command-line driver and by tests; real games implement
/// [`TerrainHost`] on top of their own physics and sequencing layers.
#[derive(Clone, Debug)]
pub struct HeadlessHost {
    dimensions: GridDimensions,
    layout: HexLayout,
    step: u64,
    loop_duration: Duration,
    blocked: BTreeSet<GridCoord>,
    claims: BTreeSet<GridCoord>,
    bodies: BTreeMap<u32, (Vec2, OverlapTag)>,
    screen: Option<(GridCoord, GridCoord)>,
}

impl HeadlessHost {
    /// Creates a host for a grid of the provided size using unit hexes.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            dimensions: GridDimensions::new(columns, rows),
            layout: HexLayout::new(1.0, Vec2::ZERO),
            step: 0,
            loop_duration: Duration::from_secs(4),
            blocked: BTreeSet::new(),
            claims: BTreeSet::new(),
            bodies: BTreeMap::new(),
            screen: None,
        }
    }

    /// Replaces the grid dimensions, e.g. to simulate a host resize.
    pub fn resize(&mut self, columns: u32, rows: u32) {
        self.dimensions = GridDimensions::new(columns, rows);
    }

    /// Replaces the duration of one musical loop.
    pub fn set_loop_duration(&mut self, loop_duration: Duration) {
        self.loop_duration = loop_duration;
    }

    /// Advances the rhythmic step counter by one and returns the new value.
    pub fn advance_step(&mut self) -> u64 {
        self.step = self.step.wrapping_add(1);
        self.step
    }

    /// Marks the cell as unusable for terrain, or usable again.
    pub fn set_blocked(&mut self, cell: GridCoord, blocked: bool) {
        let _ = if blocked {
            self.blocked.insert(cell)
        } else {
            self.blocked.remove(&cell)
        };
    }

    /// Records or clears an external claim on the cell.
    pub fn set_claimed(&mut self, cell: GridCoord, claimed: bool) {
        let _ = if claimed {
            self.claims.insert(cell)
        } else {
            self.claims.remove(&cell)
        };
    }

    /// Places (or moves) a tagged body so it covers the centre of `cell`.
    pub fn place_body(&mut self, id: u32, cell: GridCoord, tag: OverlapTag) {
        let position = self.layout.to_world(cell);
        let _ = self.bodies.insert(id, (position, tag));
    }

    /// Removes a previously placed body.
    pub fn remove_body(&mut self, id: u32) {
        let _ = self.bodies.remove(&id);
    }

    /// Restricts the visible region to the inclusive rectangle of cells.
    pub fn set_screen(&mut self, min: GridCoord, max: GridCoord) {
        self.screen = Some((min, max));
    }

    /// Layout used to convert between cells and world positions.
    #[must_use]
    pub const fn layout(&self) -> &HexLayout {
        &self.layout
    }
}

impl TerrainHost for HeadlessHost {
    fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    fn is_cell_free(&self, cell: GridCoord) -> bool {
        self.dimensions.contains(cell) && !self.blocked.contains(&cell)
    }

    fn cell_to_world(&self, cell: GridCoord) -> Vec2 {
        self.layout.to_world(cell)
    }

    fn world_to_cell(&self, position: Vec2) -> GridCoord {
        self.layout.to_cell(position)
    }

    fn cell_extent(&self) -> Vec2 {
        self.layout.half_extent() * 0.9
    }

    fn current_step(&self) -> u64 {
        self.step
    }

    fn loop_duration(&self) -> Duration {
        self.loop_duration
    }

    fn is_claimed(&self, cell: GridCoord) -> bool {
        self.claims.contains(&cell)
    }

    fn is_on_screen(&self, cell: GridCoord) -> bool {
        self.screen.map_or(true, |(min, max)| {
            cell.column() >= min.column()
                && cell.column() <= max.column()
                && cell.row() >= min.row()
                && cell.row() <= max.row()
        })
    }

    fn overlaps(&self, bounds: WorldRect, out: &mut Vec<OverlapTag>) {
        for (position, tag) in self.bodies.values() {
            if bounds.contains(*position) {
                out.push(*tag);
            }
        }
    }
}
