#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure procedural pattern generators for Dustfield terrain layouts.
//!
//! Every generator receives a [`PatternContext`] describing the grid and the
//! predicates that decide whether a cell may hold terrain, plus its own
//! parameter struct and a seeded random number generator. Generators never
//! touch world state: they return [`Placement`] lists in row-major order,
//! already filtered by availability. Callers apply their own vetoes before
//! committing anything.

mod automaton;
mod dots;
mod maze;
mod plan;
mod rings;
mod strokes;

use std::fmt;

use dustfield_core::{GridCoord, GridDimensions};
use glam::Vec2;

pub use automaton::{cellular_automaton, AutomatonParams};
pub use dots::{periodic_dots, DotParams};
pub use maze::{carved_maze, MazeParams};
pub use plan::{derive_generation_seed, PatternPlan};
pub use rings::{ring_chokepoints, RingParams};
pub use strokes::{drunken_strokes, StrokeParams};

/// Cell chosen by a generator together with its world-space centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Grid cell that should hold terrain.
    pub cell: GridCoord,
    /// World position of the cell centre.
    pub position: Vec2,
}

/// Grid description and availability predicates shared by every generator.
#[derive(Clone, Copy)]
pub struct PatternContext<'a> {
    dimensions: GridDimensions,
    is_cell_free: &'a dyn Fn(GridCoord) -> bool,
    to_world: &'a dyn Fn(GridCoord) -> Vec2,
    exclude: Option<&'a dyn Fn(GridCoord) -> bool>,
    flow_bias: Option<&'a dyn Fn(GridCoord) -> Vec2>,
}

impl<'a> PatternContext<'a> {
    /// Creates a context from the grid size, a host availability predicate and
    /// the coordinate to world mapping.
    #[must_use]
    pub fn new(
        dimensions: GridDimensions,
        is_cell_free: &'a dyn Fn(GridCoord) -> bool,
        to_world: &'a dyn Fn(GridCoord) -> Vec2,
    ) -> Self {
        Self {
            dimensions,
            is_cell_free,
            to_world,
            exclude: None,
            flow_bias: None,
        }
    }

    /// Adds a predicate rejecting otherwise free candidates (screen bounds, hollows).
    #[must_use]
    pub fn with_exclusion(mut self, exclude: &'a dyn Fn(GridCoord) -> bool) -> Self {
        self.exclude = Some(exclude);
        self
    }

    /// Adds a direction field that generators may follow.
    #[must_use]
    pub fn with_flow_bias(mut self, flow_bias: &'a dyn Fn(GridCoord) -> Vec2) -> Self {
        self.flow_bias = Some(flow_bias);
        self
    }

    /// Grid dimensions the generators work within.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Whether the cell lies inside the grid, is free and is not excluded.
    #[must_use]
    pub fn is_available(&self, cell: GridCoord) -> bool {
        self.dimensions.contains(cell)
            && (self.is_cell_free)(cell)
            && !self.exclude.map_or(false, |exclude| exclude(cell))
    }

    /// Flow direction at the cell, if a flow field was supplied.
    #[must_use]
    pub fn flow_at(&self, cell: GridCoord) -> Option<Vec2> {
        self.flow_bias.map(|flow| flow(cell))
    }

    /// Builds the placement record for the cell.
    #[must_use]
    pub fn placement(&self, cell: GridCoord) -> Placement {
        Placement {
            cell,
            position: (self.to_world)(cell),
        }
    }

    fn placements(&self, mask: &CellMask) -> Vec<Placement> {
        mask.iter().map(|cell| self.placement(cell)).collect()
    }
}

impl fmt::Debug for PatternContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternContext")
            .field("dimensions", &self.dimensions)
            .field("has_exclusion", &self.exclude.is_some())
            .field("has_flow_bias", &self.flow_bias.is_some())
            .finish()
    }
}

/// Dense boolean layer over the grid; out-of-bounds reads are `false`.
#[derive(Clone, Debug)]
struct CellMask {
    dimensions: GridDimensions,
    bits: Vec<bool>,
}

impl CellMask {
    fn new(dimensions: GridDimensions) -> Self {
        Self {
            dimensions,
            bits: vec![false; dimensions.cell_count()],
        }
    }

    fn get(&self, cell: GridCoord) -> bool {
        self.dimensions
            .index(cell)
            .and_then(|index| self.bits.get(index).copied())
            .unwrap_or(false)
    }

    fn set(&mut self, cell: GridCoord, value: bool) {
        if let Some(slot) = self
            .dimensions
            .index(cell)
            .and_then(|index| self.bits.get_mut(index))
        {
            *slot = value;
        }
    }

    fn count_neighbors(&self, cell: GridCoord) -> usize {
        cell.neighbors()
            .iter()
            .filter(|neighbor| self.get(**neighbor))
            .count()
    }

    fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .filter_map(|(index, _)| self.dimensions.coord(index))
    }
}

/// Sanitises a probability so it can be handed to `Rng::gen_bool`.
fn probability(value: f32) -> f64 {
    if value.is_finite() {
        f64::from(value.clamp(0.0, 1.0))
    } else {
        0.0
    }
}
