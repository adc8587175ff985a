//! Coarse direction field refreshed incrementally across frame ticks.

use dustfield_core::{
    hex::{self, HexDirection},
    GridCoord, GridDimensions,
};
use glam::Vec2;

/// Dense per-cell direction field stored in row-major order.
///
/// Each refresh samples the openness of a cell's six neighbours and pulls the
/// stored vector towards the open side. Only a bounded slice of cells is
/// refreshed per tick; a round-robin cursor remembers where the last slice
/// stopped so every cell is eventually visited.
#[derive(Clone, Debug, Default)]
pub(crate) struct FlowField {
    dimensions: GridDimensions,
    vectors: Vec<Vec2>,
    cursor: usize,
}

impl FlowField {
    pub(crate) fn new(dimensions: GridDimensions) -> Self {
        Self {
            dimensions,
            vectors: vec![Vec2::ZERO; dimensions.cell_count()],
            cursor: 0,
        }
    }

    /// Refreshes up to `budget` cells starting at the cursor.
    pub(crate) fn advance<F>(&mut self, budget: usize, smoothing: f32, mut is_open: F)
    where
        F: FnMut(GridCoord) -> bool,
    {
        let cell_count = self.vectors.len();
        if cell_count == 0 {
            return;
        }

        for _ in 0..budget.min(cell_count) {
            let index = self.cursor;
            self.cursor = (self.cursor + 1) % cell_count;

            let Some(cell) = self.dimensions.coord(index) else {
                continue;
            };

            let mut target = Vec2::ZERO;
            for direction in HexDirection::ALL {
                let neighbor = hex::neighbor(cell, direction);
                if self.dimensions.contains(neighbor) && is_open(neighbor) {
                    target += direction.unit_vector();
                }
            }

            let Some(target) = target.try_normalize() else {
                continue;
            };
            if let Some(vector) = self.vectors.get_mut(index) {
                *vector = vector.lerp(target, smoothing);
            }
        }
    }

    /// Stored direction for the cell; zero outside the field.
    pub(crate) fn vector_at(&self, cell: GridCoord) -> Vec2 {
        self.dimensions
            .index(cell)
            .and_then(|index| self.vectors.get(index).copied())
            .unwrap_or(Vec2::ZERO)
    }
}
