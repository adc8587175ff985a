//! Budgeted tint diffusion across solid terrain.

use std::collections::{HashMap, HashSet, VecDeque};

use dustfield_core::{CellState, Event, GridCoord, Imprint, Tint};

use crate::grid::CellGrid;

/// Tuning shared by every diffusion pass.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DiffusionParams {
    pub(crate) budget: usize,
    pub(crate) rate: f32,
    pub(crate) min_delta: f32,
    pub(crate) default_tint: Tint,
}

/// Dirty queue of cells whose tint should be re-blended.
#[derive(Debug, Default)]
pub(crate) struct TintDiffusion {
    queue: VecDeque<GridCoord>,
    queued: HashSet<GridCoord>,
}

impl TintDiffusion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&mut self, cell: GridCoord) {
        if self.queued.insert(cell) {
            self.queue.push_back(cell);
        }
    }

    /// Enqueues the cell and its six neighbours.
    pub(crate) fn enqueue_around(&mut self, cell: GridCoord) {
        self.enqueue(cell);
        for neighbor in cell.neighbors() {
            self.enqueue(neighbor);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Processes up to `params.budget` queued cells.
    ///
    /// Each solid cell moves `rate` of the way towards the weighted average of
    /// its solid neighbours, the imprints waiting in neighbouring cells
    /// (weighted by hardness) and the default tint. Neighbours are queued
    /// again only when the change exceeds `min_delta`.
    pub(crate) fn step(
        &mut self,
        grid: &mut CellGrid,
        imprints: &HashMap<GridCoord, Imprint>,
        params: DiffusionParams,
        out_events: &mut Vec<Event>,
    ) {
        for _ in 0..params.budget {
            let Some(cell) = self.queue.pop_front() else {
                break;
            };
            let _ = self.queued.remove(&cell);

            if grid.state(cell) != Some(CellState::Solid) {
                continue;
            }
            let Some(current) = grid.tint(cell) else {
                continue;
            };

            let mut sum = params.default_tint;
            let mut weight = 1.0_f32;
            for neighbor in cell.neighbors() {
                if grid.is_solid(neighbor) {
                    if let Some(tint) = grid.tint(neighbor) {
                        sum = sum.added(tint);
                        weight += 1.0;
                    }
                } else if let Some(imprint) = imprints.get(&neighbor) {
                    sum = sum.added(imprint.tint.scaled(imprint.hardness()));
                    weight += imprint.hardness();
                }
            }

            let average = sum.scaled(1.0 / weight);
            let next = current.lerp(average, params.rate);
            let delta = current.max_delta(next);
            if delta <= f32::EPSILON {
                continue;
            }

            grid.set_tint(cell, next);
            out_events.push(Event::CellTinted {
                cell,
                visual: grid.visual(cell),
                tint: next,
            });

            if delta > params.min_delta {
                for neighbor in cell.neighbors() {
                    if grid.is_solid(neighbor) {
                        self.enqueue(neighbor);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dustfield_core::GridDimensions;

    use super::*;

    fn params() -> DiffusionParams {
        DiffusionParams {
            budget: 16,
            rate: 0.5,
            min_delta: 0.01,
            default_tint: Tint::new(0.0, 0.0, 0.0),
        }
    }

    #[test]
    fn tint_moves_towards_neighbours_and_default() {
        let mut grid = CellGrid::new(GridDimensions::new(3, 1), Tint::default());
        let left = GridCoord::new(0, 0);
        let middle = GridCoord::new(1, 0);
        for cell in [left, middle] {
            let _ = grid.transition(cell, CellState::Solid);
        }
        grid.set_tint(left, Tint::new(1.0, 1.0, 1.0));

        let mut diffusion = TintDiffusion::new();
        diffusion.enqueue(middle);
        let mut events = Vec::new();
        diffusion.step(&mut grid, &HashMap::new(), params(), &mut events);

        // Average of the default (0) and the left neighbour (1) is 0.5.
        let tint = grid.tint(middle).expect("tint");
        assert!((tint.red - 0.25).abs() < 1e-6, "{tint:?}");
        assert_eq!(events.len(), 1);
        assert_eq!(diffusion.len(), 1, "left neighbour re-queued");
    }

    #[test]
    fn imprints_pull_with_their_hardness() {
        let mut grid = CellGrid::new(GridDimensions::new(2, 1), Tint::default());
        let solid = GridCoord::new(0, 0);
        let carved = GridCoord::new(1, 0);
        let _ = grid.transition(solid, CellState::Solid);

        let mut imprints = HashMap::new();
        let _ = imprints.insert(
            carved,
            Imprint::new(Tint::new(1.0, 0.0, 0.0), Tint::default(), 1.0),
        );

        let mut diffusion = TintDiffusion::new();
        diffusion.enqueue(solid);
        let mut events = Vec::new();
        diffusion.step(&mut grid, &imprints, params(), &mut events);

        let tint = grid.tint(solid).expect("tint");
        assert!((tint.red - 0.25).abs() < 1e-6, "{tint:?}");
        assert!(tint.green.abs() < 1e-6);
    }

    #[test]
    fn empty_cells_are_skipped() {
        let mut grid = CellGrid::new(GridDimensions::new(2, 1), Tint::new(0.5, 0.5, 0.5));
        let mut diffusion = TintDiffusion::new();
        diffusion.enqueue_around(GridCoord::new(0, 0));
        let mut events = Vec::new();
        diffusion.step(&mut grid, &HashMap::new(), params(), &mut events);
        assert!(events.is_empty());
        assert_eq!(diffusion.len(), 0);
    }
}
