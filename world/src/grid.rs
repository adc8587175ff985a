//! Dense per-cell terrain state with a sparse solid index.

use std::collections::HashSet;

use dustfield_core::{CellState, GridCoord, GridDimensions, RowSpan, Tint, VisualHandle};

/// State stored for a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Cell {
    pub(crate) state: CellState,
    pub(crate) visual: Option<VisualHandle>,
    pub(crate) tint: Tint,
}

impl Cell {
    fn empty(tint: Tint) -> Self {
        Self {
            state: CellState::Empty,
            visual: None,
            tint,
        }
    }
}

/// Authoritative cell records plus the index of solid coordinates.
///
/// Every state change goes through [`CellGrid::transition`], which keeps the
/// index equal to the set of `Solid` cells.
#[derive(Clone, Debug)]
pub(crate) struct CellGrid {
    dimensions: GridDimensions,
    cells: Vec<Cell>,
    solid: HashSet<GridCoord>,
    default_tint: Tint,
}

impl CellGrid {
    pub(crate) fn new(dimensions: GridDimensions, default_tint: Tint) -> Self {
        Self {
            dimensions,
            cells: vec![Cell::empty(default_tint); dimensions.cell_count()],
            solid: HashSet::new(),
            default_tint,
        }
    }

    pub(crate) const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    pub(crate) fn cell(&self, coord: GridCoord) -> Option<&Cell> {
        self.dimensions
            .index(coord)
            .and_then(|index| self.cells.get(index))
    }

    fn cell_mut(&mut self, coord: GridCoord) -> Option<&mut Cell> {
        self.dimensions
            .index(coord)
            .and_then(|index| self.cells.get_mut(index))
    }

    pub(crate) fn state(&self, coord: GridCoord) -> Option<CellState> {
        self.cell(coord).map(|cell| cell.state)
    }

    pub(crate) fn is_solid(&self, coord: GridCoord) -> bool {
        self.solid.contains(&coord)
    }

    pub(crate) fn visual(&self, coord: GridCoord) -> Option<VisualHandle> {
        self.cell(coord).and_then(|cell| cell.visual)
    }

    pub(crate) fn tint(&self, coord: GridCoord) -> Option<Tint> {
        self.cell(coord).map(|cell| cell.tint)
    }

    /// Moves the cell to `next`, updating the solid index. Returns the
    /// previous state, or `None` when the coordinate is outside the grid.
    pub(crate) fn transition(&mut self, coord: GridCoord, next: CellState) -> Option<CellState> {
        let cell = self.cell_mut(coord)?;
        let previous = cell.state;
        cell.state = next;

        match (previous == CellState::Solid, next == CellState::Solid) {
            (false, true) => {
                let _ = self.solid.insert(coord);
            }
            (true, false) => {
                let _ = self.solid.remove(&coord);
            }
            _ => {}
        }

        tracing::trace!(?coord, ?previous, ?next, "cell transition");
        Some(previous)
    }

    pub(crate) fn set_visual(&mut self, coord: GridCoord, visual: Option<VisualHandle>) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.visual = visual;
        }
    }

    pub(crate) fn set_tint(&mut self, coord: GridCoord, tint: Tint) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.tint = tint;
        }
    }

    /// Returns every non-empty cell to `Empty`, yielding the cells that held
    /// anything together with their visuals.
    pub(crate) fn reset(&mut self) -> Vec<(GridCoord, CellState, Option<VisualHandle>)> {
        let mut retired = Vec::new();
        for (index, cell) in self.cells.iter_mut().enumerate() {
            if cell.state != CellState::Empty || cell.visual.is_some() {
                if let Some(coord) = self.dimensions.coord(index) {
                    retired.push((coord, cell.state, cell.visual));
                }
            }
            *cell = Cell::empty(self.default_tint);
        }
        self.solid.clear();
        retired
    }

    pub(crate) fn solid_count(&self) -> usize {
        self.solid.len()
    }

    /// Solid cells in row-major order.
    pub(crate) fn solid_cells(&self) -> Vec<GridCoord> {
        let mut cells: Vec<GridCoord> = self.solid.iter().copied().collect();
        cells.sort_unstable();
        cells
    }

    /// Counts cells in each state.
    pub(crate) fn count_state(&self, state: CellState) -> usize {
        self.cells.iter().filter(|cell| cell.state == state).count()
    }

    /// Whether the index holds exactly the `Solid` cells.
    pub(crate) fn is_index_consistent(&self) -> bool {
        let mut solid_records = 0;
        for (index, cell) in self.cells.iter().enumerate() {
            let Some(coord) = self.dimensions.coord(index) else {
                return false;
            };
            let is_solid = cell.state == CellState::Solid;
            if is_solid != self.solid.contains(&coord) {
                return false;
            }
            if is_solid {
                solid_records += 1;
            }
        }
        solid_records == self.solid.len()
    }

    /// Merges horizontally adjacent solid cells into row spans.
    pub(crate) fn row_spans(&self) -> Vec<RowSpan> {
        let mut spans = Vec::new();
        let mut current: Option<RowSpan> = None;

        for coord in self.dimensions.iter() {
            let solid = self.is_solid(coord);
            current = match (current, solid) {
                (Some(mut span), true) if span.row == coord.row() => {
                    span.end_column = coord.column();
                    Some(span)
                }
                (open, true) => {
                    if let Some(span) = open {
                        spans.push(span);
                    }
                    Some(RowSpan {
                        row: coord.row(),
                        start_column: coord.column(),
                        end_column: coord.column(),
                    })
                }
                (open, false) => {
                    if let Some(span) = open {
                        spans.push(span);
                    }
                    None
                }
            };
        }

        if let Some(span) = current {
            spans.push(span);
        }
        spans
    }
}
