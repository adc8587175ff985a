//! Hex-offset grid geometry shared by the world and the pattern generators.
//!
//! The grid uses the "odd-r" offset layout: pointy-top hexes where every odd
//! row is shifted half a cell towards increasing columns. Neighbour offsets
//! therefore depend on row parity. All conversions go through axial
//! coordinates so distances and disks stay exact.

use glam::Vec2;

use crate::GridCoord;

const SQRT_3: f32 = 1.732_050_8;

/// Number of neighbours surrounding every hex cell.
pub const NEIGHBOR_COUNT: usize = 6;

/// Neighbour offsets for even rows, ordered E, NE, NW, W, SW, SE.
const EVEN_ROW_OFFSETS: [(i32, i32); NEIGHBOR_COUNT] =
    [(1, 0), (0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1)];

/// Neighbour offsets for odd rows, ordered E, NE, NW, W, SW, SE.
const ODD_ROW_OFFSETS: [(i32, i32); NEIGHBOR_COUNT] =
    [(1, 0), (1, -1), (0, -1), (-1, 0), (0, 1), (1, 1)];

/// Upper bound on the capacity reserved up front for rings and disks.
const MAX_PREALLOCATED: usize = 4_096;

/// Axial direction vectors in the same order as the offset tables.
const AXIAL_DIRECTIONS: [(i32, i32); NEIGHBOR_COUNT] =
    [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// One of the six directions leading out of a hex cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HexDirection {
    /// Towards increasing columns on the same row.
    East,
    /// Up and to the right.
    NorthEast,
    /// Up and to the left.
    NorthWest,
    /// Towards decreasing columns on the same row.
    West,
    /// Down and to the left.
    SouthWest,
    /// Down and to the right.
    SouthEast,
}

impl HexDirection {
    /// Every direction in clockwise-from-east order.
    pub const ALL: [HexDirection; NEIGHBOR_COUNT] = [
        HexDirection::East,
        HexDirection::NorthEast,
        HexDirection::NorthWest,
        HexDirection::West,
        HexDirection::SouthWest,
        HexDirection::SouthEast,
    ];

    /// Position of the direction within [`HexDirection::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::East => 0,
            Self::NorthEast => 1,
            Self::NorthWest => 2,
            Self::West => 3,
            Self::SouthWest => 4,
            Self::SouthEast => 5,
        }
    }

    /// Direction located at `index` modulo six.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % NEIGHBOR_COUNT]
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Unit vector of the direction in world space (y grows downwards).
    #[must_use]
    pub fn unit_vector(self) -> Vec2 {
        let angle = -(self.index() as f32) * std::f32::consts::FRAC_PI_3;
        Vec2::new(angle.cos(), angle.sin())
    }
}

/// Neighbour of `cell` in the provided direction, ignoring grid bounds.
#[must_use]
pub fn neighbor(cell: GridCoord, direction: HexDirection) -> GridCoord {
    let offsets = if cell.row() & 1 == 0 {
        &EVEN_ROW_OFFSETS
    } else {
        &ODD_ROW_OFFSETS
    };
    let (dc, dr) = offsets[direction.index()];
    GridCoord::new(cell.column() + dc, cell.row() + dr)
}

/// All six neighbours of `cell`, ignoring grid bounds.
#[must_use]
pub fn neighbors(cell: GridCoord) -> [GridCoord; NEIGHBOR_COUNT] {
    HexDirection::ALL.map(|direction| neighbor(cell, direction))
}

/// Converts an offset coordinate into axial `(q, r)` form.
#[must_use]
pub const fn to_axial(cell: GridCoord) -> (i32, i32) {
    let row = cell.row();
    let q = cell.column() - (row - (row & 1)) / 2;
    (q, row)
}

/// Converts axial `(q, r)` coordinates back into the offset layout.
#[must_use]
pub const fn from_axial(q: i32, r: i32) -> GridCoord {
    GridCoord::new(q + (r - (r & 1)) / 2, r)
}

/// Number of hex steps separating two cells.
#[must_use]
pub fn distance(a: GridCoord, b: GridCoord) -> u32 {
    let (aq, ar) = to_axial(a);
    let (bq, br) = to_axial(b);
    let dq = aq - bq;
    let dr = ar - br;
    (dq.unsigned_abs() + dr.unsigned_abs() + (dq + dr).unsigned_abs()) / 2
}

/// Cells exactly `radius` steps away from `center`, walked around the ring.
#[must_use]
pub fn ring(center: GridCoord, radius: u32) -> Vec<GridCoord> {
    if radius == 0 {
        return vec![center];
    }

    let steps = i32::try_from(radius).unwrap_or(i32::MAX);
    let (cq, cr) = to_axial(center);
    let (sq, sr) = AXIAL_DIRECTIONS[HexDirection::SouthWest.index()];
    let mut q = cq.saturating_add(sq.saturating_mul(steps));
    let mut r = cr.saturating_add(sr.saturating_mul(steps));

    let capacity = NEIGHBOR_COUNT.saturating_mul(radius as usize);
    let mut cells = Vec::with_capacity(capacity.min(MAX_PREALLOCATED));
    for (dq, dr) in AXIAL_DIRECTIONS {
        for _ in 0..steps {
            cells.push(from_axial(q, r));
            q = q.saturating_add(dq);
            r = r.saturating_add(dr);
        }
    }
    cells
}

/// Every cell within `radius` steps of `center`, nearest rings first.
#[must_use]
pub fn disk(center: GridCoord, radius: u32) -> Vec<GridCoord> {
    let mut cells = Vec::with_capacity(disk_len(radius).min(MAX_PREALLOCATED));
    for step in 0..=radius {
        cells.extend(ring(center, step));
    }
    cells
}

/// Number of cells inside a disk of the provided radius, saturating at
/// `usize::MAX`.
#[must_use]
pub const fn disk_len(radius: u32) -> usize {
    let radius = radius as usize;
    radius
        .saturating_add(1)
        .saturating_mul(radius)
        .saturating_mul(3)
        .saturating_add(1)
}

/// Maps grid coordinates to world positions and back for pointy-top hexes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexLayout {
    size: f32,
    origin: Vec2,
}

impl HexLayout {
    /// Creates a layout with the provided hex radius and world origin.
    #[must_use]
    pub const fn new(size: f32, origin: Vec2) -> Self {
        Self { size, origin }
    }

    /// Circumradius of a single hex in world units.
    #[must_use]
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Half extents of the axis-aligned box enclosing one hex.
    #[must_use]
    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(self.size * SQRT_3 * 0.5, self.size)
    }

    /// World-space centre of `cell`.
    #[must_use]
    pub fn to_world(&self, cell: GridCoord) -> Vec2 {
        let shift = if cell.row() & 1 == 0 { 0.0 } else { 0.5 };
        let x = self.size * SQRT_3 * (cell.column() as f32 + shift);
        let y = self.size * 1.5 * cell.row() as f32;
        self.origin + Vec2::new(x, y)
    }

    /// Cell containing the world position, which may lie outside the grid.
    #[must_use]
    pub fn to_cell(&self, position: Vec2) -> GridCoord {
        if self.size <= f32::EPSILON {
            return GridCoord::new(0, 0);
        }

        let local = position - self.origin;
        let q = (SQRT_3 / 3.0 * local.x - local.y / 3.0) / self.size;
        let r = (2.0 / 3.0 * local.y) / self.size;
        let (q, r) = cube_round(q, r);
        from_axial(q, r)
    }
}

fn cube_round(q: f32, r: f32) -> (i32, i32) {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }

    (rq as i32, rr as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_offsets_depend_on_row_parity() {
        let even = GridCoord::new(3, 2);
        let odd = GridCoord::new(3, 3);

        assert_eq!(
            neighbor(even, HexDirection::NorthEast),
            GridCoord::new(3, 1)
        );
        assert_eq!(neighbor(odd, HexDirection::NorthEast), GridCoord::new(4, 2));
        assert_eq!(
            neighbor(even, HexDirection::SouthWest),
            GridCoord::new(2, 3)
        );
        assert_eq!(neighbor(odd, HexDirection::SouthWest), GridCoord::new(3, 4));
    }

    #[test]
    fn every_neighbor_is_one_step_away() {
        for cell in [GridCoord::new(0, 0), GridCoord::new(5, 7), GridCoord::new(-2, -3)] {
            for other in neighbors(cell) {
                assert_eq!(distance(cell, other), 1, "{cell:?} -> {other:?}");
            }
        }
    }

    #[test]
    fn opposite_direction_leads_back() {
        let cell = GridCoord::new(4, 5);
        for direction in HexDirection::ALL {
            let there = neighbor(cell, direction);
            assert_eq!(neighbor(there, direction.opposite()), cell);
        }
    }

    #[test]
    fn axial_conversion_round_trips_negative_rows() {
        for row in -3..4 {
            for column in -3..4 {
                let cell = GridCoord::new(column, row);
                let (q, r) = to_axial(cell);
                assert_eq!(from_axial(q, r), cell);
            }
        }
    }

    #[test]
    fn ring_cells_sit_at_exact_radius() {
        let center = GridCoord::new(6, 5);
        let cells = ring(center, 3);
        assert_eq!(cells.len(), 18);
        assert!(cells.iter().all(|cell| distance(center, *cell) == 3));
    }

    #[test]
    fn disk_orders_cells_nearest_first() {
        let center = GridCoord::new(2, 2);
        let cells = disk(center, 2);
        assert_eq!(cells.len(), disk_len(2));
        assert_eq!(cells[0], center);
        let distances: Vec<u32> = cells.iter().map(|cell| distance(center, *cell)).collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn disk_len_saturates_for_huge_radii() {
        assert_eq!(disk_len(0), 1);
        assert_eq!(disk_len(3), 37);
        assert_eq!(disk_len(u32::MAX), usize::MAX);
    }

    #[test]
    fn layout_maps_cell_centres_back_to_cells() {
        let layout = HexLayout::new(10.0, Vec2::new(-5.0, 3.0));
        for row in 0..6 {
            for column in 0..6 {
                let cell = GridCoord::new(column, row);
                assert_eq!(layout.to_cell(layout.to_world(cell)), cell);
            }
        }
    }
}
