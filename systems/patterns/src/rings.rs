//! Concentric chokepoint bands measured by breadth-first distance.

use std::collections::VecDeque;

use dustfield_core::GridCoord;
use rand::Rng;

use crate::{CellMask, PatternContext, Placement};

/// Parameters of the ring chokepoint generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingParams {
    /// Cell the rings are centred on.
    pub center: GridCoord,
    /// Distance between the inner edges of consecutive rings.
    pub ring_spacing: u32,
    /// Width of every ring before jitter.
    pub ring_thickness: u32,
    /// Maximum per-cell deviation applied to the thickness.
    pub jitter: u32,
    /// Cells closer than this to the centre are never selected.
    pub hollow_radius: u32,
}

/// Selects bands of cells whose walking distance from the centre falls inside
/// a ring.
///
/// Distances are measured by a breadth-first walk through available cells, so
/// rings bend around obstacles. A cell at distance `d` is selected when
/// `d % ring_spacing < ring_thickness + j` with `j` drawn uniformly from
/// `-jitter..=jitter` for every cell.
pub fn ring_chokepoints<R>(
    context: &PatternContext<'_>,
    params: &RingParams,
    rng: &mut R,
) -> Vec<Placement>
where
    R: Rng + ?Sized,
{
    let dimensions = context.dimensions();
    if params.ring_spacing == 0 || !dimensions.contains(params.center) {
        return Vec::new();
    }

    let distances = walk_distances(context, params.center);
    let spacing = i64::from(params.ring_spacing);
    let thickness = i64::from(params.ring_thickness);
    let jitter = i64::from(params.jitter);

    let mut selected = CellMask::new(dimensions);
    for (cell, distance) in distances {
        if distance < params.hollow_radius || !context.is_available(cell) {
            continue;
        }
        let offset = if jitter > 0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0
        };
        if i64::from(distance) % spacing < thickness + offset {
            selected.set(cell, true);
        }
    }

    context.placements(&selected)
}

/// Breadth-first distances from `center`, in visiting order.
fn walk_distances(context: &PatternContext<'_>, center: GridCoord) -> Vec<(GridCoord, u32)> {
    let dimensions = context.dimensions();
    let mut visited = CellMask::new(dimensions);
    let mut order = Vec::new();
    let mut frontier = VecDeque::new();

    visited.set(center, true);
    frontier.push_back((center, 0_u32));

    while let Some((cell, distance)) = frontier.pop_front() {
        order.push((cell, distance));
        for neighbor in cell.neighbors() {
            if visited.get(neighbor) || !context.is_available(neighbor) {
                continue;
            }
            visited.set(neighbor, true);
            frontier.push_back((neighbor, distance + 1));
        }
    }

    order
}
