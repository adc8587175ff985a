//! Random-walk brush strokes with optional flow following.

use dustfield_core::{
    hex::{self, HexDirection},
    GridCoord,
};
use glam::Vec2;
use rand::Rng;

use crate::{probability, CellMask, PatternContext, Placement};

/// Parameters of the drunken stroke generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeParams {
    /// Number of strokes to draw.
    pub strokes: u32,
    /// Shortest stroke length in cells.
    pub min_length: u32,
    /// Longest stroke length in cells.
    pub max_length: u32,
    /// Probability of turning in a random direction on each step.
    pub step_jitter: f32,
    /// Probability of adding each available neighbour of a stroke cell.
    pub dilate: f32,
    /// Probability of turning towards the flow direction on each step.
    pub flow_follow: f32,
}

/// Draws wandering strokes through available cells.
///
/// Every stroke starts on a random available cell and keeps its heading
/// unless it turns randomly (`step_jitter`) or follows the flow bias
/// (`flow_follow`). A stroke ends early when its next cell is unavailable.
pub fn drunken_strokes<R>(
    context: &PatternContext<'_>,
    params: &StrokeParams,
    rng: &mut R,
) -> Vec<Placement>
where
    R: Rng + ?Sized,
{
    let dimensions = context.dimensions();
    let starts: Vec<GridCoord> = dimensions
        .iter()
        .filter(|cell| context.is_available(*cell))
        .collect();
    if starts.is_empty() || params.strokes == 0 {
        return Vec::new();
    }

    let jitter = probability(params.step_jitter);
    let follow = probability(params.flow_follow);
    let shortest = params.min_length.min(params.max_length).max(1);
    let longest = params.max_length.max(shortest);

    let mut painted = CellMask::new(dimensions);
    for _ in 0..params.strokes {
        let mut cell = starts[rng.gen_range(0..starts.len())];
        let mut heading = HexDirection::from_index(rng.gen_range(0..hex::NEIGHBOR_COUNT));
        let length = rng.gen_range(shortest..=longest);

        painted.set(cell, true);
        for _ in 1..length {
            if rng.gen_bool(jitter) {
                heading = HexDirection::from_index(rng.gen_range(0..hex::NEIGHBOR_COUNT));
            } else if follow > 0.0 && rng.gen_bool(follow) {
                if let Some(direction) = context.flow_at(cell).and_then(best_aligned) {
                    heading = direction;
                }
            }

            let next = hex::neighbor(cell, heading);
            if !context.is_available(next) {
                break;
            }
            cell = next;
            painted.set(cell, true);
        }
    }

    let dilate = probability(params.dilate);
    if dilate > 0.0 {
        let core: Vec<GridCoord> = painted.iter().collect();
        for cell in core {
            for neighbor in cell.neighbors() {
                if !painted.get(neighbor) && context.is_available(neighbor) && rng.gen_bool(dilate)
                {
                    painted.set(neighbor, true);
                }
            }
        }
    }

    context.placements(&painted)
}

/// Hex direction whose unit vector points closest to `flow`.
fn best_aligned(flow: Vec2) -> Option<HexDirection> {
    if !flow.is_finite() || flow.length_squared() <= f32::EPSILON {
        return None;
    }

    HexDirection::ALL
        .into_iter()
        .max_by(|a, b| {
            flow.dot(a.unit_vector())
                .total_cmp(&flow.dot(b.unit_vector()))
        })
}
