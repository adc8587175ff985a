//! Randomised depth-first maze carving with braiding and corridor dilation.

use dustfield_core::GridCoord;
use rand::Rng;

use crate::{probability, CellMask, PatternContext, Placement};

/// Parameters of the carved maze generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MazeParams {
    /// Probability that a wall touching two or more passages is opened.
    pub braid_chance: f32,
    /// Passage width in cells; values above one dilate passages outwards.
    pub corridor_thickness: u32,
    /// Cell the depth-first search starts from; random when unset or unavailable.
    pub start: Option<GridCoord>,
}

/// Carves a maze through the available cells and returns its walls.
///
/// The depth-first search only opens a cell when it touches exactly one
/// existing passage, so without braiding the passages form a tree that is
/// connected to the start cell.
pub fn carved_maze<R>(
    context: &PatternContext<'_>,
    params: &MazeParams,
    rng: &mut R,
) -> Vec<Placement>
where
    R: Rng + ?Sized,
{
    let dimensions = context.dimensions();
    let mut candidates = CellMask::new(dimensions);
    let mut ordered = Vec::new();
    for cell in dimensions.iter() {
        if context.is_available(cell) {
            candidates.set(cell, true);
            ordered.push(cell);
        }
    }

    if ordered.is_empty() {
        return Vec::new();
    }

    let start = params
        .start
        .filter(|cell| candidates.get(*cell))
        .unwrap_or_else(|| ordered[rng.gen_range(0..ordered.len())]);

    let mut passages = carve_passages(&candidates, start, rng);
    braid(&candidates, &ordered, &mut passages, params.braid_chance, rng);
    dilate(
        &candidates,
        &ordered,
        &mut passages,
        params.corridor_thickness,
    );

    ordered
        .into_iter()
        .filter(|cell| !passages.get(*cell))
        .map(|cell| context.placement(cell))
        .collect()
}

fn carve_passages<R>(candidates: &CellMask, start: GridCoord, rng: &mut R) -> CellMask
where
    R: Rng + ?Sized,
{
    let mut passages = CellMask::new(candidates.dimensions);
    passages.set(start, true);
    let mut stack = vec![start];
    let mut options: Vec<GridCoord> = Vec::with_capacity(6);

    while let Some(&current) = stack.last() {
        options.clear();
        options.extend(current.neighbors().into_iter().filter(|neighbor| {
            candidates.get(*neighbor)
                && !passages.get(*neighbor)
                && passages.count_neighbors(*neighbor) == 1
        }));

        if options.is_empty() {
            let _ = stack.pop();
            continue;
        }

        let next = options[rng.gen_range(0..options.len())];
        passages.set(next, true);
        stack.push(next);
    }

    passages
}

fn braid<R>(
    candidates: &CellMask,
    ordered: &[GridCoord],
    passages: &mut CellMask,
    braid_chance: f32,
    rng: &mut R,
) where
    R: Rng + ?Sized,
{
    let chance = probability(braid_chance);
    if chance <= 0.0 {
        return;
    }

    for &cell in ordered {
        if passages.get(cell) || !candidates.get(cell) {
            continue;
        }
        if passages.count_neighbors(cell) >= 2 && rng.gen_bool(chance) {
            passages.set(cell, true);
        }
    }
}

fn dilate(candidates: &CellMask, ordered: &[GridCoord], passages: &mut CellMask, thickness: u32) {
    let mut frontier = Vec::new();
    for _ in 1..thickness {
        frontier.clear();
        frontier.extend(ordered.iter().copied().filter(|cell| {
            candidates.get(*cell) && !passages.get(*cell) && passages.count_neighbors(*cell) > 0
        }));
        if frontier.is_empty() {
            break;
        }
        for &cell in &frontier {
            passages.set(cell, true);
        }
    }
}
