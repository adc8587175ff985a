//! Cellular automaton cave fill over hex adjacency.

use rand::Rng;

use crate::{probability, CellMask, PatternContext, Placement};

/// Parameters of the cellular automaton fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutomatonParams {
    /// Probability that an available cell starts alive.
    pub fill_chance: f32,
    /// Number of generations to run.
    pub iterations: u32,
}

/// Seeds available cells randomly and smooths them into caves.
///
/// A live cell with fewer than two or more than four live neighbours dies, a
/// dead cell with exactly three live neighbours comes alive, and every other
/// cell keeps its state. Unavailable cells never live and count as dead.
pub fn cellular_automaton<R>(
    context: &PatternContext<'_>,
    params: &AutomatonParams,
    rng: &mut R,
) -> Vec<Placement>
where
    R: Rng + ?Sized,
{
    let dimensions = context.dimensions();
    if dimensions.is_empty() {
        return Vec::new();
    }

    let fill_chance = probability(params.fill_chance);
    let mut available = CellMask::new(dimensions);
    let mut live = CellMask::new(dimensions);
    for cell in dimensions.iter() {
        if !context.is_available(cell) {
            continue;
        }
        available.set(cell, true);
        if rng.gen_bool(fill_chance) {
            live.set(cell, true);
        }
    }

    let mut next = live.clone();
    for _ in 0..params.iterations {
        for cell in dimensions.iter() {
            if !available.get(cell) {
                continue;
            }

            let neighbors = live.count_neighbors(cell);
            let alive = if live.get(cell) {
                (2..=4).contains(&neighbors)
            } else {
                neighbors == 3
            };
            next.set(cell, alive);
        }
        std::mem::swap(&mut live, &mut next);
    }

    context.placements(&live)
}
