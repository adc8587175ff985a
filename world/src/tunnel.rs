//! Greedy tunnels that guarantee connectivity between maze anchors.

use std::collections::HashSet;

use dustfield_core::GridCoord;

/// How a tunnel walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TunnelOutcome {
    /// The walk arrived at its target.
    Reached,
    /// Every unvisited neighbour of the last cell was impassable.
    BoxedIn,
    /// The walk used up its step limit.
    StepLimit,
}

/// Cells visited by a tunnel walk, including both endpoints when reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Tunnel {
    pub(crate) cells: Vec<GridCoord>,
    pub(crate) outcome: TunnelOutcome,
}

impl Tunnel {
    pub(crate) fn last(&self) -> Option<GridCoord> {
        self.cells.last().copied()
    }
}

/// Walks from `from` towards `to`, one hex step at a time.
///
/// Each step prefers an occupied neighbour that gets closer to the target,
/// then an empty neighbour that gets closer, and finally any unvisited
/// passable neighbour, closest to the target first. Ties keep neighbour
/// order so the walk is deterministic.
pub(crate) fn dig_tunnel<P, O>(
    from: GridCoord,
    to: GridCoord,
    step_limit: usize,
    is_passable: P,
    is_occupied: O,
) -> Tunnel
where
    P: Fn(GridCoord) -> bool,
    O: Fn(GridCoord) -> bool,
{
    let mut cells = vec![from];
    let mut visited: HashSet<GridCoord> = HashSet::from([from]);
    let mut current = from;

    while current != to {
        if cells.len() > step_limit {
            return Tunnel {
                cells,
                outcome: TunnelOutcome::StepLimit,
            };
        }

        let distance = current.distance(to);
        let candidates: Vec<GridCoord> = current
            .neighbors()
            .into_iter()
            .filter(|neighbor| !visited.contains(neighbor) && is_passable(*neighbor))
            .collect();

        let approaching = |neighbor: &&GridCoord| neighbor.distance(to) < distance;
        let next = candidates
            .iter()
            .filter(approaching)
            .find(|neighbor| is_occupied(**neighbor))
            .or_else(|| candidates.iter().find(|neighbor| approaching(neighbor)))
            .or_else(|| {
                candidates
                    .iter()
                    .min_by_key(|neighbor| neighbor.distance(to))
            })
            .copied();

        let Some(next) = next else {
            return Tunnel {
                cells,
                outcome: TunnelOutcome::BoxedIn,
            };
        };

        let _ = visited.insert(next);
        cells.push(next);
        current = next;
    }

    Tunnel {
        cells,
        outcome: TunnelOutcome::Reached,
    }
}
