//! Keep-clear bookkeeping for vehicle footprints and the protected pocket.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use dustfield_core::{GridCoord, OwnerId};

/// Cells that left and joined a footprint during one update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FootprintDelta {
    pub(crate) released: Vec<GridCoord>,
    pub(crate) claimed: Vec<GridCoord>,
}

impl FootprintDelta {
    pub(crate) fn is_empty(&self) -> bool {
        self.released.is_empty() && self.claimed.is_empty()
    }

    fn between(previous: &BTreeSet<GridCoord>, next: &BTreeSet<GridCoord>) -> Self {
        Self {
            released: previous.difference(next).copied().collect(),
            claimed: next.difference(previous).copied().collect(),
        }
    }
}

/// Registry of keep-clear footprints.
///
/// Vehicle footprints overlap freely, so each cell carries a reference count
/// maintained incrementally from footprint diffs. The protected pocket is a
/// single set without counts.
#[derive(Debug, Default)]
pub(crate) struct ExclusionMap {
    footprints: BTreeMap<OwnerId, BTreeSet<GridCoord>>,
    refcounts: HashMap<GridCoord, u32>,
    pocket: BTreeSet<GridCoord>,
}

impl ExclusionMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the owner's footprint with `next` and reports the difference.
    pub(crate) fn update_vehicle_footprint(
        &mut self,
        owner: OwnerId,
        next: BTreeSet<GridCoord>,
    ) -> FootprintDelta {
        let delta = match self.footprints.get(&owner) {
            Some(previous) => FootprintDelta::between(previous, &next),
            None => FootprintDelta {
                released: Vec::new(),
                claimed: next.iter().copied().collect(),
            },
        };

        for cell in &delta.released {
            self.decrement(*cell);
        }
        for cell in &delta.claimed {
            *self.refcounts.entry(*cell).or_insert(0) += 1;
        }

        if next.is_empty() {
            let _ = self.footprints.remove(&owner);
        } else {
            let _ = self.footprints.insert(owner, next);
        }
        delta
    }

    /// Drops the owner's footprint, returning every cell it covered.
    pub(crate) fn release_vehicle_footprint(&mut self, owner: OwnerId) -> Vec<GridCoord> {
        let Some(previous) = self.footprints.remove(&owner) else {
            return Vec::new();
        };
        for cell in &previous {
            self.decrement(*cell);
        }
        previous.into_iter().collect()
    }

    pub(crate) fn update_star_pocket(&mut self, next: BTreeSet<GridCoord>) -> FootprintDelta {
        let delta = FootprintDelta::between(&self.pocket, &next);
        self.pocket = next;
        delta
    }

    pub(crate) fn release_star_pocket(&mut self) -> Vec<GridCoord> {
        std::mem::take(&mut self.pocket).into_iter().collect()
    }

    pub(crate) fn is_keep_clear(&self, cell: GridCoord) -> bool {
        self.pocket.contains(&cell) || self.vehicle_refcount(cell) > 0
    }

    pub(crate) fn vehicle_refcount(&self, cell: GridCoord) -> u32 {
        self.refcounts.get(&cell).copied().unwrap_or(0)
    }

    pub(crate) fn in_pocket(&self, cell: GridCoord) -> bool {
        self.pocket.contains(&cell)
    }

    fn decrement(&mut self, cell: GridCoord) {
        if let Some(count) = self.refcounts.get_mut(&cell) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                let _ = self.refcounts.remove(&cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(coords: &[(i32, i32)]) -> BTreeSet<GridCoord> {
        coords
            .iter()
            .map(|(column, row)| GridCoord::new(*column, *row))
            .collect()
    }

    #[test]
    fn footprint_diff_reports_only_the_delta() {
        let mut map = ExclusionMap::new();
        let owner = OwnerId::new(1);

        let first = map.update_vehicle_footprint(owner, cells(&[(1, 1), (2, 2)]));
        assert_eq!(first.claimed, vec![GridCoord::new(1, 1), GridCoord::new(2, 2)]);
        assert_eq!(map.vehicle_refcount(GridCoord::new(2, 2)), 1);

        let second = map.update_vehicle_footprint(owner, cells(&[(2, 2), (3, 3)]));
        assert_eq!(second.released, vec![GridCoord::new(1, 1)]);
        assert_eq!(second.claimed, vec![GridCoord::new(3, 3)]);
        assert_eq!(map.vehicle_refcount(GridCoord::new(2, 2)), 1);
        assert_eq!(map.vehicle_refcount(GridCoord::new(1, 1)), 0);
        assert!(!map.is_keep_clear(GridCoord::new(1, 1)));
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let mut map = ExclusionMap::new();
        let owner = OwnerId::new(3);
        let footprint = cells(&[(0, 0), (0, 1)]);

        let _ = map.update_vehicle_footprint(owner, footprint.clone());
        let repeat = map.update_vehicle_footprint(owner, footprint);
        assert!(repeat.is_empty());
        assert_eq!(map.vehicle_refcount(GridCoord::new(0, 0)), 1);
    }

    #[test]
    fn overlapping_owners_share_refcounts() {
        let mut map = ExclusionMap::new();
        let shared = GridCoord::new(4, 4);
        let _ = map.update_vehicle_footprint(OwnerId::new(1), cells(&[(4, 4)]));
        let _ = map.update_vehicle_footprint(OwnerId::new(2), cells(&[(4, 4), (5, 4)]));
        assert_eq!(map.vehicle_refcount(shared), 2);

        let released = map.release_vehicle_footprint(OwnerId::new(1));
        assert_eq!(released, vec![shared]);
        assert_eq!(map.vehicle_refcount(shared), 1);
        assert!(map.is_keep_clear(shared));

        let _ = map.release_vehicle_footprint(OwnerId::new(2));
        assert!(!map.is_keep_clear(shared));
        assert!(map.release_vehicle_footprint(OwnerId::new(2)).is_empty());
    }

    #[test]
    fn pocket_diffs_without_refcounts() {
        let mut map = ExclusionMap::new();
        let delta = map.update_star_pocket(cells(&[(1, 0), (2, 0)]));
        assert_eq!(delta.claimed.len(), 2);
        assert!(map.is_keep_clear(GridCoord::new(1, 0)));
        assert_eq!(map.vehicle_refcount(GridCoord::new(1, 0)), 0);

        let delta = map.update_star_pocket(cells(&[(2, 0)]));
        assert_eq!(delta.released, vec![GridCoord::new(1, 0)]);
        assert!(delta.claimed.is_empty());

        assert_eq!(map.release_star_pocket(), vec![GridCoord::new(2, 0)]);
        assert!(!map.in_pocket(GridCoord::new(2, 0)));
    }
}
