//! Delayed regrowth timers, the step-gated promotion queue and settle timers.

use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    time::Duration,
};

use dustfield_core::GridCoord;

/// Per-cell regrow timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegrowTimer {
    /// Fires once the simulation clock reaches `until`.
    Waiting { until: Duration },
    /// Parked until a keep-clear release wakes it.
    Blocked,
}

/// Reason a cell may not regrow right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegrowVeto {
    /// Anchor or tunnel cell; regrowth is abandoned.
    PermanentClear,
    /// The cell already holds terrain; regrowth is abandoned.
    AlreadySolid,
    /// Inside a vehicle footprint or the protected pocket; wait for release.
    KeepClear,
    /// Claimed by the host or another system; retry after a backoff.
    Claimed,
    /// The host does not allow terrain in the cell; retry after a backoff.
    NotFree,
    /// A vehicle body overlaps the cell; retry after a backoff.
    VehicleOverlap,
    /// A collectable overlaps the cell; retry after a backoff.
    CollectableOverlap,
    /// A temporary hold keeps the cell open; retry after a backoff.
    Held,
    /// The previous visual is still fading out; retry after a backoff.
    StillClearing,
}

/// Result of a regrow request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RequestOutcome {
    Scheduled,
    Refreshed,
    AlreadyScheduled,
}

/// Scheduler state shared by the delay loop, the step gate and settling.
#[derive(Debug, Default)]
pub(crate) struct RegrowthScheduler {
    timers: HashMap<GridCoord, RegrowTimer>,
    queue: VecDeque<GridCoord>,
    queued: HashSet<GridCoord>,
    settling: BTreeMap<GridCoord, Duration>,
}

impl RegrowthScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts a timer firing at `until`. In-flight timers are left untouched
    /// unless `refresh` is set, which replaces them.
    pub(crate) fn request(
        &mut self,
        cell: GridCoord,
        until: Duration,
        refresh: bool,
    ) -> RequestOutcome {
        let timer = RegrowTimer::Waiting { until };
        match self.timers.get_mut(&cell) {
            Some(existing) if refresh => {
                *existing = timer;
                RequestOutcome::Refreshed
            }
            Some(_) => RequestOutcome::AlreadyScheduled,
            None => {
                let _ = self.timers.insert(cell, timer);
                RequestOutcome::Scheduled
            }
        }
    }

    pub(crate) fn has_timer(&self, cell: GridCoord) -> bool {
        self.timers.contains_key(&cell)
    }

    pub(crate) fn timer(&self, cell: GridCoord) -> Option<RegrowTimer> {
        self.timers.get(&cell).copied()
    }

    pub(crate) fn cancel(&mut self, cell: GridCoord) -> bool {
        self.timers.remove(&cell).is_some()
    }

    /// Removes and returns every timer due at `now`, earliest first.
    pub(crate) fn take_due(&mut self, now: Duration) -> Vec<GridCoord> {
        let mut due: Vec<(Duration, GridCoord)> = self
            .timers
            .iter()
            .filter_map(|(cell, timer)| match timer {
                RegrowTimer::Waiting { until } if *until <= now => Some((*until, *cell)),
                _ => None,
            })
            .collect();
        due.sort_unstable();

        for (_, cell) in &due {
            let _ = self.timers.remove(cell);
        }
        due.into_iter().map(|(_, cell)| cell).collect()
    }

    /// Parks the cell until a keep-clear release wakes it.
    pub(crate) fn block(&mut self, cell: GridCoord) {
        let _ = self.timers.insert(cell, RegrowTimer::Blocked);
    }

    /// Re-arms the cell's timer after a transient veto.
    pub(crate) fn retry(&mut self, cell: GridCoord, until: Duration) {
        let _ = self.timers.insert(cell, RegrowTimer::Waiting { until });
    }

    /// Turns a blocked timer into one that fires at `now`.
    pub(crate) fn wake(&mut self, cell: GridCoord, now: Duration) -> bool {
        match self.timers.get_mut(&cell) {
            Some(timer) if *timer == RegrowTimer::Blocked => {
                *timer = RegrowTimer::Waiting { until: now };
                true
            }
            _ => false,
        }
    }

    /// Appends the cell to the promotion queue unless it is already queued.
    pub(crate) fn enqueue(&mut self, cell: GridCoord) -> bool {
        if !self.queued.insert(cell) {
            return false;
        }
        self.queue.push_back(cell);
        true
    }

    /// Pops up to `budget` queued cells for one rhythmic step.
    pub(crate) fn take_step_batch(&mut self, budget: usize) -> Vec<GridCoord> {
        let mut batch = Vec::with_capacity(budget.min(self.queue.len()));
        while batch.len() < budget {
            let Some(cell) = self.queue.pop_front() else {
                break;
            };
            let _ = self.queued.remove(&cell);
            batch.push(cell);
        }
        batch
    }

    /// Drops the cell's queue entry, if any.
    pub(crate) fn dequeue(&mut self, cell: GridCoord) {
        if self.queued.remove(&cell) {
            self.queue.retain(|queued| *queued != cell);
        }
    }

    pub(crate) fn begin_settle(&mut self, cell: GridCoord, until: Duration) {
        let _ = self.settling.insert(cell, until);
    }

    pub(crate) fn cancel_settle(&mut self, cell: GridCoord) {
        let _ = self.settling.remove(&cell);
    }

    /// Removes and returns every cell whose settle delay elapsed.
    pub(crate) fn take_settled(&mut self, now: Duration) -> Vec<GridCoord> {
        let settled: Vec<GridCoord> = self
            .settling
            .iter()
            .filter(|(_, until)| **until <= now)
            .map(|(cell, _)| *cell)
            .collect();
        for cell in &settled {
            let _ = self.settling.remove(cell);
        }
        settled
    }

    /// Forgets every timer, queue entry and settle timer of the cell.
    pub(crate) fn forget(&mut self, cell: GridCoord) {
        let _ = self.cancel(cell);
        self.dequeue(cell);
        self.cancel_settle(cell);
    }

    pub(crate) fn clear(&mut self) {
        self.timers.clear();
        self.queue.clear();
        self.queued.clear();
        self.settling.clear();
    }

    pub(crate) fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn blocked_count(&self) -> usize {
        self.timers
            .values()
            .filter(|timer| matches!(timer, RegrowTimer::Blocked))
            .count()
    }

    pub(crate) fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn settling_count(&self) -> usize {
        self.settling.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: GridCoord = GridCoord::new(3, 4);

    #[test]
    fn request_without_refresh_keeps_existing_timer() {
        let mut scheduler = RegrowthScheduler::new();
        let first = Duration::from_millis(100);

        assert_eq!(
            scheduler.request(CELL, first, false),
            RequestOutcome::Scheduled
        );
        assert_eq!(
            scheduler.request(CELL, Duration::from_secs(9), false),
            RequestOutcome::AlreadyScheduled
        );
        assert_eq!(
            scheduler.timer(CELL),
            Some(RegrowTimer::Waiting { until: first })
        );
    }

    #[test]
    fn refresh_replaces_timer() {
        let mut scheduler = RegrowthScheduler::new();
        let _ = scheduler.request(CELL, Duration::from_millis(100), false);
        let later = Duration::from_millis(900);

        assert_eq!(
            scheduler.request(CELL, later, true),
            RequestOutcome::Refreshed
        );
        assert!(scheduler.take_due(Duration::from_millis(500)).is_empty());
        assert_eq!(scheduler.take_due(later), vec![CELL]);
        assert!(!scheduler.has_timer(CELL));
    }

    #[test]
    fn due_timers_come_out_earliest_first() {
        let mut scheduler = RegrowthScheduler::new();
        let late = GridCoord::new(0, 0);
        let early = GridCoord::new(9, 9);
        let _ = scheduler.request(late, Duration::from_millis(20), false);
        let _ = scheduler.request(early, Duration::from_millis(10), false);

        assert_eq!(
            scheduler.take_due(Duration::from_millis(30)),
            vec![early, late]
        );
    }

    #[test]
    fn blocked_timer_waits_for_wake() {
        let mut scheduler = RegrowthScheduler::new();
        scheduler.block(CELL);
        assert!(scheduler.take_due(Duration::from_secs(100)).is_empty());
        assert_eq!(scheduler.blocked_count(), 1);

        let now = Duration::from_secs(101);
        assert!(scheduler.wake(CELL, now));
        assert!(!scheduler.wake(CELL, now));
        assert_eq!(scheduler.take_due(now), vec![CELL]);
    }

    #[test]
    fn queue_deduplicates_and_respects_budget() {
        let mut scheduler = RegrowthScheduler::new();
        let cells: Vec<GridCoord> = (0..5).map(|column| GridCoord::new(column, 0)).collect();
        for cell in &cells {
            assert!(scheduler.enqueue(*cell));
        }
        assert!(!scheduler.enqueue(cells[0]));

        assert_eq!(scheduler.take_step_batch(2), cells[0..2].to_vec());
        assert_eq!(scheduler.take_step_batch(2), cells[2..4].to_vec());
        assert_eq!(scheduler.take_step_batch(2), cells[4..5].to_vec());
        assert!(scheduler.take_step_batch(2).is_empty());
    }

    #[test]
    fn forget_removes_queue_membership() {
        let mut scheduler = RegrowthScheduler::new();
        assert!(scheduler.enqueue(CELL));
        scheduler.begin_settle(CELL, Duration::ZERO);
        scheduler.forget(CELL);

        assert_eq!(scheduler.queued_count(), 0);
        assert_eq!(scheduler.settling_count(), 0);
        assert!(scheduler.enqueue(CELL));
    }
}
