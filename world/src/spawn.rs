//! Staggered spawn pass that materialises a generated layout over several ticks.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use dustfield_core::GridCoord;

use crate::batch::BatchToken;

/// Work queue of cells waiting to be spawned.
///
/// While cells remain the pass holds a composite batch open through its
/// token, so the collider is rebuilt once after the whole layout landed.
#[derive(Debug, Default)]
pub(crate) struct StaggeredSpawner {
    pending: VecDeque<GridCoord>,
    spawned: usize,
    token: Option<BatchToken>,
}

impl StaggeredSpawner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts a pass over `cells`, taking ownership of the batch token.
    ///
    /// Returns the token of a pass that was still running, which the caller
    /// must close.
    pub(crate) fn start(
        &mut self,
        cells: Vec<GridCoord>,
        token: BatchToken,
    ) -> Option<BatchToken> {
        let previous = self.cancel();
        self.pending = cells.into();
        self.spawned = 0;
        self.token = Some(token);
        previous
    }

    /// Abandons the running pass and hands back its batch token.
    pub(crate) fn cancel(&mut self) -> Option<BatchToken> {
        self.pending.clear();
        self.spawned = 0;
        self.token.take()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pop(&mut self) -> Option<GridCoord> {
        self.pending.pop_front()
    }

    pub(crate) fn record_spawn(&mut self) {
        self.spawned += 1;
    }

    /// Completes a drained pass, returning its token and spawn count.
    pub(crate) fn finish(&mut self) -> Option<(BatchToken, usize)> {
        if !self.pending.is_empty() {
            return None;
        }
        let token = self.token.take()?;
        Some((token, std::mem::take(&mut self.spawned)))
    }
}

/// Per-tick allowance limiting both the number of cells and wall-clock time.
#[derive(Debug)]
pub(crate) struct SpawnSlice {
    started: Instant,
    budget: Duration,
    remaining: usize,
    used: usize,
}

impl SpawnSlice {
    pub(crate) fn new(max_cells: usize, budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
            remaining: max_cells,
            used: 0,
        }
    }

    /// Claims room for one more cell. The first cell of a slice is always
    /// allowed so a pass cannot stall on a slow frame.
    pub(crate) fn allow(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        if self.used > 0 && self.started.elapsed() >= self.budget {
            return false;
        }
        self.remaining -= 1;
        self.used += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::CompositeBatcher;

    #[test]
    fn slice_caps_cell_count() {
        let mut slice = SpawnSlice::new(3, Duration::from_secs(60));
        assert!(slice.allow());
        assert!(slice.allow());
        assert!(slice.allow());
        assert!(!slice.allow());
    }

    #[test]
    fn exhausted_time_budget_still_allows_first_cell() {
        let mut slice = SpawnSlice::new(10, Duration::ZERO);
        assert!(slice.allow());
        assert!(!slice.allow());
    }

    #[test]
    fn drained_pass_returns_token_and_count() {
        let mut batcher = CompositeBatcher::new();
        let mut spawner = StaggeredSpawner::new();
        let previous = spawner.start(
            vec![GridCoord::new(0, 0), GridCoord::new(1, 0)],
            batcher.open_token(),
        );
        assert!(previous.is_none());
        assert!(spawner.finish().is_none());

        while spawner.pop().is_some() {
            spawner.record_spawn();
        }
        let (token, spawned) = spawner.finish().expect("pass drained");
        assert_eq!(spawned, 2);
        batcher.close_token(token);
        assert!(!batcher.is_open());
        assert!(!spawner.is_running());
    }

    #[test]
    fn restarting_hands_back_running_token() {
        let mut batcher = CompositeBatcher::new();
        let mut spawner = StaggeredSpawner::new();
        let _ = spawner.start(vec![GridCoord::new(0, 0)], batcher.open_token());
        let previous = spawner.start(vec![GridCoord::new(1, 0)], batcher.open_token());

        let previous = previous.expect("running pass token");
        batcher.close_token(previous);
        assert!(batcher.is_open());
        assert_eq!(spawner.pending(), 1);
    }
}
