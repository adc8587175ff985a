//! Coalesces grid mutations into debounced composite collider rebuilds.

use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use dustfield_core::RowSpan;

use crate::World;

/// Dirty flag, nestable batch depth and the last rebuilt shape.
#[derive(Debug, Default)]
pub(crate) struct CompositeBatcher {
    dirty: bool,
    depth: u32,
    last_rebuild: Option<Duration>,
    spans: Vec<RowSpan>,
    rebuilds: u64,
}

impl CompositeBatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn open(&mut self) {
        self.depth = self.depth.saturating_add(1);
        tracing::debug!(depth = self.depth, "composite batch opened");
    }

    pub(crate) fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        tracing::debug!(depth = self.depth, dirty = self.dirty, "composite batch closed");
    }

    /// Opens a batch owned by a pass that spans several ticks.
    pub(crate) fn open_token(&mut self) -> BatchToken {
        self.open();
        BatchToken { _private: () }
    }

    /// Closes the batch opened for `token`.
    pub(crate) fn close_token(&mut self, token: BatchToken) {
        let BatchToken { .. } = token;
        self.close();
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// Whether a rebuild may run at `now`.
    pub(crate) fn should_rebuild(&self, now: Duration, debounce: Duration) -> bool {
        if !self.dirty || self.is_open() {
            return false;
        }
        self.last_rebuild
            .map_or(true, |last| now.saturating_sub(last) >= debounce)
    }

    pub(crate) fn finish_rebuild(&mut self, spans: Vec<RowSpan>, now: Duration) {
        self.spans = spans;
        self.dirty = false;
        self.last_rebuild = Some(now);
        self.rebuilds = self.rebuilds.saturating_add(1);
    }

    pub(crate) fn spans(&self) -> &[RowSpan] {
        &self.spans
    }

    pub(crate) const fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

/// Proof that a multi-tick pass holds a composite batch open.
///
/// Tokens cannot be cloned, so each open batch is closed exactly once.
#[derive(Debug)]
pub(crate) struct BatchToken {
    _private: (),
}

/// Keeps a composite batch open for as long as it lives.
///
/// Dereferences to the [`World`], so commands can be applied through the
/// guard; the batch closes when the guard drops.
#[derive(Debug)]
pub struct BatchGuard<'a> {
    world: &'a mut World,
}

impl<'a> BatchGuard<'a> {
    pub(crate) fn new(world: &'a mut World) -> Self {
        world.batcher.open();
        Self { world }
    }
}

impl Deref for BatchGuard<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

impl DerefMut for BatchGuard<'_> {
    fn deref_mut(&mut self) -> &mut World {
        self.world
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.world.batcher.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(50);

    #[test]
    fn clean_batcher_never_rebuilds() {
        let batcher = CompositeBatcher::new();
        assert!(!batcher.should_rebuild(Duration::from_secs(1), DEBOUNCE));
    }

    #[test]
    fn open_batch_defers_rebuild_until_outermost_close() {
        let mut batcher = CompositeBatcher::new();
        batcher.open();
        batcher.open();
        batcher.mark_dirty();
        assert!(!batcher.should_rebuild(Duration::ZERO, DEBOUNCE));

        batcher.close();
        assert!(!batcher.should_rebuild(Duration::ZERO, DEBOUNCE));

        batcher.close();
        assert!(batcher.should_rebuild(Duration::ZERO, DEBOUNCE));
    }

    #[test]
    fn debounce_spaces_rebuilds() {
        let mut batcher = CompositeBatcher::new();
        batcher.mark_dirty();
        batcher.finish_rebuild(Vec::new(), Duration::from_millis(100));

        batcher.mark_dirty();
        assert!(!batcher.should_rebuild(Duration::from_millis(120), DEBOUNCE));
        assert!(batcher.should_rebuild(Duration::from_millis(150), DEBOUNCE));
    }

    #[test]
    fn zero_debounce_rebuilds_every_tick() {
        let mut batcher = CompositeBatcher::new();
        batcher.mark_dirty();
        batcher.finish_rebuild(Vec::new(), Duration::from_millis(10));
        batcher.mark_dirty();
        assert!(batcher.should_rebuild(Duration::from_millis(10), Duration::ZERO));
    }

    #[test]
    fn token_holds_batch_open() {
        let mut batcher = CompositeBatcher::new();
        let token = batcher.open_token();
        batcher.mark_dirty();
        assert!(batcher.is_open());

        batcher.close_token(token);
        assert!(!batcher.is_open());
        assert!(batcher.is_dirty());
    }
}
