#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative terrain state for Dustfield.
//!
//! The [`World`] owns the cell grid, the regrowth scheduler, keep-clear
//! footprints and the composite collider batcher. Hosts mutate it only by
//! submitting [`Command`] values through [`apply`]; every observable change is
//! reported back as an [`Event`]. Read access goes through the [`query`]
//! module.

mod batch;
mod diffusion;
mod exclusion;
mod flow;
mod grid;
mod regrowth;
mod spawn;
mod tunnel;

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    time::Duration,
};

use dustfield_core::{
    hex, CellState, Command, Event, GridCoord, GridDimensions, Imprint, OverlapTag, OwnerId,
    Phase, TerrainConfig, TerrainHost, VisualHandle, WorldRect,
};
use dustfield_system_patterns::{derive_generation_seed, PatternContext, PatternPlan};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

pub use batch::BatchGuard;

use batch::CompositeBatcher;
use diffusion::{DiffusionParams, TintDiffusion};
use exclusion::{ExclusionMap, FootprintDelta};
use flow::FlowField;
use grid::CellGrid;
use regrowth::{RegrowVeto, RegrowthScheduler};
use spawn::{SpawnSlice, StaggeredSpawner};
use tunnel::{dig_tunnel, TunnelOutcome};

/// Represents the authoritative Dustfield terrain state.
#[derive(Debug)]
pub struct World {
    config: TerrainConfig,
    grid: CellGrid,
    exclusion: ExclusionMap,
    regrowth: RegrowthScheduler,
    batcher: CompositeBatcher,
    flow: FlowField,
    diffusion: TintDiffusion,
    spawner: StaggeredSpawner,
    imprints: HashMap<GridCoord, Imprint>,
    permanent_clear: HashSet<GridCoord>,
    holds: HashMap<GridCoord, Duration>,
    clock: Duration,
    last_step: Option<u64>,
    generation: u64,
    next_visual: u32,
}

impl World {
    /// Creates an empty world; the grid is sized from the host on first use.
    ///
    /// Out-of-range settings are clamped to the nearest usable value rather
    /// than rejected; hosts that want a hard failure call
    /// [`TerrainConfig::validate`] first.
    #[must_use]
    pub fn new(config: TerrainConfig) -> Self {
        if let Err(error) = config.validate() {
            warn!(%error, "terrain config out of range, clamping");
        }
        let config = config.clamped();
        let dimensions = GridDimensions::default();
        Self {
            grid: CellGrid::new(dimensions, config.default_tint),
            exclusion: ExclusionMap::new(),
            regrowth: RegrowthScheduler::new(),
            batcher: CompositeBatcher::new(),
            flow: FlowField::new(dimensions),
            diffusion: TintDiffusion::new(),
            spawner: StaggeredSpawner::new(),
            imprints: HashMap::new(),
            permanent_clear: HashSet::new(),
            holds: HashMap::new(),
            clock: Duration::ZERO,
            last_step: None,
            generation: 0,
            next_visual: 0,
            config,
        }
    }

    /// Opens a composite batch that stays open until the guard drops.
    ///
    /// Commands applied through the guard never trigger a collider rebuild;
    /// the first physics tick after the outermost batch closes rebuilds once.
    pub fn begin_batch(&mut self) -> BatchGuard<'_> {
        BatchGuard::new(self)
    }

    fn allocate_visual(&mut self) -> VisualHandle {
        let visual = VisualHandle::new(self.next_visual);
        self.next_visual = self.next_visual.wrapping_add(1);
        visual
    }

    fn is_held(&self, cell: GridCoord) -> bool {
        self.holds.get(&cell).map_or(false, |until| *until > self.clock)
    }

    fn sync_dimensions<H>(&mut self, host: &H, out_events: &mut Vec<Event>) -> bool
    where
        H: TerrainHost + ?Sized,
    {
        let dimensions = host.dimensions();
        if dimensions != self.grid.dimensions() {
            self.retire_all(out_events);
            self.grid = CellGrid::new(dimensions, self.config.default_tint);
            self.flow = FlowField::new(dimensions);
            info!(
                columns = dimensions.columns(),
                rows = dimensions.rows(),
                "terrain grid resized"
            );
            out_events.push(Event::GridResized { dimensions });
        }
        !dimensions.is_empty()
    }

    /// Empties every cell and forgets all schedules, imprints and reservations.
    fn retire_all(&mut self, out_events: &mut Vec<Event>) {
        let retired = self.grid.reset();
        if !retired.is_empty() {
            self.batcher.mark_dirty();
        }
        for (cell, _, visual) in retired {
            out_events.push(Event::CellRetired { cell, visual });
        }

        self.regrowth.clear();
        self.imprints.clear();
        self.permanent_clear.clear();
        self.holds.clear();
        self.diffusion.clear();
        if let Some(token) = self.spawner.cancel() {
            self.batcher.close_token(token);
        }
    }

    fn regrow_veto<H>(&self, host: &H, cell: GridCoord) -> Option<RegrowVeto>
    where
        H: TerrainHost + ?Sized,
    {
        if self.permanent_clear.contains(&cell) {
            return Some(RegrowVeto::PermanentClear);
        }
        if self.grid.is_solid(cell) {
            return Some(RegrowVeto::AlreadySolid);
        }
        if self.exclusion.is_keep_clear(cell) {
            return Some(RegrowVeto::KeepClear);
        }
        if host.is_claimed(cell) {
            return Some(RegrowVeto::Claimed);
        }
        if !host.is_cell_free(cell) {
            return Some(RegrowVeto::NotFree);
        }
        if self.is_held(cell) {
            return Some(RegrowVeto::Held);
        }
        if self.grid.state(cell) == Some(CellState::Clearing) {
            return Some(RegrowVeto::StillClearing);
        }

        let mut tags = Vec::new();
        let bounds = WorldRect::from_center(host.cell_to_world(cell), host.cell_extent());
        host.overlaps(bounds, &mut tags);
        if tags.contains(&OverlapTag::Vehicle) {
            return Some(RegrowVeto::VehicleOverlap);
        }
        if tags.contains(&OverlapTag::Collectable) {
            return Some(RegrowVeto::CollectableOverlap);
        }
        None
    }

    fn tick<H>(&mut self, host: &H, out_events: &mut Vec<Event>)
    where
        H: TerrainHost + ?Sized,
    {
        let now = self.clock;
        self.holds.retain(|_, until| *until > now);

        self.run_due_timers(host, out_events);

        let step = host.current_step();
        match self.last_step {
            Some(last) if last == step => {}
            Some(_) => {
                self.last_step = Some(step);
                self.promote_queued(host, out_events);
            }
            None => self.last_step = Some(step),
        }

        self.settle(host, out_events);
        self.run_spawn_slice(host, out_events);

        let grid = &self.grid;
        self.flow.advance(
            self.config.flow_cells_per_tick,
            self.config.flow_smoothing,
            |cell| !grid.is_solid(cell),
        );

        let params = DiffusionParams {
            budget: self.config.diffusion_cells_per_tick,
            rate: self.config.diffusion_rate,
            min_delta: self.config.diffusion_min_delta,
            default_tint: self.config.default_tint,
        };
        self.diffusion
            .step(&mut self.grid, &self.imprints, params, out_events);
    }

    fn run_due_timers<H>(&mut self, host: &H, out_events: &mut Vec<Event>)
    where
        H: TerrainHost + ?Sized,
    {
        let now = self.clock;
        for cell in self.regrowth.take_due(now) {
            match self.grid.state(cell) {
                None | Some(CellState::PendingRegrow) | Some(CellState::Regrowing) => {
                    trace!(?cell, "regrow timer abandoned for in-flight cell");
                    continue;
                }
                Some(_) => {}
            }

            match self.regrow_veto(host, cell) {
                Some(RegrowVeto::PermanentClear) | Some(RegrowVeto::AlreadySolid) => {
                    trace!(?cell, "regrow abandoned");
                }
                Some(RegrowVeto::KeepClear) => {
                    trace!(?cell, "regrow blocked by keep-clear");
                    self.regrowth.block(cell);
                }
                Some(veto) => {
                    trace!(?cell, ?veto, "regrow backing off");
                    self.regrowth
                        .retry(cell, now.saturating_add(self.config.regrow_backoff()));
                }
                None => {
                    let _ = self.grid.transition(cell, CellState::PendingRegrow);
                    let _ = self.regrowth.enqueue(cell);
                    out_events.push(Event::RegrowEligible { cell });
                }
            }
        }
    }

    fn promote_queued<H>(&mut self, host: &H, out_events: &mut Vec<Event>)
    where
        H: TerrainHost + ?Sized,
    {
        let batch = self
            .regrowth
            .take_step_batch(self.config.regrow_cells_per_step);
        let mut deferred = Vec::new();

        for cell in batch {
            if self.grid.state(cell) != Some(CellState::PendingRegrow) {
                trace!(?cell, "dropping stale regrow entry");
                continue;
            }

            match self.regrow_veto(host, cell) {
                Some(RegrowVeto::PermanentClear) => self.retire(cell, out_events),
                Some(veto) => {
                    trace!(?cell, ?veto, "promotion deferred");
                    deferred.push(cell);
                }
                None => self.begin_regrow(cell, out_events),
            }
        }

        for cell in deferred {
            let _ = self.regrowth.enqueue(cell);
        }
    }

    fn begin_regrow(&mut self, cell: GridCoord, out_events: &mut Vec<Event>) {
        let visual = match self.grid.visual(cell) {
            Some(visual) => visual,
            None => {
                let visual = self.allocate_visual();
                self.grid.set_visual(cell, Some(visual));
                visual
            }
        };

        let _ = self.grid.transition(cell, CellState::Regrowing);
        self.regrowth
            .begin_settle(cell, self.clock.saturating_add(self.config.settle_delay()));
        out_events.push(Event::CellRegrowing {
            cell,
            visual,
            grow_in: self.config.grow_in(),
            imprint: self.imprints.get(&cell).copied(),
        });
    }

    fn settle<H>(&mut self, host: &H, out_events: &mut Vec<Event>)
    where
        H: TerrainHost + ?Sized,
    {
        for cell in self.regrowth.take_settled(self.clock) {
            if self.grid.state(cell) != Some(CellState::Regrowing) {
                continue;
            }

            match self.regrow_veto(host, cell) {
                Some(RegrowVeto::PermanentClear) => self.retire(cell, out_events),
                Some(veto) => {
                    trace!(?cell, ?veto, "regrowing cell sent back to pending");
                    let _ = self.grid.transition(cell, CellState::PendingRegrow);
                    let _ = self.regrowth.enqueue(cell);
                    out_events.push(Event::RegrowDeferred {
                        cell,
                        visual: self.grid.visual(cell),
                    });
                }
                None => self.solidify(cell, out_events),
            }
        }
    }

    fn solidify(&mut self, cell: GridCoord, out_events: &mut Vec<Event>) {
        let visual = match self.grid.visual(cell) {
            Some(visual) => visual,
            None => {
                let visual = self.allocate_visual();
                self.grid.set_visual(cell, Some(visual));
                visual
            }
        };

        let default_tint = self.config.default_tint;
        let tint = self.imprints.remove(&cell).map_or(default_tint, |imprint| {
            default_tint.lerp(imprint.tint, imprint.hardness())
        });

        let _ = self.grid.transition(cell, CellState::Solid);
        self.grid.set_tint(cell, tint);
        self.batcher.mark_dirty();
        self.diffusion.enqueue_around(cell);
        out_events.push(Event::CellSolidified { cell, visual });
    }

    /// Empties the cell outright and discards its visual.
    fn retire(&mut self, cell: GridCoord, out_events: &mut Vec<Event>) {
        let visual = self.grid.visual(cell);
        self.grid.set_visual(cell, None);
        self.regrowth.forget(cell);
        if self.grid.transition(cell, CellState::Empty) == Some(CellState::Solid) {
            self.batcher.mark_dirty();
        }
        out_events.push(Event::CellRetired { cell, visual });
    }

    /// Starts clearing whatever terrain the cell holds. Returns whether
    /// anything was cleared.
    fn clear_cell(&mut self, cell: GridCoord, fade: Duration, out_events: &mut Vec<Event>) -> bool {
        match self.grid.state(cell) {
            Some(CellState::Solid) => {
                let _ = self.grid.transition(cell, CellState::Clearing);
                self.batcher.mark_dirty();
                out_events.push(Event::CellClearing {
                    cell,
                    visual: self.grid.visual(cell),
                    fade,
                });
                true
            }
            Some(CellState::Regrowing) => {
                self.regrowth.cancel_settle(cell);
                let _ = self.grid.transition(cell, CellState::Clearing);
                out_events.push(Event::CellClearing {
                    cell,
                    visual: self.grid.visual(cell),
                    fade,
                });
                true
            }
            Some(CellState::PendingRegrow) => {
                self.regrowth.dequeue(cell);
                let _ = self.grid.transition(cell, CellState::Empty);
                out_events.push(Event::CellEmptied { cell });
                true
            }
            Some(CellState::Clearing) | Some(CellState::Empty) | None => false,
        }
    }

    fn request_regrow<H>(&mut self, host: &H, cell: GridCoord, delay: Option<Duration>, refresh: bool)
    where
        H: TerrainHost + ?Sized,
    {
        if !self.grid.dimensions().contains(cell) {
            let _ = self.regrowth.cancel(cell);
            return;
        }

        let delay = delay
            .or_else(|| self.imprints.get(&cell).and_then(|imprint| imprint.regrow_delay))
            .unwrap_or_else(|| self.config.regrow_delay(host.loop_duration()));
        let outcome = self
            .regrowth
            .request(cell, self.clock.saturating_add(delay), refresh);
        trace!(?cell, ?delay, ?outcome, "regrow requested");
    }

    fn carve<H>(
        &mut self,
        host: &H,
        center: GridCoord,
        radius: u32,
        fade: Duration,
        imprint: Option<Imprint>,
        out_events: &mut Vec<Event>,
    ) where
        H: TerrainHost + ?Sized,
    {
        let dimensions = self.grid.dimensions();
        let region: Vec<GridCoord> = hex::disk(center, self.bounded_radius(radius))
            .into_iter()
            .filter(|cell| dimensions.contains(*cell))
            .collect();
        if region.is_empty() {
            return;
        }

        let mut cleared = 0;
        for &cell in &region {
            if let Some(imprint) = imprint {
                let _ = self.imprints.insert(cell, imprint);
            }
            if cleared < self.config.carve_budget && self.clear_cell(cell, fade, out_events) {
                cleared += 1;
            }
        }

        for &cell in &region {
            self.request_regrow(host, cell, None, true);
        }
        debug!(?center, radius, cleared, "carved terrain");
    }

    fn finish_fade(&mut self, cell: GridCoord, out_events: &mut Vec<Event>) {
        if self.grid.state(cell) != Some(CellState::Clearing) {
            trace!(?cell, "ignoring stale fade report");
            return;
        }
        let _ = self.grid.transition(cell, CellState::Empty);
        out_events.push(Event::CellEmptied { cell });
    }

    /// Caps a disk radius at the grid extent; larger disks add no in-bounds cells.
    fn bounded_radius(&self, radius: u32) -> u32 {
        let dimensions = self.grid.dimensions();
        radius.min(dimensions.columns().saturating_add(dimensions.rows()))
    }

    fn footprint_cells<H>(&self, host: &H, position: Vec2, radius: u32) -> BTreeSet<GridCoord>
    where
        H: TerrainHost + ?Sized,
    {
        let dimensions = self.grid.dimensions();
        hex::disk(host.world_to_cell(position), self.bounded_radius(radius))
            .into_iter()
            .filter(|cell| dimensions.contains(*cell))
            .collect()
    }

    fn apply_footprint_delta<H>(
        &mut self,
        host: &H,
        owner: Option<OwnerId>,
        delta: FootprintDelta,
        force_remove: bool,
        refresh: bool,
        out_events: &mut Vec<Event>,
    ) where
        H: TerrainHost + ?Sized,
    {
        if delta.is_empty() {
            return;
        }

        if force_remove {
            let fade = self.config.forced_clear_fade();
            for &cell in &delta.claimed {
                if self.clear_cell(cell, fade, out_events) {
                    self.request_regrow(host, cell, None, false);
                }
            }
        }

        if refresh {
            for &cell in delta.released.iter().chain(&delta.claimed) {
                if self.regrowth.has_timer(cell) {
                    self.request_regrow(host, cell, None, true);
                }
            }
        }

        let now = self.clock;
        for &cell in &delta.released {
            if self.exclusion.is_keep_clear(cell) {
                continue;
            }
            if self.regrowth.wake(cell, now) {
                trace!(?cell, "woke blocked regrow");
            }
            if matches!(
                self.grid.state(cell),
                Some(CellState::Empty) | Some(CellState::Clearing)
            ) {
                self.request_regrow(host, cell, None, false);
            }
        }

        out_events.push(Event::KeepClearChanged {
            owner,
            released: delta.released,
            claimed: delta.claimed,
        });
    }

    fn hold_cell(&mut self, cell: GridCoord, duration: Duration) {
        if !self.grid.dimensions().contains(cell) {
            return;
        }
        let until = self.clock.saturating_add(duration);
        let entry = self.holds.entry(cell).or_insert(until);
        *entry = (*entry).max(until);
    }

    fn adopt_visual(&mut self, cell: GridCoord, visual: VisualHandle, out_events: &mut Vec<Event>) {
        if self.grid.state(cell) != Some(CellState::Empty) {
            trace!(?cell, "ignoring adoption of occupied cell");
            return;
        }

        self.regrowth.forget(cell);
        let _ = self.grid.transition(cell, CellState::Solid);
        self.grid.set_visual(cell, Some(visual));
        self.grid.set_tint(cell, self.config.default_tint);
        self.next_visual = self.next_visual.max(visual.get().wrapping_add(1));
        self.batcher.mark_dirty();
        out_events.push(Event::CellSolidified { cell, visual });
    }

    fn physics_tick(&mut self, out_events: &mut Vec<Event>) {
        if !self
            .batcher
            .should_rebuild(self.clock, self.config.composite_debounce())
        {
            return;
        }

        let spans = self.grid.row_spans();
        let span_count = spans.len();
        let solid_cells = self.grid.solid_count();
        self.batcher.finish_rebuild(spans, self.clock);
        debug!(spans = span_count, solid_cells, "composite rebuilt");
        out_events.push(Event::CompositeRebuilt {
            spans: span_count,
            solid_cells,
        });
    }

    fn generate_maze<H>(
        &mut self,
        host: &H,
        phase: Phase,
        anchors: &[GridCoord],
        out_events: &mut Vec<Event>,
    ) where
        H: TerrainHost + ?Sized,
    {
        self.retire_all(out_events);

        let dimensions = self.grid.dimensions();
        self.generation = self.generation.wrapping_add(1);
        let seed = derive_generation_seed(self.config.seed, self.generation, phase);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let anchors: Vec<GridCoord> = anchors
            .iter()
            .copied()
            .filter(|anchor| dimensions.contains(*anchor))
            .collect();
        let anchor_radius = self.bounded_radius(self.config.anchor_clear_radius);
        for anchor in &anchors {
            for cell in hex::disk(*anchor, anchor_radius) {
                if dimensions.contains(cell) {
                    let _ = self.permanent_clear.insert(cell);
                }
            }
        }

        let plan = PatternPlan::for_phase(phase, dimensions);
        let placements = {
            let restrict = plan.restrict_to_screen();
            let permanent_clear = &self.permanent_clear;
            let exclusion = &self.exclusion;
            let flow = &self.flow;
            let is_free = |cell: GridCoord| host.is_cell_free(cell);
            let to_world = |cell: GridCoord| host.cell_to_world(cell);
            let exclude = |cell: GridCoord| {
                permanent_clear.contains(&cell)
                    || exclusion.is_keep_clear(cell)
                    || (restrict && !host.is_on_screen(cell))
            };
            let flow_bias = |cell: GridCoord| flow.vector_at(cell);
            let context = PatternContext::new(dimensions, &is_free, &to_world)
                .with_exclusion(&exclude)
                .with_flow_bias(&flow_bias);
            plan.generate(&context, &mut rng)
        };

        let mut layout: BTreeSet<GridCoord> =
            placements.into_iter().map(|placement| placement.cell).collect();
        if layout.is_empty() {
            warn!(?phase, pattern = ?plan.kind(), "pattern produced no terrain");
        }

        let mut corridors = 0;
        for pair in anchors.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let tunnel = {
                let layout = &layout;
                dig_tunnel(
                    from,
                    to,
                    self.config.tunnel_step_limit,
                    |cell| dimensions.contains(cell) && host.is_cell_free(cell),
                    |cell| layout.contains(&cell),
                )
            };

            for cell in &tunnel.cells {
                if layout.remove(cell) {
                    corridors += 1;
                }
                let _ = self.permanent_clear.insert(*cell);
            }

            if tunnel.outcome != TunnelOutcome::Reached {
                let reached = tunnel.last().unwrap_or(from);
                warn!(?from, ?to, ?reached, outcome = ?tunnel.outcome, "tunnel aborted");
                out_events.push(Event::TunnelAborted { from, to, reached });
            }
        }

        let queue: Vec<GridCoord> = layout
            .into_iter()
            .filter(|cell| {
                !self.permanent_clear.contains(cell) && !self.exclusion.is_keep_clear(*cell)
            })
            .collect();
        let walls = queue.len();

        info!(
            ?phase,
            pattern = ?plan.kind(),
            generation = self.generation,
            walls,
            corridors,
            "maze generated"
        );
        out_events.push(Event::MazeGenerated {
            phase,
            pattern: plan.kind(),
            walls,
            corridors,
        });

        if queue.is_empty() {
            out_events.push(Event::SpawnPassCompleted { spawned: 0 });
            return;
        }
        let token = self.batcher.open_token();
        if let Some(previous) = self.spawner.start(queue, token) {
            self.batcher.close_token(previous);
        }
    }

    fn run_spawn_slice<H>(&mut self, host: &H, out_events: &mut Vec<Event>)
    where
        H: TerrainHost + ?Sized,
    {
        if !self.spawner.is_running() {
            return;
        }

        let mut slice = SpawnSlice::new(
            self.config.spawn_cells_per_tick,
            self.config.spawn_budget(),
        );
        while slice.allow() {
            let Some(cell) = self.spawner.pop() else {
                break;
            };
            if self.spawn_cell(host, cell, out_events) {
                self.spawner.record_spawn();
            }
        }

        if let Some((token, spawned)) = self.spawner.finish() {
            self.batcher.close_token(token);
            debug!(spawned, "spawn pass completed");
            out_events.push(Event::SpawnPassCompleted { spawned });
        }
    }

    fn spawn_cell<H>(&mut self, host: &H, cell: GridCoord, out_events: &mut Vec<Event>) -> bool
    where
        H: TerrainHost + ?Sized,
    {
        let blocked = self.grid.state(cell) != Some(CellState::Empty)
            || self.permanent_clear.contains(&cell)
            || self.exclusion.is_keep_clear(cell)
            || host.is_claimed(cell)
            || !host.is_cell_free(cell);
        if blocked {
            trace!(?cell, "skipping spawn");
            return false;
        }

        let visual = self.allocate_visual();
        let _ = self.grid.transition(cell, CellState::Solid);
        self.grid.set_visual(cell, Some(visual));
        self.grid.set_tint(cell, self.config.default_tint);
        self.batcher.mark_dirty();
        out_events.push(Event::CellSpawned {
            cell,
            visual,
            grow_in: self.config.grow_in(),
        });
        true
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(TerrainConfig::default())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// The grid is re-sized lazily from `host` before every command; while the
/// host reports an empty grid, commands other than the clock advance are
/// ignored.
pub fn apply<H>(world: &mut World, host: &H, command: Command, out_events: &mut Vec<Event>)
where
    H: TerrainHost + ?Sized,
{
    if let Command::Tick { dt } = command {
        world.clock = world.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });
    }

    if !world.sync_dimensions(host, out_events) {
        return;
    }

    match command {
        Command::Tick { .. } => world.tick(host, out_events),
        Command::PhysicsTick => world.physics_tick(out_events),
        Command::GenerateMaze { phase, anchors } => {
            world.generate_maze(host, phase, &anchors, out_events);
        }
        Command::Carve {
            center,
            radius,
            fade,
            imprint,
        } => world.carve(host, center, radius, fade, imprint, out_events),
        Command::RequestRegrow {
            cell,
            delay,
            refresh,
        } => world.request_regrow(host, cell, delay, refresh),
        Command::FadeFinished { cell } => world.finish_fade(cell, out_events),
        Command::UpdateVehicleFootprint {
            owner,
            position,
            radius,
            force_remove,
        } => {
            let next = world.footprint_cells(host, position, radius);
            let delta = world.exclusion.update_vehicle_footprint(owner, next);
            world.apply_footprint_delta(host, Some(owner), delta, force_remove, false, out_events);
        }
        Command::ReleaseVehicleFootprint { owner } => {
            let released = world.exclusion.release_vehicle_footprint(owner);
            let delta = FootprintDelta {
                released,
                claimed: Vec::new(),
            };
            world.apply_footprint_delta(host, Some(owner), delta, false, false, out_events);
        }
        Command::UpdateStarPocket {
            position,
            radius,
            force_remove,
            refresh,
        } => {
            let next = world.footprint_cells(host, position, radius);
            let delta = world.exclusion.update_star_pocket(next);
            world.apply_footprint_delta(host, None, delta, force_remove, refresh, out_events);
        }
        Command::ReleaseStarPocket => {
            let released = world.exclusion.release_star_pocket();
            let delta = FootprintDelta {
                released,
                claimed: Vec::new(),
            };
            world.apply_footprint_delta(host, None, delta, false, false, out_events);
        }
        Command::HoldCell { cell, duration } => world.hold_cell(cell, duration),
        Command::AdoptVisual { cell, visual } => world.adopt_visual(cell, visual, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use dustfield_core::{
        CellState, GridCoord, GridDimensions, Imprint, RowSpan, TerrainConfig, Tint, VisualHandle,
    };
    use glam::Vec2;

    use super::{regrowth::RegrowTimer, World};

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &TerrainConfig {
        &world.config
    }

    /// Dimensions of the current grid; empty until the host sized it.
    #[must_use]
    pub fn dimensions(world: &World) -> GridDimensions {
        world.grid.dimensions()
    }

    /// Lifecycle state of the cell, or `None` outside the grid.
    #[must_use]
    pub fn cell_state(world: &World, cell: GridCoord) -> Option<CellState> {
        world.grid.state(cell)
    }

    /// Reports whether the cell holds colliding terrain.
    #[must_use]
    pub fn is_solid(world: &World, cell: GridCoord) -> bool {
        world.grid.is_solid(cell)
    }

    /// Reports whether the cell belongs to an anchor disk or tunnel.
    #[must_use]
    pub fn is_permanently_clear(world: &World, cell: GridCoord) -> bool {
        world.permanent_clear.contains(&cell)
    }

    /// Reports whether a vehicle footprint or the protected pocket covers the cell.
    #[must_use]
    pub fn is_keep_clear(world: &World, cell: GridCoord) -> bool {
        world.exclusion.is_keep_clear(cell)
    }

    /// Reports whether the protected pocket covers the cell.
    #[must_use]
    pub fn is_in_star_pocket(world: &World, cell: GridCoord) -> bool {
        world.exclusion.in_pocket(cell)
    }

    /// Number of vehicle footprints covering the cell.
    #[must_use]
    pub fn vehicle_refcount(world: &World, cell: GridCoord) -> u32 {
        world.exclusion.vehicle_refcount(cell)
    }

    /// Reports whether a temporary hold keeps the cell open.
    #[must_use]
    pub fn is_held(world: &World, cell: GridCoord) -> bool {
        world.is_held(cell)
    }

    /// Reports whether gameplay may treat the cell as passable.
    ///
    /// A cell is open when it holds no colliding terrain, when it is excluded
    /// (permanently clear or keep-clear) or when a temporary hold covers it.
    #[must_use]
    pub fn is_effectively_open(world: &World, cell: GridCoord) -> bool {
        if !world.grid.dimensions().contains(cell) {
            return false;
        }
        !world.grid.is_solid(cell)
            || world.permanent_clear.contains(&cell)
            || world.exclusion.is_keep_clear(cell)
            || world.is_held(cell)
    }

    /// Visual currently associated with the cell.
    #[must_use]
    pub fn visual(world: &World, cell: GridCoord) -> Option<VisualHandle> {
        world.grid.visual(cell)
    }

    /// Tint of the cell's terrain.
    #[must_use]
    pub fn tint(world: &World, cell: GridCoord) -> Option<Tint> {
        world.grid.tint(cell)
    }

    /// Imprint waiting for the cell's regrowth.
    #[must_use]
    pub fn imprint(world: &World, cell: GridCoord) -> Option<Imprint> {
        world.imprints.get(&cell).copied()
    }

    /// Flow direction stored for the cell.
    #[must_use]
    pub fn flow(world: &World, cell: GridCoord) -> Vec2 {
        world.flow.vector_at(cell)
    }

    /// Reports whether a regrow timer is pending for the cell.
    #[must_use]
    pub fn has_regrow_timer(world: &World, cell: GridCoord) -> bool {
        world.regrowth.has_timer(cell)
    }

    /// Reports whether the cell's regrow timer waits for a keep-clear release.
    #[must_use]
    pub fn is_regrow_blocked(world: &World, cell: GridCoord) -> bool {
        world.regrowth.timer(cell) == Some(RegrowTimer::Blocked)
    }

    /// Counters describing the regrowth scheduler.
    #[must_use]
    pub fn regrowth_view(world: &World) -> RegrowthView {
        RegrowthView {
            timers: world.regrowth.timer_count(),
            blocked: world.regrowth.blocked_count(),
            queued: world.regrowth.queued_count(),
            settling: world.regrowth.settling_count(),
        }
    }

    /// Solid cells in row-major order.
    #[must_use]
    pub fn solid_cells(world: &World) -> Vec<GridCoord> {
        world.grid.solid_cells()
    }

    /// Number of cells currently in `state`.
    #[must_use]
    pub fn count_cells(world: &World, state: CellState) -> usize {
        world.grid.count_state(state)
    }

    /// Reports whether the solid index matches the cell records exactly.
    #[must_use]
    pub fn is_index_consistent(world: &World) -> bool {
        world.grid.is_index_consistent()
    }

    /// Row spans of the most recently rebuilt composite collider.
    #[must_use]
    pub fn composite_spans(world: &World) -> &[RowSpan] {
        world.batcher.spans()
    }

    /// Number of composite rebuilds performed so far.
    #[must_use]
    pub fn composite_rebuilds(world: &World) -> u64 {
        world.batcher.rebuilds()
    }

    /// Reports whether a composite rebuild is pending.
    #[must_use]
    pub fn is_composite_dirty(world: &World) -> bool {
        world.batcher.is_dirty()
    }

    /// Reports whether any composite batch is open.
    #[must_use]
    pub fn is_batch_open(world: &World) -> bool {
        world.batcher.is_open()
    }

    /// Reports whether a staggered spawn pass is running.
    #[must_use]
    pub fn is_spawning(world: &World) -> bool {
        world.spawner.is_running()
    }

    /// Cells still waiting in the staggered spawn pass.
    #[must_use]
    pub fn pending_spawns(world: &World) -> usize {
        world.spawner.pending()
    }

    /// Cells waiting for tint diffusion.
    #[must_use]
    pub fn pending_tints(world: &World) -> usize {
        world.diffusion.len()
    }

    /// Simulation time accumulated from frame ticks.
    #[must_use]
    pub fn simulation_time(world: &World) -> Duration {
        world.clock
    }

    /// Number of maze generations performed so far.
    #[must_use]
    pub fn generation(world: &World) -> u64 {
        world.generation
    }

    /// Snapshot of the regrowth scheduler's counters.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RegrowthView {
        /// Cells with a running or blocked delay timer.
        pub timers: usize,
        /// Timers waiting for a keep-clear release.
        pub blocked: usize,
        /// Cells waiting for a rhythmic step.
        pub queued: usize,
        /// Cells growing in before they turn solid.
        pub settling: usize,
    }
}

#[cfg(test)]
mod tests {
    use dustfield_core::HeadlessHost;

    use super::*;

    fn sized_world() -> (World, HeadlessHost) {
        let mut world = World::default();
        let host = HeadlessHost::new(6, 6);
        let mut events = Vec::new();
        apply(&mut world, &host, Command::PhysicsTick, &mut events);
        (world, host)
    }

    #[test]
    fn unsized_host_ignores_commands() {
        let mut world = World::default();
        let host = HeadlessHost::new(0, 0);
        let mut events = Vec::new();

        apply(
            &mut world,
            &host,
            Command::AdoptVisual {
                cell: GridCoord::new(0, 0),
                visual: VisualHandle::new(1),
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert!(query::dimensions(&world).is_empty());
    }

    #[test]
    fn first_command_sizes_the_grid() {
        let mut world = World::default();
        let host = HeadlessHost::new(4, 3);
        let mut events = Vec::new();

        apply(&mut world, &host, Command::PhysicsTick, &mut events);

        assert_eq!(
            events,
            vec![Event::GridResized {
                dimensions: GridDimensions::new(4, 3)
            }]
        );
        assert_eq!(query::count_cells(&world, CellState::Empty), 12);
    }

    #[test]
    fn adopted_visual_becomes_solid_and_bumps_allocation() {
        let (mut world, host) = sized_world();
        let cell = GridCoord::new(2, 2);
        let mut events = Vec::new();

        apply(
            &mut world,
            &host,
            Command::AdoptVisual {
                cell,
                visual: VisualHandle::new(41),
            },
            &mut events,
        );

        assert!(query::is_solid(&world, cell));
        assert_eq!(query::visual(&world, cell), Some(VisualHandle::new(41)));
        assert_eq!(world.allocate_visual(), VisualHandle::new(42));
        assert!(query::is_index_consistent(&world));
    }

    #[test]
    fn fade_report_for_non_clearing_cell_is_ignored() {
        let (mut world, host) = sized_world();
        let mut events = Vec::new();

        apply(
            &mut world,
            &host,
            Command::FadeFinished {
                cell: GridCoord::new(1, 1),
            },
            &mut events,
        );

        assert!(events.is_empty());
    }

    #[test]
    fn batch_guard_defers_rebuild_until_dropped() {
        let (mut world, host) = sized_world();
        let mut events = Vec::new();

        {
            let mut batch = world.begin_batch();
            apply(
                &mut batch,
                &host,
                Command::AdoptVisual {
                    cell: GridCoord::new(0, 0),
                    visual: VisualHandle::new(0),
                },
                &mut events,
            );
            apply(&mut batch, &host, Command::PhysicsTick, &mut events);
            assert!(query::is_batch_open(&batch));
        }
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::CompositeRebuilt { .. })));

        apply(&mut world, &host, Command::PhysicsTick, &mut events);
        assert!(events.contains(&Event::CompositeRebuilt {
            spans: 1,
            solid_cells: 1
        }));
    }

    #[test]
    fn holds_expire_with_the_clock() {
        let (mut world, host) = sized_world();
        let cell = GridCoord::new(3, 3);
        let mut events = Vec::new();

        apply(
            &mut world,
            &host,
            Command::HoldCell {
                cell,
                duration: Duration::from_millis(100),
            },
            &mut events,
        );
        assert!(query::is_held(&world, cell));

        apply(
            &mut world,
            &host,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
        assert!(!query::is_held(&world, cell));
    }
}
