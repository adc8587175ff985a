//! Scripted headless session that stands in for a game's visual layer.

use std::{collections::BTreeMap, fmt, time::Duration};

use anyhow::{bail, Result};
use dustfield_core::{
    CellState, Command, Event, GridCoord, HeadlessHost, Imprint, OwnerId, Phase, TerrainConfig,
    TerrainHost, Tint,
};
use dustfield_world::{self as world, query, World};
use tracing::info;

const FRAME: Duration = Duration::from_millis(16);
const VEHICLE: OwnerId = OwnerId::new(1);

/// Shape of the scripted session.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScenarioOptions {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) phase: Phase,
    pub(crate) frames: u32,
    pub(crate) step_every: u32,
}

/// Drives a world against a [`HeadlessHost`] and plays the visual layer:
/// fades reported through [`Event::CellClearing`] are counted down and
/// acknowledged with [`Command::FadeFinished`].
#[derive(Debug)]
pub(crate) struct Scenario {
    world: World,
    host: HeadlessHost,
    options: ScenarioOptions,
    fades: Vec<(GridCoord, Duration)>,
    tally: BTreeMap<&'static str, usize>,
}

impl Scenario {
    pub(crate) fn new(config: TerrainConfig, options: ScenarioOptions) -> Result<Self> {
        if options.columns < 4 || options.rows < 4 {
            bail!(
                "grid of {}x{} is too small, need at least 4x4",
                options.columns,
                options.rows
            );
        }

        let mut host = HeadlessHost::new(options.columns, options.rows);
        host.set_loop_duration(Duration::from_secs(2));
        Ok(Self {
            world: World::new(config),
            host,
            options,
            fades: Vec::new(),
            tally: BTreeMap::new(),
        })
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn run(&mut self) {
        let anchors = self.anchors();
        self.submit(Command::GenerateMaze {
            phase: self.options.phase,
            anchors: anchors.to_vec(),
        });
        let pocket = self.host.cell_to_world(anchors[1]);
        self.submit(Command::UpdateStarPocket {
            position: pocket,
            radius: 2,
            force_remove: false,
            refresh: false,
        });

        for frame in 0..self.options.frames {
            if frame > 0 && frame % self.options.step_every == 0 {
                let _ = self.host.advance_step();
            }
            self.script(frame, anchors);
            self.submit(Command::Tick { dt: FRAME });
            self.advance_fades(FRAME);
            self.submit(Command::PhysicsTick);
        }

        info!(
            frames = self.options.frames,
            solid = query::solid_cells(&self.world).len(),
            "scenario finished"
        );
    }

    pub(crate) fn summary(&self) -> Summary {
        Summary {
            phase: self.options.phase,
            generation: query::generation(&self.world),
            simulated: query::simulation_time(&self.world),
            states: [
                CellState::Solid,
                CellState::Clearing,
                CellState::PendingRegrow,
                CellState::Regrowing,
                CellState::Empty,
            ]
            .map(|state| (state, query::count_cells(&self.world, state))),
            regrowth: query::regrowth_view(&self.world),
            spans: query::composite_spans(&self.world).len(),
            rebuilds: query::composite_rebuilds(&self.world),
            tally: self.tally.clone(),
        }
    }

    fn anchors(&self) -> [GridCoord; 2] {
        let columns = i32::try_from(self.options.columns).unwrap_or(i32::MAX);
        let middle = i32::try_from(self.options.rows / 2).unwrap_or(0);
        [GridCoord::new(1, middle), GridCoord::new(columns - 2, middle)]
    }

    /// Scripted interactions: a vehicle crossing between the anchors, an
    /// imprinted blast a third of the way in and a batched burst at the
    /// halfway mark.
    fn script(&mut self, frame: u32, anchors: [GridCoord; 2]) {
        let frames = self.options.frames.max(1);
        let crossing_end = frames - frames / 10;

        if frame < crossing_end {
            let start = self.host.cell_to_world(anchors[0]);
            let end = self.host.cell_to_world(anchors[1]);
            let progress = frame as f32 / crossing_end.max(1) as f32;
            self.submit(Command::UpdateVehicleFootprint {
                owner: VEHICLE,
                position: start.lerp(end, progress),
                radius: 1,
                force_remove: true,
            });
        } else if frame == crossing_end {
            self.submit(Command::ReleaseVehicleFootprint { owner: VEHICLE });
        }

        let center = GridCoord::new(
            i32::try_from(self.options.columns / 2).unwrap_or(0),
            i32::try_from(self.options.rows / 2).unwrap_or(0),
        );
        if frame == frames / 3 {
            let imprint = Imprint::new(Tint::new(0.8, 0.3, 0.2), Tint::new(0.3, 0.1, 0.1), 0.7)
                .with_regrow_delay(Duration::from_secs(1));
            self.submit(Command::Carve {
                center,
                radius: 3,
                fade: Duration::from_millis(200),
                imprint: Some(imprint),
            });
        }

        if frame == frames / 2 {
            let offsets = [(-6, -3), (6, -3), (-6, 3), (6, 3)];
            let mut events = Vec::new();
            {
                let mut batch = self.world.begin_batch();
                for (column, row) in offsets {
                    let command = Command::Carve {
                        center: GridCoord::new(center.column() + column, center.row() + row),
                        radius: 2,
                        fade: Duration::from_millis(120),
                        imprint: None,
                    };
                    world::apply(&mut batch, &self.host, command, &mut events);
                }
            }
            self.observe(events);
        }
    }

    fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, &self.host, command, &mut events);
        self.observe(events);
    }

    fn observe(&mut self, events: Vec<Event>) {
        for event in events {
            *self.tally.entry(event_name(&event)).or_insert(0) += 1;
            if let Event::CellClearing { cell, fade, .. } = event {
                self.fades.push((cell, fade));
            }
        }
    }

    fn advance_fades(&mut self, dt: Duration) {
        let mut finished = Vec::new();
        self.fades.retain_mut(|(cell, remaining)| {
            *remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() {
                finished.push(*cell);
                false
            } else {
                true
            }
        });
        for cell in finished {
            self.submit(Command::FadeFinished { cell });
        }
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::TimeAdvanced { .. } => "TimeAdvanced",
        Event::GridResized { .. } => "GridResized",
        Event::CellSpawned { .. } => "CellSpawned",
        Event::CellClearing { .. } => "CellClearing",
        Event::CellEmptied { .. } => "CellEmptied",
        Event::CellRetired { .. } => "CellRetired",
        Event::RegrowEligible { .. } => "RegrowEligible",
        Event::CellRegrowing { .. } => "CellRegrowing",
        Event::RegrowDeferred { .. } => "RegrowDeferred",
        Event::CellSolidified { .. } => "CellSolidified",
        Event::CellTinted { .. } => "CellTinted",
        Event::CompositeRebuilt { .. } => "CompositeRebuilt",
        Event::KeepClearChanged { .. } => "KeepClearChanged",
        Event::MazeGenerated { .. } => "MazeGenerated",
        Event::TunnelAborted { .. } => "TunnelAborted",
        Event::SpawnPassCompleted { .. } => "SpawnPassCompleted",
    }
}

/// Final statistics of a scenario run.
#[derive(Clone, Debug)]
pub(crate) struct Summary {
    phase: Phase,
    generation: u64,
    simulated: Duration,
    states: [(CellState, usize); 5],
    regrowth: query::RegrowthView,
    spans: usize,
    rebuilds: u64,
    tally: BTreeMap<&'static str, usize>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "phase {} | generation {} | simulated {:.2}s",
            self.phase.label(),
            self.generation,
            self.simulated.as_secs_f32()
        )?;
        write!(f, "cells:")?;
        for (state, count) in &self.states {
            write!(f, " {state:?}={count}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "regrowth: timers={} blocked={} queued={} settling={}",
            self.regrowth.timers, self.regrowth.blocked, self.regrowth.queued, self.regrowth.settling
        )?;
        writeln!(
            f,
            "composite: {} spans after {} rebuilds",
            self.spans, self.rebuilds
        )?;
        writeln!(f, "events:")?;
        for (name, count) in &self.tally {
            writeln!(f, "  {name:<20} {count}")?;
        }
        Ok(())
    }
}
